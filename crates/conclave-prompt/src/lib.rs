pub mod composer;
pub mod truncate;

pub use composer::{compose, PromptInput};
