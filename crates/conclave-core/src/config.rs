use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{ConclaveError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConclaveConfig {
    pub gateway: GatewayConfig,
    pub providers: ProvidersConfig,
    pub database: DatabaseConfig,
    pub router: RouterConfig,
    pub memory: MemoryConfig,
    pub workers: WorkersConfig,
}

impl Default for ConclaveConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            providers: ProvidersConfig::default(),
            database: DatabaseConfig::default(),
            router: RouterConfig::default(),
            memory: MemoryConfig::default(),
            workers: WorkersConfig::default(),
        }
    }
}

impl ConclaveConfig {
    /// Load configuration layering a TOML file under an env-var override.
    ///
    /// Precedence, lowest to highest: built-in defaults, `path` (or
    /// `CONCLAVE_CONFIG`, or `~/.conclave/conclave.toml`), `CONCLAVE_`-prefixed
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let resolved_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var("CONCLAVE_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let figment = Figment::from(figment::providers::Serialized::defaults(
            ConclaveConfig::default(),
        ))
        .merge(Toml::file(resolved_path))
        .merge(Env::prefixed("CONCLAVE_").split("__"));

        figment
            .extract()
            .map_err(|e| ConclaveError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    dirs_like_home()
        .map(|h| format!("{h}/.conclave/conclave.toml"))
        .unwrap_or_else(|| "conclave.toml".to_string())
}

fn dirs_like_home() -> Option<String> {
    std::env::var("HOME").ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
    pub auth_mode: AuthMode,
    pub bearer_token: Option<String>,
    pub allow_user_id_header: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            auth_mode: AuthMode::Token,
            bearer_token: None,
            allow_user_id_header: false,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    Token,
    Header,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub primary: ProviderConfig,
    pub secondary: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig {
                name: "primary".to_string(),
                base_url: "https://api.anthropic.com".to_string(),
                api_key: None,
                model: "claude-default".to_string(),
                connect_timeout_ms: default_connect_timeout_ms(),
                total_timeout_ms: default_total_timeout_ms(),
            },
            secondary: ProviderConfig {
                name: "secondary".to_string(),
                base_url: "http://localhost:11434".to_string(),
                api_key: None,
                model: "uncensored-default".to_string(),
                connect_timeout_ms: default_connect_timeout_ms(),
                total_timeout_ms: default_total_timeout_ms(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub connect_timeout_ms: u64,
    pub total_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: String::new(),
            api_key: None,
            model: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            total_timeout_ms: default_total_timeout_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_total_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub audit_log_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "conclave.db".to_string(),
            audit_log_path: "conclave-audit.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub similarity_weight: f64,
    pub importance_weight: f64,
    pub similarity_threshold: f64,
    pub lock_in_window: u64,
    pub age_verification_attempt_cap: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.7,
            importance_weight: 0.3,
            similarity_threshold: 0.15,
            lock_in_window: 5,
            age_verification_attempt_cap: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub short_term_capacity: usize,
    pub retrieval_top_k: usize,
    pub dedup_similarity_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 20,
            retrieval_top_k: 6,
            dedup_similarity_threshold: 0.92,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub extraction_pool_size: usize,
    pub queue_watermark: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            extraction_pool_size: 8,
            queue_watermark: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_spec_defaults() {
        let cfg = ConclaveConfig::default();
        assert_eq!(cfg.router.similarity_weight, 0.7);
        assert_eq!(cfg.router.importance_weight, 0.3);
        assert_eq!(cfg.router.similarity_threshold, 0.15);
        assert_eq!(cfg.router.lock_in_window, 5);
        assert_eq!(cfg.router.age_verification_attempt_cap, 3);
        assert_eq!(cfg.workers.extraction_pool_size, 8);
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_missing() {
        let cfg = ConclaveConfig::load(Some("/nonexistent/path/conclave.toml")).unwrap();
        assert_eq!(cfg.gateway.port, 8080);
    }
}
