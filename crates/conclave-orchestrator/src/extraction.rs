use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use conclave_core::embedding::EmbeddingPort;
use conclave_core::types::{ConversationId, PersonaId, UserId};
use conclave_memory::long_term::{dedup_against_existing, to_memory, MemoryExtractor};
use conclave_store::StorePort;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::lease::LeaseRegistry;

/// One pending memory-extraction job (spec.md §4.8 step 11 / §5).
pub struct ExtractionTask {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub persona_id: Option<PersonaId>,
    pub user_message: String,
    pub assistant_message: String,
}

/// Bounded FIFO queue backing the worker pool. Unlike a plain `mpsc`
/// channel, pushing past the watermark drops the oldest queued task
/// instead of rejecting the newest one — approximates spec.md §5's
/// "older low-importance extractions are dropped": importance isn't
/// knowable until the extractor runs, so age is used as the drop
/// criterion (recorded as an open-question resolution in the docs).
struct Queue {
    tasks: Mutex<VecDeque<ExtractionTask>>,
    notify: Notify,
    watermark: usize,
}

impl Queue {
    fn new(watermark: usize) -> Self {
        Self { tasks: Mutex::new(VecDeque::new()), notify: Notify::new(), watermark }
    }

    fn push(&self, task: ExtractionTask) {
        let mut guard = self.tasks.lock().unwrap();
        if guard.len() >= self.watermark {
            guard.pop_front();
            warn!(watermark = self.watermark, "extraction queue at watermark, dropping oldest task");
        }
        guard.push_back(task);
        drop(guard);
        self.notify.notify_one();
    }

    async fn pop(&self) -> ExtractionTask {
        loop {
            if let Some(task) = self.tasks.lock().unwrap().pop_front() {
                return task;
            }
            self.notify.notified().await;
        }
    }
}

/// Bounded worker pool draining the extraction queue (spec.md §5: default
/// 8 workers, per-conversation FIFO). Ordering within a conversation is
/// best-effort: tasks are popped from the queue in strict enqueue order
/// and each worker acquires the conversation's lease before running,
/// relying on the lease mutex's fair (FIFO) wake order to preserve
/// per-conversation sequencing across workers.
pub struct ExtractionPool {
    queue: Arc<Queue>,
    _workers: Vec<JoinHandle<()>>,
}

impl ExtractionPool {
    pub fn spawn(
        worker_count: usize,
        watermark: usize,
        store: Arc<dyn StorePort>,
        embedder: Arc<dyn EmbeddingPort>,
        extractor: Arc<dyn MemoryExtractor>,
        leases: Arc<LeaseRegistry>,
        dedup_threshold: f64,
    ) -> Self {
        let queue = Arc::new(Queue::new(watermark));
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let store = Arc::clone(&store);
            let embedder = Arc::clone(&embedder);
            let extractor = Arc::clone(&extractor);
            let leases = Arc::clone(&leases);
            workers.push(tokio::spawn(async move {
                worker_loop(id, queue, leases, store, embedder, extractor, dedup_threshold).await
            }));
        }
        Self { queue, _workers: workers }
    }

    /// Fire-and-forget enqueue (spec.md §4.8 step 11). Never blocks the
    /// request path.
    pub fn enqueue(&self, task: ExtractionTask) {
        self.queue.push(task);
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Queue>,
    leases: Arc<LeaseRegistry>,
    store: Arc<dyn StorePort>,
    embedder: Arc<dyn EmbeddingPort>,
    extractor: Arc<dyn MemoryExtractor>,
    dedup_threshold: f64,
) {
    loop {
        let task = queue.pop().await;
        let lease = leases.get(&task.conversation_id);
        let _guard = lease.lock().await;
        // Extraction failures are swallowed and logged (spec.md §7) — they
        // never affect the user-facing response, which has already completed.
        if let Err(e) = run_task(&task, store.as_ref(), embedder.as_ref(), extractor.as_ref(), dedup_threshold).await {
            warn!(worker_id, conversation_id = %task.conversation_id, error = %e, "memory extraction failed");
        }
    }
}

async fn run_task(
    task: &ExtractionTask,
    store: &dyn StorePort,
    embedder: &dyn EmbeddingPort,
    extractor: &dyn MemoryExtractor,
    dedup_threshold: f64,
) -> conclave_core::Result<()> {
    let candidates = extractor.extract(&task.user_message, &task.assistant_message);
    if candidates.is_empty() {
        return Ok(());
    }

    let existing = store
        .list_memories_for_scope(&task.user_id, task.persona_id.as_ref())
        .map_err(|e| conclave_core::ConclaveError::Store(e.to_string()))?;

    for candidate in candidates {
        let embedding = embedder.embed(&candidate.content).await?;
        if dedup_against_existing(&embedding, candidate.kind, &existing, dedup_threshold) {
            debug!(content = %candidate.content, "skipping near-duplicate memory");
            continue;
        }
        let memory = to_memory(
            candidate,
            embedding,
            task.conversation_id.clone(),
            task.user_id.clone(),
            task.persona_id.clone(),
        );
        store
            .insert_memory(&memory)
            .map_err(|e| conclave_core::ConclaveError::Store(e.to_string()))?;
    }

    Ok(())
}
