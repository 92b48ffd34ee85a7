//! Scoped cross-encoder lifecycle
//!
//! A [`ScopedReranker`] hands out one [`RerankerLease`] per retrieval call.
//! Under [`RerankerPolicy::PerCall`] the lease owns a freshly loaded model and
//! unloads it on release. Under [`RerankerPolicy::Pooled`] a single resident
//! model sits behind a mutex and the lease holds the lock until released, so
//! concurrent calls are serialised rather than loading twice.

use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::{RerankerBackend, RerankerModel};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

pub use ragline_kernel::config::RerankerPolicy;

type Slot = Option<Box<dyn RerankerModel>>;

/// Load and unload durations of one lease.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeaseTiming {
    pub load_time: Duration,
    pub unload_time: Duration,
}

/// Hands out reranker leases according to a [`RerankerPolicy`].
pub struct ScopedReranker {
    backend: Arc<dyn RerankerBackend>,
    policy: RerankerPolicy,
    pooled: Arc<Mutex<Slot>>,
    resident: Arc<AtomicUsize>,
}

impl ScopedReranker {
    pub fn new(backend: Arc<dyn RerankerBackend>, policy: RerankerPolicy) -> Self {
        Self {
            backend,
            policy,
            pooled: Arc::new(Mutex::new(None)),
            resident: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn per_call(backend: Arc<dyn RerankerBackend>) -> Self {
        Self::new(backend, RerankerPolicy::PerCall)
    }

    pub fn pooled(backend: Arc<dyn RerankerBackend>) -> Self {
        Self::new(backend, RerankerPolicy::Pooled)
    }

    pub fn policy(&self) -> RerankerPolicy {
        self.policy
    }

    /// Number of leases currently holding a model.
    pub fn resident(&self) -> usize {
        self.resident.load(Ordering::SeqCst)
    }

    /// Acquire a loaded model for the duration of one call.
    pub async fn acquire(&self, model_id: &str) -> RagResult<RerankerLease> {
        let started = Instant::now();
        let handle = match self.policy {
            RerankerPolicy::PerCall => {
                let model = self.backend.load(model_id).await?;
                debug!(backend = self.backend.name(), model = model_id, "reranker loaded");
                LeaseHandle::Owned(model)
            }
            RerankerPolicy::Pooled => {
                let mut slot = self.pooled.clone().lock_owned().await;
                let stale = slot
                    .as_ref()
                    .is_some_and(|model| model.model_id() != model_id);
                if stale {
                    if let Some(mut previous) = slot.take() {
                        debug!(model = previous.model_id(), "swapping pooled reranker");
                        if let Err(e) = previous.unload().await {
                            error!(error = %e, "failed to unload pooled reranker");
                        }
                    }
                }
                if slot.is_none() {
                    *slot = Some(self.backend.load(model_id).await?);
                    debug!(backend = self.backend.name(), model = model_id, "pooled reranker loaded");
                }
                LeaseHandle::Pooled(slot)
            }
        };

        self.resident.fetch_add(1, Ordering::SeqCst);
        Ok(RerankerLease {
            handle: Some(handle),
            resident: self.resident.clone(),
            load_time: started.elapsed(),
        })
    }

    /// Unload the pooled model, if one is resident.
    pub async fn evict(&self) -> RagResult<()> {
        let mut slot = self.pooled.lock().await;
        if let Some(mut model) = slot.take() {
            debug!(model = model.model_id(), "evicting pooled reranker");
            model.unload().await?;
        }
        Ok(())
    }
}

enum LeaseHandle {
    Owned(Box<dyn RerankerModel>),
    Pooled(OwnedMutexGuard<Slot>),
}

/// A reranker held for one retrieval call.
///
/// Call [`release`](Self::release) on every exit path. Dropping an unreleased
/// lease still frees the model, but the unload runs detached and its timing is
/// lost.
pub struct RerankerLease {
    handle: Option<LeaseHandle>,
    resident: Arc<AtomicUsize>,
    load_time: Duration,
}

impl RerankerLease {
    pub fn load_time(&self) -> Duration {
        self.load_time
    }

    fn model(&self) -> RagResult<&dyn RerankerModel> {
        match &self.handle {
            Some(LeaseHandle::Owned(model)) => Ok(model.as_ref()),
            Some(LeaseHandle::Pooled(slot)) => slot
                .as_deref()
                .ok_or_else(|| RagError::Configuration("pooled reranker slot is empty".into())),
            None => Err(RagError::Configuration("reranker lease already released".into())),
        }
    }

    pub async fn score_batch(&self, query: &str, passages: &[&str]) -> RagResult<Vec<f32>> {
        let model = self.model()?;
        let scores = model.score_batch(query, passages).await?;
        if scores.len() != passages.len() {
            return Err(RagError::provider(
                model.model_id(),
                format!("returned {} scores for {} passages", scores.len(), passages.len()),
            ));
        }
        Ok(scores)
    }

    /// Give the model back, unloading it under the per-call policy.
    ///
    /// Unload failures are logged; the lease counts as released either way.
    pub async fn release(mut self) -> LeaseTiming {
        let started = Instant::now();
        match self.handle.take() {
            Some(LeaseHandle::Owned(mut model)) => {
                if let Err(e) = model.unload().await {
                    error!(model = model.model_id(), error = %e, "reranker unload failed");
                }
                debug!(model = model.model_id(), "reranker unloaded");
            }
            Some(LeaseHandle::Pooled(slot)) => drop(slot),
            None => {}
        }
        self.resident.fetch_sub(1, Ordering::SeqCst);
        LeaseTiming {
            load_time: self.load_time,
            unload_time: started.elapsed(),
        }
    }
}

impl Drop for RerankerLease {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        warn!("reranker lease dropped without release");
        self.resident.fetch_sub(1, Ordering::SeqCst);

        if let LeaseHandle::Owned(mut model) = handle {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        if let Err(e) = model.unload().await {
                            error!(error = %e, "detached reranker unload failed");
                        }
                    });
                }
                Err(_) => drop(model),
            }
        }
    }
}
