use std::sync::Arc;

use tracing::error;

use crate::context::SampleContextFactory;
use crate::manager::{ContextHandle, ContextManager};
use crate::repository::{OutputRepository, RepositoryError};

// === Sampler === //

/// The façade callers actually reach for (spec §4.7): `begin`/`end` around a
/// region of code, or `wrap` around a closure. Owns nothing runtime-specific
/// — the context factory and output repository are handed in, so the same
/// `Sampler` works unchanged whether it's profiling a thread, a coroutine, or
/// whatever `StackSource` the embedder supplies.
pub struct Sampler {
    interval_ms: u32,
    output_threshold_ms: u64,
    context_manager: Arc<ContextManager>,
    context_factory: Arc<dyn SampleContextFactory>,
    output_repo: Arc<dyn OutputRepository>,
}

impl Sampler {
    pub fn new(
        interval_ms: u32,
        output_threshold_ms: u64,
        context_manager: Arc<ContextManager>,
        context_factory: Arc<dyn SampleContextFactory>,
        output_repo: Arc<dyn OutputRepository>,
    ) -> Self {
        Self {
            interval_ms: interval_ms.max(crate::config::MIN_INTERVAL_MS),
            output_threshold_ms,
            context_manager,
            context_factory,
            output_repo,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn context_manager(&self) -> &Arc<ContextManager> {
        &self.context_manager
    }

    /// Register a new context under `name` and hand back a clone-able handle
    /// to it. If the registry is already at capacity the handle is still
    /// returned — it's simply never sampled, since the timer only ever sees
    /// what `ContextManager::snapshot` hands it (spec §7).
    pub fn begin(&self, name: &str) -> ContextHandle {
        let ctx = self.context_factory.create(name, self.interval_ms);
        let handle = ContextHandle::new(ctx);
        self.context_manager.push(handle.clone());
        handle
    }

    /// Deregister `ctx` and, if its lifetime met `output_threshold_ms`, hand
    /// its folded-stack output to the repository (spec §4.7, §6). Contexts
    /// that end early are dropped on the floor without ever reaching the
    /// repository.
    pub fn end(&self, ctx: ContextHandle) -> Result<(), RepositoryError> {
        self.context_manager.remove(ctx.ident());
        if ctx.lifecycle_ms() < self.output_threshold_ms {
            return Ok(());
        }
        let record = ctx.to_record();
        self.output_repo.store(&record)
    }

    /// Profile a single call to `f`. `end` always runs — on a normal return
    /// or on a panic unwinding through this frame — via the same
    /// suspend/resume-on-drop shape the core uses for stack capture itself.
    /// Mirrors `pysample.sampler.Sampler.__call__`'s `try/finally`.
    pub fn wrap<F, R>(&self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let ctx = self.begin(name);
        let _guard = scopeguard::guard(ctx, |ctx| {
            if let Err(err) = self.end(ctx) {
                error!(%err, "failed to store sampling output");
            }
        });
        f()
    }
}
