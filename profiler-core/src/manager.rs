use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::context::{SampleContext, SampleIdent, ThreadHandle};
use crate::extractor::RawStack;

// === ContextHandle === //

/// A cheap, `Clone`-able reference to a live `SampleContext`. The manager
/// keeps one clone while a context is registered; the caller of
/// `Sampler::begin` keeps another. `collect` takes the lock only for the
/// duration of one trie insertion (spec §5: short critical sections).
#[derive(Clone)]
pub struct ContextHandle(Arc<Mutex<SampleContext>>);

impl ContextHandle {
    pub(crate) fn new(ctx: SampleContext) -> Self {
        Self(Arc::new(Mutex::new(ctx)))
    }

    pub fn ident(&self) -> SampleIdent {
        self.0.lock().ident()
    }

    pub fn name(&self) -> String {
        self.0.lock().name().to_owned()
    }

    pub fn thread_handle(&self) -> ThreadHandle {
        self.0.lock().thread_handle()
    }

    pub fn lifecycle_ms(&self) -> u64 {
        self.0.lock().lifecycle_ms()
    }

    pub fn total_ticks(&self) -> u64 {
        self.0.lock().total_ticks()
    }

    pub fn flame_output(&self) -> String {
        self.0.lock().flame_output()
    }

    /// Called by the timer thread only.
    pub fn collect(&self, raw: RawStack) {
        self.0.lock().collect(raw);
    }
}

// === ContextManager === //

/// Process-wide registry of active contexts: insertion-ordered, capped at
/// `capacity` (spec §3, §4.6). A single mutex guards the list; every
/// operation is O(n) at worst but the list is small (default cap 1000) and
/// critical sections are short.
pub struct ContextManager {
    capacity: usize,
    contexts: Mutex<Vec<ContextHandle>>,
}

impl ContextManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// If the registry is at capacity, logs a warning and drops the new
    /// context on the floor — `begin` still returns a handle to the caller,
    /// it's simply never sampled because the timer never iterates over it
    /// (spec §7: "Capacity exceeded").
    pub fn push(&self, ctx: ContextHandle) -> bool {
        let mut guard = self.contexts.lock();
        if guard.len() >= self.capacity {
            warn!(
                capacity = self.capacity,
                "SampleContext exceeds the maximum capacity limit"
            );
            return false;
        }
        guard.push(ctx);
        true
    }

    pub fn remove(&self, ident: SampleIdent) {
        let mut guard = self.contexts.lock();
        if let Some(pos) = guard.iter().position(|c| c.ident() == ident) {
            guard.remove(pos);
        }
    }

    /// A snapshot safe to iterate while concurrent pushes/removes occur
    /// elsewhere (spec §4.6): each element is a cheap `Arc` clone.
    pub fn snapshot(&self) -> Vec<ContextHandle> {
        self.contexts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadContextFactory;
    use crate::frame::Frame;

    fn handle(name: &str) -> ContextHandle {
        use crate::context::SampleContextFactory;
        let factory = ThreadContextFactory::new(256);
        ContextHandle::new(factory.create(name, 10))
    }

    // S6 / spec §8.6 registry bound
    #[test]
    fn registry_bound_holds_past_capacity() {
        let manager = ContextManager::new(1000);
        for i in 0..1001 {
            manager.push(handle(&format!("ctx-{i}")));
        }
        assert_eq!(manager.len(), 1000);
    }

    #[test]
    fn remove_drops_context_from_snapshot() {
        let manager = ContextManager::new(10);
        let a = handle("a");
        let ident = a.ident();
        manager.push(a);
        manager.push(handle("b"));
        assert_eq!(manager.len(), 2);

        manager.remove(ident);
        assert_eq!(manager.len(), 1);
        assert!(manager.snapshot().iter().all(|c| c.ident() != ident));
    }

    // spec §8.7 removal: timer never calls collect again after end
    #[test]
    fn removed_context_is_absent_from_future_snapshots() {
        let manager = ContextManager::new(10);
        let a = handle("a");
        let ident = a.ident();
        manager.push(a.clone());

        for snap in manager.snapshot() {
            snap.collect(crate::extractor::RawStack::new(vec![Frame::new("f", "a.py", 1)]));
        }
        let before = a.total_ticks();

        manager.remove(ident);

        for _ in 0..5 {
            for snap in manager.snapshot() {
                snap.collect(crate::extractor::RawStack::new(vec![Frame::new(
                    "f", "a.py", 1,
                )]));
            }
        }

        assert_eq!(a.total_ticks(), before);
    }
}
