use std::time::Instant;

use uuid::Uuid;

use crate::extractor::{FrameExtractor, RawStack};
use crate::trie::SampleCounter;

// === ThreadHandle === //

/// Identifies which OS thread a context samples. Opaque to the core; the
/// timer hands it straight to a `StackSource`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ThreadHandle(std::thread::ThreadId);

impl ThreadHandle {
    pub fn current() -> Self {
        Self(std::thread::current().id())
    }

    pub fn from_std(id: std::thread::ThreadId) -> Self {
        Self(id)
    }
}

// === SampleIdent === //

/// 128-bit opaque identity, unique per context, generated at creation (spec
/// §3). Whether it's surfaced to the repository was an open question (spec
/// §9); resolved in DESIGN.md: yes, it travels with the context as the
/// `sample_id` of the remote payload (spec §6).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SampleIdent(Uuid);

impl SampleIdent {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 32 lowercase hex characters, matching the remote payload's
    /// `sample_id` shape (spec §6).
    pub fn as_hex(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for SampleIdent {
    fn default() -> Self {
        Self::new()
    }
}

// === SampleContext === //

/// One profiling session: owns its trie, records start time, name, and the
/// per-tick weight (spec §3). Mutated only by the timer thread via
/// `collect`; a context must never be sampled after `Sampler::end` consumes
/// it.
pub struct SampleContext {
    name: String,
    ident: SampleIdent,
    delta: u32,
    start_time: Instant,
    total_ticks: u64,
    counter: SampleCounter,
    extractor: FrameExtractor,
    thread_handle: ThreadHandle,
}

impl SampleContext {
    pub fn new(
        name: impl Into<String>,
        delta: u32,
        extractor: FrameExtractor,
        thread_handle: ThreadHandle,
    ) -> Self {
        Self {
            name: name.into(),
            ident: SampleIdent::new(),
            delta,
            start_time: Instant::now(),
            total_ticks: 0,
            counter: SampleCounter::new(delta),
            extractor,
            thread_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ident(&self) -> SampleIdent {
        self.ident
    }

    pub fn thread_handle(&self) -> ThreadHandle {
        self.thread_handle
    }

    /// Extract frames from a raw stack snapshot and fold them into the
    /// trie, bumping `total_ticks` by `delta` (spec §4.5). Called by the
    /// timer thread only. A stack that suppression-filters down to nothing
    /// contributes no weight and must not advance `total_ticks` either, or
    /// conservation (spec §8.1: `sum(weights) == total_ticks`) breaks.
    pub fn collect(&mut self, raw: RawStack) {
        if raw.is_empty() {
            return;
        }
        let frames = self.extractor.extract(raw);
        if frames.is_empty() {
            return;
        }
        self.counter.record(&frames);
        self.total_ticks += u64::from(self.delta);
    }

    /// Milliseconds since this context began.
    pub fn lifecycle_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn flame_output(&self) -> String {
        self.counter.flame_output()
    }
}

// === SampleContextFactory === //

/// Capability interface with a single method — no inheritance hierarchy
/// needed (spec §9 Design Notes).
pub trait SampleContextFactory: Send + Sync {
    fn create(&self, name: &str, delta: u32) -> SampleContext;
}

/// Default factory: samples the calling thread, no suppression, default
/// max depth.
pub struct ThreadContextFactory {
    max_stack_depth: usize,
}

impl ThreadContextFactory {
    pub fn new(max_stack_depth: usize) -> Self {
        Self { max_stack_depth }
    }
}

impl SampleContextFactory for ThreadContextFactory {
    fn create(&self, name: &str, delta: u32) -> SampleContext {
        SampleContext::new(
            name,
            delta,
            FrameExtractor::new(Default::default(), self.max_stack_depth),
            ThreadHandle::current(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SuppressionSet;
    use crate::frame::Frame;

    // spec §8.1 conservation, combined with suppression: a stack that
    // filters down to nothing must not advance total_ticks either.
    #[test]
    fn fully_suppressed_stack_does_not_advance_total_ticks() {
        let extractor = FrameExtractor::new(SuppressionSet::with_names(["noisy".to_string()]), 256);
        let mut ctx = SampleContext::new("test", 10, extractor, ThreadHandle::current());

        ctx.collect(RawStack::new(vec![Frame::new("noisy", "a.py", 1)]));

        assert_eq!(ctx.total_ticks(), 0);
        assert_eq!(ctx.flame_output(), "");
    }

    #[test]
    fn collect_bumps_total_ticks_by_delta() {
        let factory = ThreadContextFactory::new(256);
        let mut ctx = factory.create("test", 10);
        assert_eq!(ctx.total_ticks(), 0);

        ctx.collect(RawStack::new(vec![Frame::new("f", "a.py", 1)]));
        ctx.collect(RawStack::new(vec![Frame::new("f", "a.py", 1)]));

        assert_eq!(ctx.total_ticks(), 20);
        assert_eq!(ctx.flame_output(), "f (a.py:1) 20\n");
    }

    #[test]
    fn empty_context_has_empty_output() {
        let factory = ThreadContextFactory::new(256);
        let ctx = factory.create("test", 10);
        assert_eq!(ctx.flame_output(), "");
    }

    #[test]
    fn idents_are_unique() {
        let factory = ThreadContextFactory::new(256);
        let a = factory.create("a", 10);
        let b = factory.create("b", 10);
        assert_ne!(a.ident(), b.ident());
    }
}
