use std::collections::HashSet;

use crate::context::ThreadHandle;
use crate::error::CaptureError;
use crate::frame::Frame;

// === SuppressionSet === //

/// Function names the extractor drops from every captured stack. Empty by
/// default (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct SuppressionSet(HashSet<String>);

impl SuppressionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(names: impl IntoIterator<Item = String>) -> Self {
        Self(names.into_iter().collect())
    }

    pub fn contains(&self, function: &str) -> bool {
        self.0.contains(function)
    }
}

// === RawStack === //

/// The runtime's own stack representation, innermost frame first — the
/// order most stack-walking APIs naturally produce. Opaque beyond that: the
/// only thing the core promises is that `FrameExtractor` can turn it into a
/// root-first `Vec<Frame>`.
#[derive(Debug, Clone, Default)]
pub struct RawStack(pub Vec<Frame>);

impl RawStack {
    pub fn new(innermost_first: Vec<Frame>) -> Self {
        Self(innermost_first)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// === StackSource === //

/// The runtime-specific piece (spec §4.3): given a thread handle, produce a
/// snapshot of its call stack. Returns `Err(CaptureError::ThreadGone)` if the
/// thread no longer exists, or `Err(CaptureError::Refused(_))` if the
/// runtime declines for some other reason. Must never block on user-code
/// locks (spec §5).
pub trait StackSource: Send + Sync {
    fn capture(&self, handle: ThreadHandle) -> Result<RawStack, CaptureError>;
}

/// A `StackSource` backed by a plain closure — used by the demo CLI and by
/// tests in place of a real runtime hook.
pub struct ClosureStackSource<F>(F)
where
    F: Fn(ThreadHandle) -> Result<RawStack, CaptureError> + Send + Sync;

impl<F> ClosureStackSource<F>
where
    F: Fn(ThreadHandle) -> Result<RawStack, CaptureError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> StackSource for ClosureStackSource<F>
where
    F: Fn(ThreadHandle) -> Result<RawStack, CaptureError> + Send + Sync,
{
    fn capture(&self, handle: ThreadHandle) -> Result<RawStack, CaptureError> {
        (self.0)(handle)
    }
}

// === FrameExtractor === //

/// Walks a captured stack snapshot bottom-up, interning nothing itself (that
/// happens inside `SampleCounter::record`) but normalizing order and
/// dropping suppressed frames, and enforcing the configured max depth.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    suppressed: SuppressionSet,
    max_depth: usize,
}

impl FrameExtractor {
    pub fn new(suppressed: SuppressionSet, max_depth: usize) -> Self {
        Self {
            suppressed,
            max_depth,
        }
    }

    /// Produce a root-first `Vec<Frame>` from an innermost-first raw stack,
    /// skipping suppressed functions and truncating to `max_depth` (spec
    /// §3, §4.3).
    pub fn extract(&self, raw: RawStack) -> Vec<Frame> {
        let mut frames: Vec<Frame> = raw
            .0
            .into_iter()
            .rev()
            .filter(|frame| !self.suppressed.contains(&frame.function))
            .collect();

        if frames.len() > self.max_depth {
            let excess = frames.len() - self.max_depth;
            frames.drain(0..excess);
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(f: &str) -> Frame {
        Frame::new(f, "f.py", 1)
    }

    #[test]
    fn reverses_innermost_first_to_root_first() {
        let extractor = FrameExtractor::new(SuppressionSet::new(), 256);
        let raw = RawStack::new(vec![frame("leaf"), frame("mid"), frame("root")]);
        let out = extractor.extract(raw);
        assert_eq!(
            out.iter().map(|f| f.function.as_str()).collect::<Vec<_>>(),
            vec!["root", "mid", "leaf"]
        );
    }

    #[test]
    fn drops_suppressed_functions() {
        let suppressed = SuppressionSet::with_names(["internal".to_string()]);
        let extractor = FrameExtractor::new(suppressed, 256);
        let raw = RawStack::new(vec![frame("leaf"), frame("internal"), frame("root")]);
        let out = extractor.extract(raw);
        assert_eq!(
            out.iter().map(|f| f.function.as_str()).collect::<Vec<_>>(),
            vec!["root", "leaf"]
        );
    }

    #[test]
    fn truncates_to_max_depth_keeping_the_leaf_end() {
        let extractor = FrameExtractor::new(SuppressionSet::new(), 2);
        let raw = RawStack::new(vec![frame("leaf"), frame("mid"), frame("root")]);
        let out = extractor.extract(raw);
        assert_eq!(
            out.iter().map(|f| f.function.as_str()).collect::<Vec<_>>(),
            vec!["mid", "leaf"]
        );
    }
}
