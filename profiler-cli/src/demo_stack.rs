use std::sync::{Arc, Mutex};

use profiler_core::{CaptureError, Frame, RawStack, StackSource, ThreadHandle};

// === SharedCallStack === //

/// Stands in for the runtime stack introspection a real embedding would
/// provide (e.g. CPython's `sys._current_frames()`, which `pysample`'s own
/// `ThreadSampleTimer` reads directly). There's no such hook for an
/// arbitrary Rust call stack, so the bundled demo workload pushes and pops
/// its own frame descriptions here as it runs, and the timer thread reads
/// whatever is currently on top.
#[derive(Clone, Default)]
pub struct SharedCallStack(Arc<Mutex<Vec<Frame>>>);

impl SharedCallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `frame` and return a guard that pops it on drop — including on
    /// unwind, so a panicking demo function still leaves the stack correct.
    pub fn enter(&self, frame: Frame) -> CallFrameGuard {
        self.0.lock().unwrap().push(frame);
        CallFrameGuard(self.0.clone())
    }

    fn snapshot(&self) -> Vec<Frame> {
        self.0.lock().unwrap().clone()
    }
}

pub struct CallFrameGuard(Arc<Mutex<Vec<Frame>>>);

impl Drop for CallFrameGuard {
    fn drop(&mut self) {
        self.0.lock().unwrap().pop();
    }
}

// === DemoStackSource === //

/// A `StackSource` that ignores the thread handle it's given and always
/// returns the demo workload's current call stack (root-first already, so
/// it's re-reversed here to mimic the innermost-first order a real stack
/// walker would hand back).
pub struct DemoStackSource(SharedCallStack);

impl DemoStackSource {
    pub fn new(stack: SharedCallStack) -> Self {
        Self(stack)
    }
}

impl StackSource for DemoStackSource {
    fn capture(&self, _handle: ThreadHandle) -> Result<RawStack, CaptureError> {
        let mut frames = self.0.snapshot();
        frames.reverse();
        Ok(RawStack::new(frames))
    }
}
