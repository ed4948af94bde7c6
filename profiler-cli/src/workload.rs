use std::time::{Duration, Instant};

use profiler_core::Frame;

use crate::demo_stack::SharedCallStack;

const FILE: &str = "demo_workload.rs";

/// A small, deliberately branchy call tree that runs for roughly
/// `budget`, so the bundled demo produces a flame graph with real shape
/// instead of a single flat frame. Stands in for "the script" `pysample`'s
/// CLI would otherwise `exec`; real arbitrary-script execution is out of
/// scope here (see Non-goals).
pub fn run(stack: &SharedCallStack, budget: Duration) -> u64 {
    let _frame = stack.enter(Frame::new("run", FILE, 10));
    let deadline = Instant::now() + budget;
    let mut total = 0u64;
    while Instant::now() < deadline {
        total = total.wrapping_add(fan_out(stack, deadline, 3));
    }
    total
}

fn fan_out(stack: &SharedCallStack, deadline: Instant, depth: u32) -> u64 {
    let _frame = stack.enter(Frame::new("fan_out", FILE, 24));
    if depth == 0 || Instant::now() >= deadline {
        return spin(stack, 2_000);
    }
    let mut total = spin(stack, 500);
    total = total.wrapping_add(fan_out(stack, deadline, depth - 1));
    total = total.wrapping_add(io_wait(stack));
    total
}

fn spin(stack: &SharedCallStack, iterations: u64) -> u64 {
    let _frame = stack.enter(Frame::new("spin", FILE, 40));
    let mut acc = 0u64;
    for i in 0..iterations {
        acc = acc.wrapping_add(i.wrapping_mul(2654435761));
    }
    acc
}

fn io_wait(stack: &SharedCallStack) -> u64 {
    let _frame = stack.enter(Frame::new("io_wait", FILE, 48));
    std::thread::sleep(Duration::from_millis(1));
    1
}
