use generational_arena::{Arena, Index};
use rustc_hash::FxHashMap;

use crate::frame::{Frame, FrameId, StringTable};

// === TrieNode === //

struct TrieNode {
    parent: Option<Index>,
    frame_id: Option<FrameId>,
    weight: u64,
    // insertion-ordered list for deterministic DFS output, paired with a map
    // for O(1) lookup — neither alone satisfies both requirements (spec §9).
    child_order: Vec<(FrameId, Index)>,
    child_index: FxHashMap<FrameId, Index>,
}

impl TrieNode {
    fn root() -> Self {
        Self {
            parent: None,
            frame_id: None,
            weight: 0,
            child_order: Vec::new(),
            child_index: FxHashMap::default(),
        }
    }

    fn child(parent: Index, frame_id: FrameId) -> Self {
        Self {
            parent: Some(parent),
            frame_id: Some(frame_id),
            weight: 0,
            child_order: Vec::new(),
            child_index: FxHashMap::default(),
        }
    }
}

// === SampleCounter === //

/// Radix tree over stacks, keyed by interned frame labels. One per
/// `SampleContext`; the timer thread is the sole writer while the context is
/// live (spec §4.2, §4.5).
pub struct SampleCounter {
    delta: u32,
    strings: StringTable,
    nodes: Arena<TrieNode>,
    root: Index,
}

impl SampleCounter {
    pub fn new(delta: u32) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.insert(TrieNode::root());
        Self {
            delta,
            strings: StringTable::new(),
            nodes,
            root,
        }
    }

    pub fn delta(&self) -> u32 {
        self.delta
    }

    /// Insert one sampled stack, root-first, bumping the terminal node's
    /// weight by `delta`. Empty stacks are ignored (spec §4.2).
    pub fn record(&mut self, stack: &[Frame]) {
        if stack.is_empty() {
            return;
        }

        let mut current = self.root;
        for frame in stack {
            let label = frame.label();
            let frame_id = self.strings.intern(&label);
            current = self.child_or_insert(current, frame_id);
        }

        self.nodes[current].weight += u64::from(self.delta);
    }

    fn child_or_insert(&mut self, parent: Index, frame_id: FrameId) -> Index {
        if let Some(&existing) = self.nodes[parent].child_index.get(&frame_id) {
            return existing;
        }

        let child = self.nodes.insert(TrieNode::child(parent, frame_id));
        let parent_node = &mut self.nodes[parent];
        parent_node.child_order.push((frame_id, child));
        parent_node.child_index.insert(frame_id, child);
        child
    }

    /// DFS from the root, emitting one `label;label;...;label weight\n` line
    /// per node with positive weight, children visited in first-observation
    /// order (spec §4.4, §6).
    pub fn flame_output(&self) -> String {
        let mut out = String::new();
        let mut path = Vec::new();
        self.emit(self.root, &mut path, &mut out);
        out
    }

    fn emit(&self, index: Index, path: &mut Vec<FrameId>, out: &mut String) {
        let node = &self.nodes[index];

        if let Some(frame_id) = node.frame_id {
            path.push(frame_id);
        }

        if node.weight > 0 {
            for (i, frame_id) in path.iter().enumerate() {
                if i > 0 {
                    out.push(';');
                }
                out.push_str(self.strings.lookup(*frame_id));
            }
            out.push(' ');
            out.push_str(&node.weight.to_string());
            out.push('\n');
        }

        for &(_, child) in &node.child_order {
            self.emit(child, path, out);
        }

        if node.frame_id.is_some() {
            path.pop();
        }
    }

    /// Sum of weight across every node; used to verify the conservation
    /// property (spec §8.1).
    #[cfg(test)]
    fn total_weight(&self) -> u64 {
        self.nodes.iter().map(|(_, node)| node.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: &str, file: &str, line: u32) -> Frame {
        Frame::new(function, file, line)
    }

    // S1
    #[test]
    fn single_stack_repeated() {
        let mut counter = SampleCounter::new(10);
        let stack = vec![frame("A", "f.py", 1), frame("B", "f.py", 2)];
        for _ in 0..3 {
            counter.record(&stack);
        }
        assert_eq!(counter.flame_output(), "A (f.py:1);B (f.py:2) 30\n");
    }

    // S2
    #[test]
    fn diverging_stacks_preserve_first_observation_order() {
        let mut counter = SampleCounter::new(10);
        let ab = vec![frame("A", "f.py", 1), frame("B", "f.py", 2)];
        let ac = vec![frame("A", "f.py", 1), frame("C", "f.py", 3)];
        for _ in 0..3 {
            counter.record(&ab);
        }
        for _ in 0..2 {
            counter.record(&ac);
        }

        let out = counter.flame_output();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "A (f.py:1);B (f.py:2) 30");
        assert_eq!(lines[1], "A (f.py:1);C (f.py:3) 20");
    }

    // S3
    #[test]
    fn node_can_have_both_weight_and_children() {
        let mut counter = SampleCounter::new(1);
        counter.record(&[frame("A", "f.py", 1)]);
        counter.record(&[frame("A", "f.py", 1), frame("B", "f.py", 2)]);
        counter.record(&[frame("A", "f.py", 1), frame("B", "f.py", 2)]);

        let out = counter.flame_output();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "A (f.py:1) 1");
        assert_eq!(lines[1], "A (f.py:1);B (f.py:2) 2");
    }

    // S4 (empty)
    #[test]
    fn zero_collects_yields_empty_output() {
        let counter = SampleCounter::new(10);
        assert_eq!(counter.flame_output(), "");
    }

    #[test]
    fn empty_stacks_are_ignored() {
        let mut counter = SampleCounter::new(10);
        counter.record(&[]);
        assert_eq!(counter.flame_output(), "");
        assert_eq!(counter.total_weight(), 0);
    }

    #[test]
    fn conservation_holds_over_many_samples() {
        let mut counter = SampleCounter::new(7);
        let stacks = [
            vec![frame("A", "f.py", 1)],
            vec![frame("A", "f.py", 1), frame("B", "f.py", 2)],
            vec![frame("A", "f.py", 1), frame("C", "f.py", 9)],
        ];
        let n = 50;
        for i in 0..n {
            counter.record(&stacks[i % stacks.len()]);
        }
        assert_eq!(counter.total_weight(), n as u64 * 7);
    }

    #[test]
    fn determinism_across_runs() {
        let build = || {
            let mut counter = SampleCounter::new(5);
            counter.record(&[frame("A", "f.py", 1), frame("B", "f.py", 2)]);
            counter.record(&[frame("A", "f.py", 1), frame("C", "f.py", 3)]);
            counter.record(&[frame("A", "f.py", 1), frame("B", "f.py", 2)]);
            counter.flame_output()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn prefix_sharing_diverges_only_at_first_differing_frame() {
        let mut counter = SampleCounter::new(1);
        counter.record(&[
            frame("root", "f.py", 1),
            frame("mid", "f.py", 2),
            frame("leaf1", "f.py", 3),
        ]);
        counter.record(&[
            frame("root", "f.py", 1),
            frame("mid", "f.py", 2),
            frame("leaf2", "f.py", 4),
        ]);

        let out = counter.flame_output();
        assert!(out.contains("root (f.py:1);mid (f.py:2);leaf1 (f.py:3) 1"));
        assert!(out.contains("root (f.py:1);mid (f.py:2);leaf2 (f.py:4) 1"));
    }
}
