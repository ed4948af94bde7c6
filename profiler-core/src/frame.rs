use std::fmt;

use rustc_hash::FxHashMap;

// === Frame === //

/// A single call-stack entry. Equality is structural; two frames with the
/// same function/file/line collapse to one trie node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Frame {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// `"function (file:line)"`, the folded-stack label grammar (spec §6).
    pub fn label(&self) -> String {
        format!("{} ({}:{})", self.function, self.file, self.line)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// === FrameId === //

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u32);

// === StringTable === //

/// Append-only interner: `intern` returns the existing id if present,
/// otherwise appends and returns `len - 1`. Not thread-safe — each
/// `SampleCounter` owns one, and only its owning context's timer-thread
/// writer ever touches it (spec §4.1, §4.5).
#[derive(Debug, Default)]
pub struct StringTable {
    ids: FxHashMap<String, FrameId>,
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> FrameId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }

        let idx = self.strings.len();
        let id = FrameId(
            u32::try_from(idx).expect("interned string table overflowed u32 ids"),
        );
        self.strings.push(s.to_owned());
        self.ids.insert(s.to_owned(), id);
        id
    }

    pub fn lookup(&self, id: FrameId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = StringTable::new();
        let a = table.intern("foo (f.py:1)");
        let b = table.intern("foo (f.py:1)");
        assert_eq!(a, b);
        assert_eq!(table.lookup(a), "foo (f.py:1)");
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut table = StringTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }
}
