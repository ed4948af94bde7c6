use thiserror::Error;

use crate::context::SampleIdent;
use crate::manager::ContextHandle;

// === SampleRecord === //

/// The data a terminated `SampleContext` hands to an `OutputRepository`:
/// `name`, `ident`, `flame_output()`, and `lifecycle_ms` (spec §6). Captured
/// once, under a single lock, so the repository never has to reach back
/// into the context.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    pub name: String,
    pub ident: SampleIdent,
    pub lifecycle_ms: u64,
    pub flame_output: String,
}

impl ContextHandle {
    pub fn to_record(&self) -> SampleRecord {
        SampleRecord {
            name: self.name(),
            ident: self.ident(),
            lifecycle_ms: self.lifecycle_ms(),
            flame_output: self.flame_output(),
        }
    }
}

// === RepositoryError === //

/// Reported to the caller of `end` via the repository's own contract; the
/// core never retries (spec §7).
#[derive(Debug, Error)]
#[error("output repository failed to store sample: {0}")]
pub struct RepositoryError(pub String);

// === OutputRepository === //

/// A single operation: persist a terminated context's data somewhere. A
/// capability interface, not a class hierarchy (spec §9): file, directory,
/// and remote-HTTP implementations live in `profiler-repo` and all satisfy
/// this trait without the core knowing anything about them.
pub trait OutputRepository: Send + Sync {
    fn store(&self, record: &SampleRecord) -> Result<(), RepositoryError>;
}
