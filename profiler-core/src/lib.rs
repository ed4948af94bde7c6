mod config;
mod context;
mod error;
mod extractor;
mod frame;
mod manager;
mod repository;
mod sampler;
mod timer;
mod trie;

pub use config::{ProfilerConfig, DEFAULT_CONTEXT_CAPACITY, DEFAULT_MAX_STACK_DEPTH, MIN_INTERVAL_MS};
pub use context::{SampleContext, SampleContextFactory, SampleIdent, ThreadContextFactory, ThreadHandle};
pub use error::{CaptureError, ConfigError};
pub use extractor::{ClosureStackSource, FrameExtractor, RawStack, StackSource, SuppressionSet};
pub use frame::{Frame, FrameId, StringTable};
pub use manager::{ContextHandle, ContextManager};
pub use repository::{OutputRepository, RepositoryError, SampleRecord};
pub use sampler::Sampler;
pub use timer::{GlobalTimer, Timer, TimerError, TimerState};
pub use trie::SampleCounter;
