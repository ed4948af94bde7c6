use thiserror::Error;

// === ConfigError === //

/// Raised at construction time; never recoverable by the core itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("max stack depth must be nonzero")]
    ZeroMaxDepth,

    #[error("context manager capacity must be nonzero")]
    ZeroCapacity,
}

// === CaptureError === //

/// Logged and the offending context is skipped for one tick; never escapes
/// the timer loop (spec: "Propagation policy").
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("target thread no longer exists")]
    ThreadGone,

    #[error("runtime refused to capture a stack: {0}")]
    Refused(String),
}
