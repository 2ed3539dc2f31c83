// THEORY:
// Every failure the touch core can observe is local to one device report. None
// of them is fatal: a malformed report is dropped, a short read is retried, and
// the caller reports "no contacts" for that cycle. Capacity limits (too many
// seeds, oversized blobs) are deliberately absent from this taxonomy; they are
// silent truncation rules owned by the cluster engine.

use thiserror::Error;

/// A declared size, offset or count inside a device report does not fit the
/// bytes that are actually there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed frame: {what} at offset {offset} needs {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed frame: heatmap section holds {actual} bytes, grid needs {expected}")]
    HeatmapSize { expected: usize, actual: usize },

    #[error("malformed frame: stylus report declares {elements} elements but holds {len} bytes")]
    StylusOverrun { elements: usize, len: usize },
}

/// Errors surfaced by `TouchPipeline::process_frame`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Fewer bytes than one full report. Tracker state is untouched.
    #[error("short read: got {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },

    /// The report was dropped. Tracker state is untouched.
    #[error(transparent)]
    MalformedFrame(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
