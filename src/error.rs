use thiserror::Error;

/// Errors produced by the analysis core.
#[derive(Debug, Error)]
pub enum Error {
    /// The sample stream could not be read.
    #[error("failed to read audio samples: {0}")]
    Acquisition(#[from] std::io::Error),

    /// The container or codec could not be decoded.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("frame size {0} must be a non-zero power of two")]
    InvalidFrameSize(usize),

    #[error("frame has {actual} samples, analyzer expects {expected}")]
    FrameLength { expected: usize, actual: usize },

    #[error("hop size {hop} must be in 1..={frame_size}")]
    InvalidHop { hop: usize, frame_size: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("classifier expects {expected} features, got {actual}")]
    FeatureLength { expected: usize, actual: usize },

    #[error("invalid classifier model: {0}")]
    Model(String),

    /// The background worker could not be started or panicked.
    #[error("analysis worker failed: {0}")]
    Worker(String),

    #[error("analysis cancelled after {frames} frames")]
    Cancelled { frames: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
