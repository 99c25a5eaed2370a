//! Streaming STFT engine for respiratory-sound recordings.
//!
//! Mono 16-bit PCM is cut into overlapping frames, each frame yields a mean
//! amplitude (waveform) and a windowed magnitude spectrum (spectrogram), and
//! spectra land in a bounded FIFO buffer that a renderer snapshots.

pub mod audio;
pub mod classify;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod selection;
pub mod spectrogram;

pub use audio::analysis::{AmplitudeTracker, SpectralAnalyzer, WindowKind};
pub use audio::decode::{decode_file, MemorySource, PcmReader, SampleSource};
pub use audio::features::{FrameResult, Spectrum};
pub use audio::frames::{Frame, FrameSource, TrailingFrame};
pub use config::{AnalysisConfig, Config};
pub use error::{Error, Result};
pub use pipeline::{spawn, spawn_with_cancel, Analysis, CancelToken, PipelineEvent, PipelineState, RunOutcome, RunReport, StreamingPipeline};
pub use selection::Selection;
pub use spectrogram::{Snapshot, SpectrogramBuffer};
