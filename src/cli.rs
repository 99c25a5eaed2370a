use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "psound", about = "Waveform, spectrogram and lung-sound classification for audio recordings")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG), or raw PCM with --pcm
    pub input: PathBuf,

    /// Config file (defaults to ./psound.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Treat the input as headerless mono 16-bit little-endian PCM
    #[arg(long)]
    pub pcm: bool,

    /// Sample rate of raw PCM input
    #[arg(long, default_value_t = 44_100)]
    pub sample_rate: u32,

    /// Samples per FFT frame (power of two)
    #[arg(long, default_value_t = 1024)]
    pub frame_size: usize,

    /// Samples between frame starts
    #[arg(long, default_value_t = 512)]
    pub hop_size: usize,

    /// Window function: hann, hamming, blackman, rectangular
    #[arg(long, default_value = "hann")]
    pub window: String,

    /// Spectrogram columns kept before the oldest is evicted
    #[arg(long, default_value_t = 500)]
    pub max_columns: usize,

    /// Drop the trailing partial frame instead of zero-padding it
    #[arg(long)]
    pub drop_trailing: bool,

    /// Compute spectra on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Selection start, 0.0-1.0 of the recording
    #[arg(long, default_value_t = 0.0)]
    pub start: f32,

    /// Selection end, 0.0-1.0 of the recording
    #[arg(long, default_value_t = 1.0)]
    pub end: f32,

    /// Classifier weights (TOML with `weights` and `bias`)
    #[arg(short, long)]
    pub model: Option<PathBuf>,
}
