use serde::Deserialize;
use std::path::Path;

use crate::audio::analysis::WindowKind;
use crate::audio::features::FeatureScheme;
use crate::audio::frames::TrailingFrame;
use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Framing and spectrum parameters for one streaming run.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Sample rate of the incoming PCM stream (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples per frame, must be a power of two
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// Samples between consecutive frame starts
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default)]
    pub trailing: TrailingFrame,
    /// Spectrogram columns kept before the oldest is evicted
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
    /// Analyze frames in rayon batches instead of one at a time
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_feature_len")]
    pub feature_len: usize,
    #[serde(default)]
    pub features: FeatureScheme,
    #[serde(default)]
    pub model: Option<std::path::PathBuf>,
}

/// Selection handle behaviour, in normalized [0, 1] units.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_min_gap")]
    pub min_gap: f32,
    #[serde(default = "default_grab_radius")]
    pub grab_radius: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
            hop_size: default_hop_size(),
            window: WindowKind::default(),
            trailing: TrailingFrame::default(),
            max_columns: default_max_columns(),
            parallel: false,
            batch_size: default_batch_size(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_size == 0 || !self.frame_size.is_power_of_two() {
            return Err(Error::InvalidFrameSize(self.frame_size));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(Error::InvalidHop {
                hop: self.hop_size,
                frame_size: self.frame_size,
            });
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.max_columns == 0 {
            return Err(Error::InvalidConfig("max_columns must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        Ok(())
    }

    /// Number of magnitude bins per spectrum.
    pub fn bins(&self) -> usize {
        self.frame_size / 2
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            feature_len: default_feature_len(),
            features: FeatureScheme::default(),
            model: None,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_gap: default_min_gap(),
            grab_radius: default_grab_radius(),
        }
    }
}

fn default_sample_rate() -> u32 { 44_100 }
fn default_frame_size() -> usize { 1024 }
fn default_hop_size() -> usize { 512 }
fn default_max_columns() -> usize { 500 }
fn default_batch_size() -> usize { 64 }
fn default_feature_len() -> usize { 128 }
fn default_min_gap() -> f32 { 0.02 }
fn default_grab_radius() -> f32 { 0.03 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::debug!("Config parse error in {}: {}", path.display(), err);
            None
        }
    }
}
