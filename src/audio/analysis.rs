use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Deserialize;
use std::f32::consts::PI;
use std::sync::Arc;

use super::features::Spectrum;
use super::frames::Frame;
use crate::error::{Error, Result};

/// Taper applied to each frame before the FFT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// No taper; the raw frame goes straight into the FFT
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowKind {
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size < 2 {
            return vec![1.0; size];
        }
        let denom = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / denom;
                match self {
                    WindowKind::Rectangular => 1.0,
                    WindowKind::Hann => 0.5 * (1.0 - phase.cos()),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowKind::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
                }
            })
            .collect()
    }
}

/// Windowed magnitude spectrum of one frame.
///
/// The FFT plan and window coefficients are built once; `analyze` itself
/// holds no state, so one analyzer can be shared across rayon workers.
pub struct SpectralAnalyzer {
    frame_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(frame_size: usize, window: WindowKind) -> Result<Self> {
        if frame_size == 0 || !frame_size.is_power_of_two() {
            return Err(Error::InvalidFrameSize(frame_size));
        }
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        Ok(Self {
            frame_size,
            window: window.coefficients(frame_size),
            fft,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Number of bins in every produced spectrum.
    pub fn bins(&self) -> usize {
        self.frame_size / 2
    }

    /// `spectrum[k] = |FFT(window * samples)[k]|` for `k < frame_size / 2`.
    pub fn analyze(&self, samples: &[f32]) -> Result<Spectrum> {
        if samples.len() != self.frame_size {
            return Err(Error::FrameLength {
                expected: self.frame_size,
                actual: samples.len(),
            });
        }

        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        Ok(buffer[..self.bins()].iter().map(|c| c.norm()).collect())
    }

    pub fn analyze_frame(&self, frame: &Frame) -> Result<Spectrum> {
        self.analyze(&frame.samples)
    }
}

/// Mean absolute amplitude of a frame, for the waveform overview.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmplitudeTracker;

impl AmplitudeTracker {
    /// Empty input reads as silence.
    pub fn amplitude(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
    }

    pub fn track(&self, frame: &Frame) -> f32 {
        Self::amplitude(&frame.samples)
    }
}
