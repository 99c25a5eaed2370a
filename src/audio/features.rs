use serde::Deserialize;
use std::ops::Deref;
use std::sync::Arc;

/// One spectrogram column: magnitudes for bins `0..frame_size / 2`.
///
/// Immutable once built; clones share the same allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum(Arc<[f32]>);

impl Spectrum {
    pub fn new(bins: Vec<f32>) -> Self {
        Self(bins.into())
    }

    pub fn bins(&self) -> &[f32] {
        &self.0
    }

    /// Frame size the spectrum was computed from.
    pub fn frame_size(&self) -> usize {
        self.0.len() * 2
    }

    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0f32, f32::max)
    }

    /// Index of the strongest bin, lowest index on ties.
    pub fn peak_bin(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &m) in self.0.iter().enumerate() {
            if best.map_or(true, |(_, b)| m > b) {
                best = Some((i, m));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Centre frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.frame_size() as f32
    }

    pub fn shares_storage(&self, other: &Spectrum) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Spectrum {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl FromIterator<f32> for Spectrum {
    fn from_iter<I: IntoIterator<Item = f32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<f32>> for Spectrum {
    fn from(bins: Vec<f32>) -> Self {
        Self::new(bins)
    }
}

/// Per-frame output handed to sinks and visitors.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub index: usize,
    /// First sample of the frame in the input stream
    pub offset: usize,
    pub padded: usize,
    /// Mean absolute amplitude, present when the waveform is requested
    pub amplitude: Option<f32>,
    /// Magnitude spectrum, present when the spectrogram is requested
    pub spectrum: Option<Spectrum>,
}

/// How the classifier input vector is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureScheme {
    /// Mean band magnitudes of the spectrogram, log-compressed and peak-scaled
    #[default]
    BandEnergy,
    /// Constant 0.1 filler
    Placeholder,
}

const PLACEHOLDER_VALUE: f32 = 0.1;

pub fn extract_features(scheme: FeatureScheme, columns: &[Spectrum], len: usize) -> Vec<f32> {
    match scheme {
        FeatureScheme::BandEnergy => band_energy(columns, len),
        FeatureScheme::Placeholder => vec![PLACEHOLDER_VALUE; len],
    }
}

/// Pool each column into `bands` contiguous bin ranges, average over
/// columns, compress with `ln(1 + x)` and scale so the loudest band is 1.
pub fn band_energy(columns: &[Spectrum], bands: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; bands];
    if bands == 0 || columns.is_empty() {
        return out;
    }

    let mut used = 0usize;
    for column in columns {
        let bins = column.len();
        if bins == 0 {
            continue;
        }
        used += 1;
        for (band, value) in out.iter_mut().enumerate() {
            let lo = band * bins / bands;
            let hi = ((band + 1) * bins / bands).max(lo + 1).min(bins);
            if lo >= bins {
                continue;
            }
            let slice = &column[lo..hi];
            *value += slice.iter().sum::<f32>() / slice.len() as f32;
        }
    }

    if used == 0 {
        return out;
    }
    for value in out.iter_mut() {
        *value = (*value / used as f32).ln_1p();
    }

    let peak = out.iter().copied().fold(0.0f32, f32::max);
    if peak > 1e-10 {
        for value in out.iter_mut() {
            *value /= peak;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectrum_accessors() {
        let s = Spectrum::new(vec![0.0, 3.0, 5.0, 5.0]);
        assert_eq!(s.len(), 4);
        assert_eq!(s.frame_size(), 8);
        assert_eq!(s.max(), 5.0);
        assert_eq!(s.peak_bin(), Some(2));
        assert!((s.bin_frequency(1, 8000) - 1000.0).abs() < 1e-3);

        let copy = s.clone();
        assert!(copy.shares_storage(&s));
        assert_eq!(Spectrum::new(Vec::new()).peak_bin(), None);
    }

    #[test]
    fn placeholder_is_constant() {
        let v = extract_features(FeatureScheme::Placeholder, &[], 128);
        assert_eq!(v.len(), 128);
        assert!(v.iter().all(|&x| (x - 0.1).abs() < f32::EPSILON));
    }

    #[test]
    fn band_energy_of_nothing_is_zero() {
        assert_eq!(band_energy(&[], 4), vec![0.0; 4]);
        let silent = vec![Spectrum::new(vec![0.0; 16]); 3];
        assert_eq!(band_energy(&silent, 4), vec![0.0; 4]);
    }

    #[test]
    fn band_energy_is_peak_scaled() {
        let mut bins = vec![0.0; 16];
        bins[0] = 8.0;
        bins[12] = 2.0;
        let columns = vec![Spectrum::new(bins); 2];
        let features = band_energy(&columns, 4);
        assert_eq!(features.len(), 4);
        assert!((features[0] - 1.0).abs() < 1e-6);
        assert_eq!(features[1], 0.0);
        assert!(features[3] > 0.0 && features[3] < 1.0);
        assert!(features.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn band_energy_handles_more_bands_than_bins() {
        let columns = vec![Spectrum::new(vec![1.0, 2.0])];
        let features = band_energy(&columns, 8);
        assert_eq!(features.len(), 8);
        assert!(features.iter().all(|&x| x.is_finite()));
        assert!((features[7] - 1.0).abs() < 1e-6);
    }
}
