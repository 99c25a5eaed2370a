//! Boundary to the lung-sound classifier.
//!
//! The model is opaque: a fixed-length feature vector goes in, one score per
//! label comes out. `LinearClassifier` is a small stand-in that can be
//! loaded from TOML.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::audio::features::{extract_features, FeatureScheme};
use crate::error::{Error, Result};
use crate::spectrogram::Snapshot;

/// Model output classes, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Normal,
    Crackle,
    Wheeze,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Normal, Label::Crackle, Label::Wheeze];

    pub fn from_index(index: usize) -> Option<Label> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::Crackle => "Crackle",
            Label::Wheeze => "Wheeze",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: Label,
    pub confidence: f32,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.label, self.confidence)
    }
}

pub trait Classifier {
    /// Required feature vector length.
    fn input_len(&self) -> usize;

    /// One score per entry of `Label::ALL`.
    fn scores(&self, features: &[f32]) -> Result<Vec<f32>>;
}

/// Highest-scoring label; the first one wins ties.
pub fn classify(classifier: &dyn Classifier, features: &[f32]) -> Result<Classification> {
    let expected = classifier.input_len();
    if features.len() != expected {
        return Err(Error::FeatureLength {
            expected,
            actual: features.len(),
        });
    }

    let scores = classifier.scores(features)?;
    if scores.len() != Label::ALL.len() {
        return Err(Error::Model(format!(
            "expected {} scores, got {}",
            Label::ALL.len(),
            scores.len()
        )));
    }

    let mut best = 0;
    for i in 1..scores.len() {
        if scores[i] > scores[best] {
            best = i;
        }
    }

    Ok(Classification {
        label: Label::ALL[best],
        confidence: scores[best],
    })
}

/// Build features from a spectrogram snapshot and classify them.
pub fn classify_snapshot(
    classifier: &dyn Classifier,
    snapshot: &Snapshot,
    scheme: FeatureScheme,
) -> Result<Classification> {
    let features = extract_features(scheme, snapshot.columns(), classifier.input_len());
    classify(classifier, &features)
}

#[derive(Debug, Deserialize)]
struct LinearModel {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

/// Softmax over `weights * x + bias`.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        let classes = Label::ALL.len();
        if weights.len() != classes || bias.len() != classes {
            return Err(Error::Model(format!(
                "need {} weight rows and biases, got {} and {}",
                classes,
                weights.len(),
                bias.len()
            )));
        }
        let width = weights[0].len();
        if width == 0 || weights.iter().any(|row| row.len() != width) {
            return Err(Error::Model("weight rows must share a non-zero length".into()));
        }
        Ok(Self { weights, bias })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let model: LinearModel = toml::from_str(content).map_err(|e| Error::Model(e.to_string()))?;
        Self::new(model.weights, model.bias)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Model(format!("{}: {}", path.display(), e)))?;
        let model = Self::from_toml_str(&content)?;
        log::info!(
            "Loaded classifier from {} ({} features)",
            path.display(),
            model.input_len()
        );
        Ok(model)
    }
}

impl Classifier for LinearClassifier {
    fn input_len(&self) -> usize {
        self.weights[0].len()
    }

    fn scores(&self, features: &[f32]) -> Result<Vec<f32>> {
        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::Spectrum;
    use crate::spectrogram::SpectrogramBuffer;

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn input_len(&self) -> usize {
            128
        }

        fn scores(&self, _features: &[f32]) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn picks_highest_score() {
        let c = classify(&Fixed(vec![0.1, 0.2, 0.7]), &[0.1; 128]).unwrap();
        assert_eq!(c.label, Label::Wheeze);
        assert!((c.confidence - 0.7).abs() < 1e-6);
        assert_eq!(c.to_string(), "Wheeze (0.70)");
    }

    #[test]
    fn ties_go_to_first_label() {
        let c = classify(&Fixed(vec![0.4, 0.4, 0.2]), &[0.0; 128]).unwrap();
        assert_eq!(c.label, Label::Normal);
    }

    #[test]
    fn rejects_wrong_feature_length() {
        let err = classify(&Fixed(vec![1.0, 0.0, 0.0]), &[0.0; 64]).unwrap_err();
        assert!(matches!(err, Error::FeatureLength { expected: 128, actual: 64 }));
    }

    #[test]
    fn rejects_wrong_score_count() {
        let err = classify(&Fixed(vec![1.0, 0.0]), &[0.0; 128]).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn labels_round_trip_by_index() {
        assert_eq!(Label::from_index(1), Some(Label::Crackle));
        assert_eq!(Label::from_index(3), None);
        assert_eq!(Label::Normal.to_string(), "Normal");
    }

    #[test]
    fn linear_model_from_toml() {
        let model = LinearClassifier::from_toml_str(
            r#"
            weights = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
            bias = [0.5, 0.0, 0.0]
            "#,
        )
        .unwrap();
        assert_eq!(model.input_len(), 2);

        let scores = model.scores(&[0.0, 4.0]).unwrap();
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);

        let c = classify(&model, &[0.0, 4.0]).unwrap();
        assert_eq!(c.label, Label::Wheeze);
        let c = classify(&model, &[0.0, 0.0]).unwrap();
        assert_eq!(c.label, Label::Normal);
    }

    #[test]
    fn linear_model_validates_shape() {
        assert!(LinearClassifier::new(vec![vec![1.0]; 2], vec![0.0; 2]).is_err());
        assert!(LinearClassifier::new(vec![vec![1.0], vec![1.0, 2.0], vec![1.0]], vec![0.0; 3]).is_err());
        assert!(LinearClassifier::from_toml_str("weights = 3").is_err());
        assert!(LinearClassifier::load(Path::new("/nonexistent/model.toml")).is_err());
    }

    #[test]
    fn classifies_snapshot_features() {
        let buffer = SpectrogramBuffer::new(4);
        let mut low = vec![0.0; 8];
        low[0] = 10.0;
        buffer.add_spectrum(Spectrum::new(low));

        // Scores favour energy in the lowest band
        let model = LinearClassifier::new(
            vec![vec![0.0, 0.0], vec![5.0, 0.0], vec![0.0, 5.0]],
            vec![0.0; 3],
        )
        .unwrap();
        let c = classify_snapshot(&model, &buffer.snapshot(), FeatureScheme::BandEnergy).unwrap();
        assert_eq!(c.label, Label::Crackle);

        let c = classify_snapshot(&model, &buffer.snapshot(), FeatureScheme::Placeholder).unwrap();
        assert_eq!(c.label, Label::Crackle);
    }
}
