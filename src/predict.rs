//! Single-file genre prediction against a saved artifact.

use crate::analyzer::decode::{self, DecodeError, Waveform};
use crate::analyzer::{analyze_waveform, AnalyzeError};
use crate::model::artifact::{ArtifactError, TrainedArtifact};
use crate::schema::FeatureVector;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl PredictionError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Analyze(e) => e.reason(),
            Self::Artifact(e) => e.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Class probabilities, most likely first.
    pub probabilities: Vec<(String, f64)>,
}

/// Applies a trained artifact's normalization and classifier to new samples.
///
/// The normalization parameters are the ones stored at training time and are
/// never refit here.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: TrainedArtifact,
}

impl Predictor {
    pub fn new(artifact: TrainedArtifact) -> Self {
        Self { artifact }
    }

    pub fn load(model_path: &Path) -> Result<Self, ArtifactError> {
        TrainedArtifact::load(model_path).map(Self::new)
    }

    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }

    pub fn predict_vector(&self, features: &FeatureVector) -> Prediction {
        let row = self.artifact.scaler.transform_row(&features.to_f64());
        let forest = &self.artifact.forest;
        let label = forest.predict(&row).to_string();

        let mut probabilities: Vec<(String, f64)> = forest
            .classes
            .iter()
            .cloned()
            .zip(forest.predict_proba(&row))
            .collect();
        probabilities.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Prediction {
            label,
            probabilities,
        }
    }

    /// Gate, extract and classify one decode attempt.
    pub fn predict(
        &self,
        attempt: Result<Waveform, DecodeError>,
    ) -> Result<Prediction, PredictionError> {
        let features = analyze_waveform(attempt)?;
        Ok(self.predict_vector(&features))
    }
}

/// Predict the genre of one audio file.
///
/// The audio is gated and analyzed before the artifact is opened, so an
/// unusable clip fails the same way whether or not a model exists.
pub fn predict_file(audio: &Path, model_path: &Path) -> Result<Prediction, PredictionError> {
    let features = analyze_waveform(decode::load_audio(audio))?;
    let predictor = Predictor::load(model_path)?;
    let prediction = predictor.predict_vector(&features);
    log::info!(
        "{}: {}",
        audio.file_name().and_then(|f| f.to_str()).unwrap_or("?"),
        prediction.label
    );
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::models::Corpus;
    use crate::model::{fit_corpus, TrainOptions};
    use crate::schema::FEATURE_COUNT;

    fn vector(center: f32) -> FeatureVector {
        let values: Vec<f32> = (0..FEATURE_COUNT).map(|i| center + i as f32 * 0.1).collect();
        FeatureVector::from_slice(&values).unwrap()
    }

    fn predictor() -> Predictor {
        let mut corpus = Corpus::new();
        for k in 0..8 {
            let j = k as f32 * 0.1;
            corpus.push(vector(100.0 + j), "jazz");
            corpus.push(vector(-100.0 - j), "pop");
        }
        let opts = TrainOptions {
            n_trees: 10,
            ..TrainOptions::default()
        };
        Predictor::new(fit_corpus(&corpus, &opts).unwrap().artifact)
    }

    #[test]
    fn test_predict_vector() {
        let p = predictor();
        let jazz = p.predict_vector(&vector(100.3));
        assert_eq!(jazz.label, "jazz");
        assert_eq!(jazz.probabilities[0].0, "jazz");
        let total: f64 = jazz.probabilities.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);

        assert_eq!(p.predict_vector(&vector(-100.5)).label, "pop");
    }

    #[test]
    fn test_short_clip_rejected_before_classification() {
        let p = predictor();
        let short = Waveform::new(vec![0.1; 22_050], 22_050);
        let err = p.predict(short).unwrap_err();
        assert_eq!(err.reason(), "too_short");
    }

    #[test]
    fn test_predict_file_checks_audio_before_model() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("short.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&clip, spec).unwrap();
        for _ in 0..22_050 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let missing_model = dir.path().join("no_model.json");
        let err = predict_file(&clip, &missing_model).unwrap_err();
        assert!(matches!(err, PredictionError::Analyze(_)));
        assert_eq!(err.reason(), "too_short");
    }
}
