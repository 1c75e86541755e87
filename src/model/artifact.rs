use super::forest::RandomForest;
use super::scaler::StandardScaler;
use crate::dataset::write_atomic;
use crate::schema::{fingerprint, FEATURE_COLUMNS, FEATURE_COUNT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bumped whenever the serialized layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Model artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported artifact format version {found} (expected {})", FORMAT_VERSION)]
    Version { found: u32 },
    #[error("Model was trained against a different feature schema: {0}")]
    IncompatibleSchema(String),
}

impl ArtifactError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "artifact_not_found",
            Self::Io(_) => "artifact_io",
            Self::Parse(_) => "artifact_parse",
            Self::Version { .. } => "artifact_version",
            Self::IncompatibleSchema(_) => "incompatible_schema",
        }
    }
}

/// Normalization state and classifier, persisted as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub format_version: u32,
    pub columns: Vec<String>,
    pub fingerprint: String,
    pub trained_at: DateTime<Utc>,
    pub classes: Vec<String>,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
}

impl TrainedArtifact {
    pub fn new(scaler: StandardScaler, forest: RandomForest) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            fingerprint: fingerprint(),
            trained_at: Utc::now(),
            classes: forest.classes.clone(),
            scaler,
            forest,
        }
    }

    /// Write atomically; an existing artifact is replaced only once the new
    /// one is fully on disk.
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        write_atomic::<ArtifactError, _>(path, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
            Ok(())
        })?;
        log::info!("Saved model ({} trees) to {}", self.forest.n_trees(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&contents)?;
        artifact.check_compatible()?;
        log::debug!(
            "Loaded model trained at {} with classes {:?}",
            artifact.trained_at.to_rfc3339(),
            artifact.classes
        );
        Ok(artifact)
    }

    /// Reject artifacts whose layout differs from the running extractor.
    pub fn check_compatible(&self) -> Result<(), ArtifactError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Version { found: self.format_version });
        }
        if !self.columns.iter().map(String::as_str).eq(FEATURE_COLUMNS.iter().copied()) {
            return Err(ArtifactError::IncompatibleSchema(format!(
                "artifact has {} columns [{}], extractor produces {}",
                self.columns.len(),
                self.columns.join(","),
                FEATURE_COUNT
            )));
        }
        if self.fingerprint != fingerprint() {
            return Err(ArtifactError::IncompatibleSchema(
                "extraction parameters differ from the current build".to_string(),
            ));
        }
        if self.scaler.dim() != FEATURE_COUNT || self.forest.n_features != FEATURE_COUNT {
            return Err(ArtifactError::IncompatibleSchema(format!(
                "normalization has {} columns, classifier expects {}",
                self.scaler.dim(),
                self.forest.n_features
            )));
        }
        let classes = self.forest.classes.len();
        if self.classes != self.forest.classes
            || !self.forest.trees().iter().all(|t| t.is_well_formed(FEATURE_COUNT, classes))
        {
            return Err(ArtifactError::IncompatibleSchema(
                "classifier structure does not match its class list".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::forest::ForestParams;

    fn tiny_artifact() -> TrainedArtifact {
        let x: Vec<Vec<f64>> = (0..6)
            .map(|i| (0..FEATURE_COUNT).map(|j| (i * 10 + j) as f64).collect())
            .collect();
        let labels: Vec<String> = ["jazz", "jazz", "jazz", "pop", "pop", "pop"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let scaler = StandardScaler::fit(&x, FEATURE_COUNT);
        let scaled = scaler.transform(&x);
        let forest = RandomForest::fit(
            &scaled,
            &labels,
            ForestParams { n_trees: 3, max_depth: 4, seed: 1 },
        );
        TrainedArtifact::new(scaler, forest)
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("model.json");
        let artifact = tiny_artifact();
        artifact.save(&path).unwrap();

        let loaded = TrainedArtifact::load(&path).unwrap();
        assert_eq!(loaded.classes, vec!["jazz", "pop"]);
        assert_eq!(loaded.scaler, artifact.scaler);
        assert_eq!(loaded.forest, artifact.forest);
        assert_eq!(loaded.fingerprint, fingerprint());
    }

    #[test]
    fn test_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        assert!(matches!(TrainedArtifact::load(&path), Err(ArtifactError::NotFound(_))));

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(TrainedArtifact::load(&path), Err(ArtifactError::Parse(_))));
    }

    #[test]
    fn test_incompatible_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut artifact = tiny_artifact();
        artifact.columns.swap(0, 1);
        artifact.save(&path).unwrap();
        let err = TrainedArtifact::load(&path).unwrap_err();
        assert_eq!(err.reason(), "incompatible_schema");

        let mut artifact = tiny_artifact();
        artifact.columns.pop();
        artifact.save(&path).unwrap();
        assert!(matches!(
            TrainedArtifact::load(&path),
            Err(ArtifactError::IncompatibleSchema(_))
        ));

        let mut artifact = tiny_artifact();
        artifact.fingerprint = "0".repeat(64);
        assert!(matches!(
            artifact.check_compatible(),
            Err(ArtifactError::IncompatibleSchema(_))
        ));
    }

    #[test]
    fn test_unknown_version() {
        let mut artifact = tiny_artifact();
        artifact.format_version = 99;
        assert!(matches!(
            artifact.check_compatible(),
            Err(ArtifactError::Version { found: 99 })
        ));
    }
}
