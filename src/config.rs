use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::model::TrainOptions;

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root holding one sub-directory of WAV clips per genre.
    pub data_dir: PathBuf,
    /// Label table (`filename,label`).
    pub labels_path: PathBuf,
    /// Dataset file written by `build` and read by `train`.
    pub features_path: PathBuf,
    /// Trained artifact.
    pub model_path: PathBuf,
    /// Number of parallel extraction workers. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    /// Genre directory names under `data_dir`.
    pub genres: Vec<String>,
    /// Training hyperparameters.
    pub training: TrainOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            labels_path: PathBuf::from("data/labels.csv"),
            features_path: PathBuf::from("features/features.csv"),
            model_path: PathBuf::from("model/model.json"),
            workers: 0,
            genres: vec!["Jazz".into(), "Phonk".into(), "Pop".into()],
            training: TrainOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/genrekit/config.toml`, or from `explicit`
    /// when given. Returns default config if the file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load(explicit: Option<&Path>) -> Self {
        let config_path = explicit.map(Path::to_path_buf).or_else(Self::config_path);
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Some(path) if explicit.is_some() => {
                log::warn!("Config file {} not found. Using defaults.", path.display());
                Self::default()
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        resolve_workers(self.workers)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        (cores / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.genres, vec!["Jazz", "Phonk", "Pop"]);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.n_trees, 200);
        assert!(config.resolve_workers() >= 1);
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::parse(
            r#"
            workers = 3
            genres = ["Jazz", "Rock"]

            [training]
            seed = 7
            test_fraction = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.resolve_workers(), 3);
        assert_eq!(config.genres, vec!["Jazz", "Rock"]);
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_fraction, 0.25);
        assert_eq!(config.training.max_depth, 10);
        assert_eq!(config.model_path, PathBuf::from("model/model.json"));
    }

    #[test]
    fn test_load_bad_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "workers = \"many\"").unwrap();
        let config = AppConfig::load(Some(&path));
        assert_eq!(config.workers, 0);

        let missing = AppConfig::load(Some(&dir.path().join("nope.toml")));
        assert_eq!(missing.labels_path, PathBuf::from("data/labels.csv"));
    }
}
