use super::{is_supported_audio, ScanError};
use crate::dataset::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the label table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub filename: String,
    pub label: String,
}

impl LabelEntry {
    pub fn new(filename: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            label: label.into(),
        }
    }
}

/// Read a `filename,label` table. Rows with an empty field are skipped.
pub fn read_label_table(path: &Path) -> Result<Vec<LabelEntry>, ScanError> {
    if !path.exists() {
        return Err(ScanError::LabelTableNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut entries = Vec::new();
    for (i, row) in reader.deserialize::<LabelEntry>().enumerate() {
        let entry = row?;
        if entry.filename.is_empty() || entry.label.is_empty() {
            log::warn!("Skipping label row {} with an empty field", i + 1);
            continue;
        }
        entries.push(entry);
    }

    log::info!("Read {} labels from {}", entries.len(), path.display());
    Ok(entries)
}

pub fn write_label_table(path: &Path, entries: &[LabelEntry]) -> Result<(), ScanError> {
    write_atomic(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        for entry in entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Supported audio files directly inside `dir`, sorted by name.
fn audio_files_in(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| is_supported_audio(&e.path()))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

/// Build a label table from `<data_dir>/<Genre>/*.wav`, labelling each file
/// with the lowercase genre name. Missing genre directories are skipped.
pub fn generate_label_table(data_dir: &Path, genres: &[String]) -> Result<Vec<LabelEntry>, ScanError> {
    let mut entries = Vec::new();

    for genre in genres {
        let genre_dir = data_dir.join(genre);
        if !genre_dir.is_dir() {
            log::warn!("Genre directory {} does not exist", genre_dir.display());
            continue;
        }
        let label = genre.to_lowercase();
        for name in audio_files_in(&genre_dir)? {
            entries.push(LabelEntry::new(name, label.clone()));
        }
    }

    if entries.is_empty() {
        return Err(ScanError::NoAudioFiles(data_dir.to_path_buf()));
    }
    Ok(entries)
}

/// WAV file count per genre directory; a missing directory counts as 0.
pub fn count_by_genre(data_dir: &Path, genres: &[String]) -> Vec<(String, usize)> {
    genres
        .iter()
        .map(|genre| {
            let genre_dir = data_dir.join(genre);
            let count = match audio_files_in(&genre_dir) {
                Ok(files) => files.len(),
                Err(e) => {
                    log::warn!("Cannot read {}: {}", genre_dir.display(), e);
                    0
                }
            };
            (genre.clone(), count)
        })
        .collect()
}
