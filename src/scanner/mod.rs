pub mod labels;

use crate::events::{EventSink, PipelineEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Label table not found: {0}")]
    LabelTableNotFound(PathBuf),
    #[error("No WAV files found under {0}")]
    NoAudioFiles(PathBuf),
}

/// File name → path lookup over a set of search roots.
///
/// Built with a single walk per root; lookups do not touch the filesystem.
#[derive(Debug, Default)]
pub struct FileIndex {
    paths: HashMap<String, PathBuf>,
}

impl FileIndex {
    /// Walk every root recursively (sorted, following symlinks). When two
    /// files share a name the first one encountered is kept.
    pub fn build<P: AsRef<Path>>(roots: &[P], sink: &dyn EventSink) -> Self {
        let mut paths: HashMap<String, PathBuf> = HashMap::new();

        for root in roots {
            let root = root.as_ref();
            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter();
            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!("Error walking {}: {}", root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                match paths.get(&name) {
                    Some(kept) => sink.emit(PipelineEvent::DuplicateFilename {
                        filename: name,
                        kept: kept.display().to_string(),
                        ignored: entry.path().display().to_string(),
                    }),
                    None => {
                        paths.insert(name, entry.into_path());
                    }
                }
            }
        }

        log::info!("Indexed {} files under {} root(s)", paths.len(), roots.len());
        Self { paths }
    }

    pub fn locate(&self, filename: &str) -> Option<&Path> {
        self.paths.get(filename).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Whether a path has a supported audio extension (case-insensitive).
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| crate::SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
