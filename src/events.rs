//! Structured pipeline events.
//!
//! Components report what happened to each sample through an [`EventSink`]
//! handed in by the caller. The CLI uses [`LogSink`]; tests use [`MemorySink`]
//! to assert on outcomes without touching logging or the filesystem.

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A label-table row whose file is not under any search root.
    FileNotFound { filename: String },
    /// The gate refused a file.
    Rejected { filename: String, reason: &'static str, detail: String },
    /// Extraction failed after the gate accepted a file.
    ExtractionFailed { filename: String, reason: &'static str, detail: String },
    /// A sample made it into the corpus.
    SampleExtracted { filename: String, label: String },
    /// A dataset row was dropped during numeric coercion.
    RowDropped { row: usize, detail: String },
    /// Two files under the search roots share a name; the first path wins.
    DuplicateFilename { filename: String, kept: String, ignored: String },
}

impl PipelineEvent {
    pub fn level(&self) -> log::Level {
        match self {
            Self::SampleExtracted { .. } => log::Level::Info,
            Self::DuplicateFilename { .. } => log::Level::Debug,
            _ => log::Level::Warn,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::FileNotFound { filename }
            | Self::Rejected { filename, .. }
            | Self::ExtractionFailed { filename, .. }
            | Self::SampleExtracted { filename, .. }
            | Self::DuplicateFilename { filename, .. } => Some(filename),
            Self::RowDropped { .. } => None,
        }
    }
}

impl std::fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileNotFound { filename } => write!(f, "File not found: {}", filename),
            Self::Rejected { filename, reason, detail } => {
                write!(f, "Rejected {} ({}): {}", filename, reason, detail)
            }
            Self::ExtractionFailed { filename, reason, detail } => {
                write!(f, "Failed to extract features for {} ({}): {}", filename, reason, detail)
            }
            Self::SampleExtracted { filename, label } => {
                write!(f, "Extracted features for {} (label: {})", filename, label)
            }
            Self::RowDropped { row, detail } => write!(f, "Dropped dataset row {}: {}", row, detail),
            Self::DuplicateFilename { filename, kept, ignored } => {
                write!(f, "Duplicate file name {}: using {}, ignoring {}", filename, kept, ignored)
            }
        }
    }
}

/// Receiver for pipeline events. Must be shareable across extraction workers.
pub trait EventSink: Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events to the `log` facade.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: PipelineEvent) {
        log::log!(event.level(), "{}", event);
    }
}

/// Records events in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
