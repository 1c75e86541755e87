//! Corpus building: label table + audio files → labeled feature rows.

use crate::analyzer::{analyze_file, AnalyzeError};
use crate::dataset::models::Corpus;
use crate::events::{EventSink, PipelineEvent};
use crate::scanner::labels::LabelEntry;
use crate::scanner::FileIndex;
use crate::schema::FeatureVector;
use indicatif::{ProgressBar, ProgressStyle};

/// What happened to one label-table row.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Extracted,
    NotFound,
    Rejected { reason: &'static str, detail: String },
    ExtractionFailed { reason: &'static str, detail: String },
}

impl SampleOutcome {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::NotFound => "not_found",
            Self::Rejected { reason, .. } | Self::ExtractionFailed { reason, .. } => *reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub filename: String,
    pub label: String,
    pub outcome: SampleOutcome,
}

/// The built corpus plus one record per input row, in input order.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub corpus: Corpus,
    pub records: Vec<SampleRecord>,
}

impl BuildReport {
    pub fn extracted(&self) -> usize {
        self.corpus.len()
    }

    /// Rows that did not make it into the corpus.
    pub fn dropped(&self) -> impl Iterator<Item = &SampleRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome != SampleOutcome::Extracted)
    }

    pub fn not_found(&self) -> usize {
        self.records.iter().filter(|r| r.outcome == SampleOutcome::NotFound).count()
    }

    pub fn rejected(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, SampleOutcome::Rejected { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, SampleOutcome::ExtractionFailed { .. }))
            .count()
    }

    pub fn count(&self, reason: &str) -> usize {
        self.records.iter().filter(|r| r.outcome.reason() == reason).count()
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Extraction threads; 1 runs on the calling thread.
    pub workers: usize,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            show_progress: false,
        }
    }
}

type Attempt = Option<Result<FeatureVector, AnalyzeError>>;

fn attempt(entry: &LabelEntry, index: &FileIndex) -> Attempt {
    index.locate(&entry.filename).map(analyze_file)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Extract features for every label-table row whose file can be found.
///
/// Per-file failures are recorded and reported through `sink`; they never stop
/// the build. Extraction may run on several threads, but corpus rows and events
/// always follow the order of `entries`.
pub fn build(
    entries: &[LabelEntry],
    index: &FileIndex,
    opts: &BuildOptions,
    sink: &dyn EventSink,
) -> BuildReport {
    let mut report = BuildReport::default();
    if entries.is_empty() {
        log::info!("Label table is empty; nothing to extract");
        return report;
    }

    let workers = opts.workers.max(1);
    log::info!("Extracting features for {} files with {} workers", entries.len(), workers);

    let pool = if workers > 1 {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Could not start worker pool ({}); extracting sequentially", e);
                None
            }
        }
    } else {
        None
    };

    let pb = progress_bar(entries.len(), opts.show_progress);
    let chunk_size = workers * 2;

    for chunk in entries.chunks(chunk_size) {
        let results: Vec<Attempt> = match &pool {
            Some(pool) => pool.install(|| {
                use rayon::prelude::*;
                chunk
                    .par_iter()
                    .map(|entry| {
                        let result = attempt(entry, index);
                        pb.inc(1);
                        result
                    })
                    .collect()
            }),
            None => chunk
                .iter()
                .map(|entry| {
                    let result = attempt(entry, index);
                    pb.inc(1);
                    result
                })
                .collect(),
        };

        for (entry, result) in chunk.iter().zip(results) {
            let outcome = record(entry, result, &mut report.corpus, sink);
            report.records.push(SampleRecord {
                filename: entry.filename.clone(),
                label: entry.label.clone(),
                outcome,
            });
        }
        pb.set_message(format!("{} extracted", report.corpus.len()));
    }

    pb.finish_with_message(format!(
        "Done: {} extracted, {} dropped",
        report.extracted(),
        report.records.len() - report.extracted()
    ));
    report
}

fn record(
    entry: &LabelEntry,
    result: Attempt,
    corpus: &mut Corpus,
    sink: &dyn EventSink,
) -> SampleOutcome {
    let filename = entry.filename.clone();
    match result {
        None => {
            sink.emit(PipelineEvent::FileNotFound { filename });
            SampleOutcome::NotFound
        }
        Some(Ok(features)) => {
            corpus.push(features, entry.label.clone());
            sink.emit(PipelineEvent::SampleExtracted {
                filename,
                label: entry.label.clone(),
            });
            SampleOutcome::Extracted
        }
        Some(Err(AnalyzeError::Rejected(r))) => {
            let (reason, detail) = (r.reason(), r.to_string());
            sink.emit(PipelineEvent::Rejected {
                filename,
                reason,
                detail: detail.clone(),
            });
            SampleOutcome::Rejected { reason, detail }
        }
        Some(Err(AnalyzeError::Extraction(e))) => {
            let (reason, detail) = (e.reason(), e.to_string());
            sink.emit(PipelineEvent::ExtractionFailed {
                filename,
                reason,
                detail: detail.clone(),
            });
            SampleOutcome::ExtractionFailed { reason, detail }
        }
    }
}
