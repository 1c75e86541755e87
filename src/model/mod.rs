pub mod artifact;
pub mod forest;
pub mod report;
pub mod scaler;

use crate::dataset::coerce;
use crate::dataset::models::{Corpus, DatasetTable};
use crate::events::EventSink;
use artifact::TrainedArtifact;
use forest::{ForestParams, RandomForest};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use report::ClassificationReport;
use scaler::StandardScaler;
use serde::Deserialize;
use thiserror::Error;

use crate::schema::FEATURE_COUNT;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Dataset is empty; build the corpus first")]
    EmptyCorpus,
    #[error("No valid rows left after cleaning ({dropped} dropped)")]
    NoValidRows { dropped: usize },
    #[error("Invalid training options: {0}")]
    InvalidOptions(String),
}

impl TrainingError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyCorpus => "empty_corpus",
            Self::NoValidRows { .. } => "no_valid_rows",
            Self::InvalidOptions(_) => "invalid_options",
        }
    }
}

/// Training hyperparameters. Loaded from the `[training]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub seed: u64,
    /// Fraction of rows held out for the report.
    pub test_fraction: f64,
    pub n_trees: usize,
    pub max_depth: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            n_trees: 200,
            max_depth: 10,
        }
    }
}

impl TrainOptions {
    fn validate(&self) -> Result<(), TrainingError> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(TrainingError::InvalidOptions(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_trees == 0 {
            return Err(TrainingError::InvalidOptions("n_trees must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(TrainingError::InvalidOptions("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything a training run produced. Nothing is written to disk here.
#[derive(Debug)]
pub struct TrainOutcome {
    pub artifact: TrainedArtifact,
    pub report: ClassificationReport,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Clean a dataset table and fit on the surviving rows.
pub fn fit(
    table: &DatasetTable,
    opts: &TrainOptions,
    sink: &dyn EventSink,
) -> Result<TrainOutcome, TrainingError> {
    opts.validate()?;
    if table.is_empty() {
        return Err(TrainingError::EmptyCorpus);
    }

    let coerced = coerce(table, sink);
    let dropped = coerced.dropped_lines.len();
    if dropped > 0 {
        log::warn!("Dropped {} of {} dataset rows", dropped, table.len());
    }
    if coerced.corpus.is_empty() {
        return Err(TrainingError::NoValidRows { dropped });
    }

    let mut outcome = fit_corpus(&coerced.corpus, opts)?;
    outcome.rows_dropped = dropped;
    Ok(outcome)
}

/// Held-out row count: `ceil(n * fraction)`, leaving at least one row to train on.
fn test_size(n: usize, fraction: f64) -> usize {
    let wanted = (n as f64 * fraction).ceil() as usize;
    wanted.min(n.saturating_sub(1))
}

/// Seeded shuffle split into (train, test) row indices.
fn split_indices(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);
    let test = idx.split_off(n - test_size(n, fraction));
    (idx, test)
}

/// Fit normalization and classifier on an already-clean corpus.
///
/// The scaler sees training rows only; held-out rows are transformed with the
/// fitted parameters, exactly as prediction does later.
pub fn fit_corpus(corpus: &Corpus, opts: &TrainOptions) -> Result<TrainOutcome, TrainingError> {
    opts.validate()?;
    if corpus.is_empty() {
        return Err(TrainingError::EmptyCorpus);
    }

    let rows: Vec<Vec<f64>> = corpus.iter().map(|s| s.features.to_f64()).collect();
    let labels: Vec<String> = corpus.iter().map(|s| s.label.clone()).collect();

    let (train_idx, test_idx) = split_indices(rows.len(), opts.test_fraction, opts.seed);
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<String>) {
        idx.iter().map(|&i| (rows[i].clone(), labels[i].clone())).unzip()
    };
    let (train_x, train_y) = pick(&train_idx);
    let (test_x, test_y) = pick(&test_idx);

    log::info!(
        "Training on {} rows, holding out {} ({} classes)",
        train_x.len(),
        test_x.len(),
        corpus.labels().len()
    );

    let scaler = StandardScaler::fit(&train_x, FEATURE_COUNT);
    let forest = RandomForest::fit(
        &scaler.transform(&train_x),
        &train_y,
        ForestParams {
            n_trees: opts.n_trees,
            max_depth: opts.max_depth,
            seed: opts.seed,
        },
    );

    let predicted: Vec<String> = scaler
        .transform(&test_x)
        .iter()
        .map(|row| forest.predict(row).to_string())
        .collect();
    let report = ClassificationReport::compute(&test_y, &predicted);

    Ok(TrainOutcome {
        artifact: TrainedArtifact::new(scaler, forest),
        report,
        rows_used: corpus.len(),
        rows_dropped: 0,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    })
}
