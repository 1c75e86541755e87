use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genrekit::config::AppConfig;
use genrekit::corpus::{self, BuildOptions};
use genrekit::events::LogSink;
use genrekit::scanner::labels;
use genrekit::scanner::FileIndex;
use genrekit::{dataset, model, predict};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "genrekit", version, about = "Music genre classifier for WAV clips")]
struct Cli {
    /// Config file (defaults to ~/.config/genrekit/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the label table from per-genre directories
    Labels {
        /// Root with one directory per genre
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Where to write the label table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count WAV files per genre directory
    Count {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Extract features for every labeled file and write the dataset
    Build {
        /// Search root for audio files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Label table to read
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Dataset file to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel workers (0 = auto-detect)
        #[arg(short, long, default_value = "0")]
        jobs: usize,
    },

    /// Train a classifier on the dataset and save the model
    Train {
        /// Dataset file to read
        #[arg(long)]
        features: Option<PathBuf>,

        /// Where to save the model
        #[arg(long)]
        model: Option<PathBuf>,

        /// Seed for the split and the forest
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict the genre of a WAV clip
    Predict {
        /// Audio file to classify
        audio: PathBuf,

        /// Trained model
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Labels { data_dir, output } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            let output = output.unwrap_or(config.labels_path);
            let entries = labels::generate_label_table(&data_dir, &config.genres)
                .context("Label generation failed")?;
            labels::write_label_table(&output, &entries)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} labels to {}", entries.len(), output.display());
        }

        Commands::Count { data_dir } => {
            let data_dir = data_dir.unwrap_or(config.data_dir);
            for (genre, count) in labels::count_by_genre(&data_dir, &config.genres) {
                println!("{:<12} {:>6}", genre, count);
            }
        }

        Commands::Build { data_dir, labels: labels_path, output, jobs } => {
            let data_dir = data_dir.unwrap_or(config.data_dir.clone());
            let labels_path = labels_path.unwrap_or(config.labels_path.clone());
            let output = output.unwrap_or(config.features_path.clone());
            let workers = if jobs > 0 { jobs } else { config.resolve_workers() };

            let entries = labels::read_label_table(&labels_path)
                .context("Failed to read label table")?;
            if entries.is_empty() {
                anyhow::bail!("Label table {} has no rows", labels_path.display());
            }

            let index = FileIndex::build(&[&data_dir], &LogSink);
            let opts = BuildOptions {
                workers,
                show_progress: true,
            };
            let report = corpus::build(&entries, &index, &opts, &LogSink);

            println!(
                "Build complete: {} extracted, {} not found, {} rejected, {} failed",
                report.extracted(),
                report.not_found(),
                report.rejected(),
                report.failed(),
            );
            for record in report.dropped() {
                println!("  {} ({}): {}", record.filename, record.label, record.outcome.reason());
            }

            if report.corpus.is_empty() {
                anyhow::bail!("No samples were extracted; dataset not written");
            }
            dataset::write_corpus(&output, &report.corpus)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} samples to {}", report.extracted(), output.display());
        }

        Commands::Train { features, model: model_path, seed } => {
            let features = features.unwrap_or(config.features_path.clone());
            let model_path = model_path.unwrap_or(config.model_path.clone());
            let mut opts = config.training.clone();
            if let Some(seed) = seed {
                opts.seed = seed;
            }

            let table = dataset::read_table(&features).context("Failed to read dataset")?;
            let outcome = model::fit(&table, &opts, &LogSink).context("Training failed")?;

            println!(
                "Trained on {} rows ({} dropped): {} train, {} held out",
                outcome.rows_used, outcome.rows_dropped, outcome.train_rows, outcome.test_rows
            );
            println!();
            print!("{}", outcome.report);

            outcome
                .artifact
                .save(&model_path)
                .with_context(|| format!("Failed to save model to {}", model_path.display()))?;
            println!();
            println!("Model saved to {}", model_path.display());
        }

        Commands::Predict { audio, model: model_path } => {
            let model_path = model_path.unwrap_or(config.model_path);
            let prediction = predict::predict_file(&audio, &model_path)
                .with_context(|| format!("Prediction failed for {}", audio.display()))?;

            println!("Predicted genre: {}", prediction.label);
            for (label, p) in &prediction.probabilities {
                println!("  {:<12} {:>6.1}%", label, p * 100.0);
            }
        }
    }

    Ok(())
}
