//! CLI entry point for the lungrisk pipeline.
//!
//! Subcommands:
//!   train  -- Fit the risk model from a survey CSV and persist the artifact
//!   score  -- Score an intake record JSON against a persisted artifact

mod config;

use clap::{Parser, Subcommand};
use lungrisk_core::{PatientIntake, TrainSettings};
use lungrisk_model::RiskScorer;
use lungrisk_train::trainer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lungrisk", about = "Lung cancer risk model pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit the risk model from a survey CSV and persist the artifact.
    Train {
        /// Path to the survey CSV.
        #[arg(long)]
        dataset: PathBuf,

        /// Output directory for the model artifact.
        #[arg(long, default_value = "models/lungrisk")]
        output_dir: PathBuf,

        /// Optional YAML file with training settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Learning rate (overrides the config file).
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Mini-batch size (overrides the config file).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Epoch cap (overrides the config file).
        #[arg(long)]
        max_epochs: Option<usize>,

        /// Held-out test fraction (overrides the config file).
        #[arg(long)]
        test_ratio: Option<f64>,

        /// Seed for the split and batch shuffles (overrides the config file).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score an intake record against a persisted artifact.
    Score {
        /// Directory containing the model artifact.
        #[arg(long, default_value = "models/lungrisk")]
        model_dir: PathBuf,

        /// Path to an intake record JSON file.
        #[arg(long)]
        intake: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Train {
            dataset,
            output_dir,
            config,
            learning_rate,
            batch_size,
            max_epochs,
            test_ratio,
            seed,
        } => {
            let mut settings = match config {
                Some(path) => config::load_settings(&path)?,
                None => TrainSettings::default(),
            };
            if let Some(value) = learning_rate {
                settings.learning_rate = value;
            }
            if let Some(value) = batch_size {
                settings.batch_size = value;
            }
            if let Some(value) = max_epochs {
                settings.max_epochs = value;
            }
            if let Some(value) = test_ratio {
                settings.test_ratio = value;
            }
            if let Some(value) = seed {
                settings.seed = value;
            }

            let outcome = trainer::train(&dataset, &output_dir, &settings)?;
            println!(
                "Model trained with accuracy: {:.2}%",
                outcome.accuracy * 100.0
            );
            println!("Artifacts written to: {}", outcome.model_dir.display());
            Ok(())
        }

        Command::Score { model_dir, intake } => {
            let contents = std::fs::read_to_string(&intake).map_err(|e| {
                anyhow::anyhow!("Failed to read intake file {}: {}", intake.display(), e)
            })?;
            let record: PatientIntake = serde_json::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse intake JSON: {}", e))?;

            let scorer = RiskScorer::load(&model_dir)?;
            let assessment = scorer.score(&record)?;

            println!(
                "Prediction: {:.2}% chance of lung cancer.",
                assessment.percentage
            );
            println!(
                "Risk tier: {} ({})",
                assessment.tier,
                assessment.tier.color()
            );
            println!("{}", assessment.tier.advisory());
            Ok(())
        }
    }
}
