use std::path::PathBuf;

use clap::{Parser, Subcommand};

use diabetes_risk::{
    error::Result, forest::ForestConfig, history::PredictionStore, inference::ModelState,
    schema::FeatureVector, train::{run_training, TrainingConfig},
};

#[derive(Parser, Debug)]
#[command(
    name = "diabetes-risk",
    version,
    about = "Train and serve a diabetes risk classifier over clinical measurements"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the offline training pipeline and persist the model artifacts
    Train {
        /// Labeled CSV dataset (canonical columns + Outcome)
        #[arg(long)]
        file: PathBuf,

        /// Directory for the four model artifacts
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Directory for the diagnostic charts
        #[arg(long, default_value = "reports")]
        reports: PathBuf,

        /// Skip rendering the PNG charts
        #[arg(long)]
        no_charts: bool,

        /// Held-out fraction for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Random seed for the split and the forest
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of trees in the ensemble
        #[arg(long, default_value_t = 200)]
        trees: usize,

        /// Maximum tree depth
        #[arg(long, default_value_t = 10)]
        max_depth: usize,
    },

    /// Predict one patient and append the result to the history
    Predict {
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        #[arg(long, default_value = "predictions.json")]
        store: PathBuf,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        pregnancies: u32,

        #[arg(long)]
        glucose: f64,

        #[arg(long)]
        blood_pressure: f64,

        #[arg(long)]
        skin_thickness: f64,

        #[arg(long)]
        insulin: f64,

        #[arg(long)]
        bmi: f64,

        #[arg(long)]
        diabetes_pedigree: f64,

        #[arg(long)]
        age: u32,
    },

    /// List stored predictions, newest first
    History {
        #[arg(long, default_value = "predictions.json")]
        store: PathBuf,
    },

    /// Delete one stored prediction by id
    Delete {
        #[arg(long, default_value = "predictions.json")]
        store: PathBuf,

        #[arg(long)]
        id: u64,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train {
            file,
            artifacts,
            reports,
            no_charts,
            test_fraction,
            seed,
            trees,
            max_depth,
        } => {
            let config = TrainingConfig {
                dataset_path: file,
                artifact_dir: artifacts,
                report_dir: (!no_charts).then_some(reports),
                test_fraction,
                split_seed: seed,
                forest: ForestConfig {
                    n_trees: trees,
                    max_depth,
                    seed,
                    ..ForestConfig::default()
                },
            };
            run_training(&config)?;
        }

        Command::Predict {
            artifacts,
            store,
            first_name,
            last_name,
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree,
            age,
        } => {
            let state = ModelState::load(&artifacts);
            let features = FeatureVector {
                pregnancies,
                glucose,
                blood_pressure,
                skin_thickness,
                insulin,
                bmi,
                diabetes_pedigree,
                age,
            };

            let prediction = state.predict(&features)?;

            let mut history = PredictionStore::open(&store)?;
            let record = history.record(&first_name, &last_name, features, &prediction)?;

            println!(
                "{} {}: {} ({:.2}% probability, {} risk)",
                record.first_name,
                record.last_name,
                if record.diabetic { "diabetic" } else { "non-diabetic" },
                record.probability_pct,
                record.risk_level()
            );
            println!("stored as record #{}", record.id);
        }

        Command::History { store } => {
            let history = PredictionStore::open(&store)?;
            let summary = history.summary();

            println!(
                "{} predictions ({} diabetic, {} non-diabetic)",
                summary.total, summary.diabetic, summary.non_diabetic
            );
            println!(
                "{:>5} {:<24} {:>10} {:>10} {:<10} {}",
                "id", "patient", "outcome", "prob %", "risk", "date"
            );
            println!("{:-<80}", "");

            for record in history.list() {
                println!(
                    "{:>5} {:<24} {:>10} {:>10.2} {:<10} {}",
                    record.id,
                    format!("{} {}", record.first_name, record.last_name),
                    if record.diabetic { "diabetic" } else { "healthy" },
                    record.probability_pct,
                    record.risk_level().to_string(),
                    record.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Command::Delete { store, id } => {
            let mut history = PredictionStore::open(&store)?;
            history.delete(id)?;
            println!("deleted record #{}", id);
        }
    }

    Ok(())
}
