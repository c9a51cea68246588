//! epiml - membership model CLI
//!
//! Usage:
//!   epiml train members.tsv -o model.epml             # Train and save
//!   epiml train members.tsv -o model.epml --config c.toml
//!   epiml predict model.epml new.tsv                  # TSV predictions on stdout
//!   epiml predict model.epml new.tsv --json -o p.json # JSON predictions to a file
//!   epiml inspect model.epml                          # Show model metadata
//!   epiml score model.epml labeled.tsv                # All metrics on labeled data

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

use commands::{inspect, predict, score, train};

/// epiml - train and apply positive-unlabeled membership models
#[derive(Parser)]
#[command(name = "epiml")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on a labeled membership file and save it
    Train {
        /// Membership file with labels (-1, 0, 1)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Where to write the model
        #[arg(short, long, value_name = "MODEL")]
        output: PathBuf,

        /// TOML training configuration
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Predict members of a file with a saved model
    Predict {
        /// Path to a saved model
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Membership file to predict
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Write predictions to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show model metadata
    Inspect {
        /// Path to a saved model
        #[arg(value_name = "MODEL")]
        model: PathBuf,
    },

    /// Score a saved model on a labeled membership file
    Score {
        /// Path to a saved model
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Labeled membership file
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Metric reported as the decision score
        #[arg(long, default_value = "labeled_f1")]
        decision_score: String,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "epiml=debug,epiml_cli=debug"
        } else if quiet {
            "error"
        } else {
            "warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Train {
            data,
            output,
            config,
        } => train::run(&data, &output, config.as_deref(), cli.json, cli.quiet),

        Commands::Predict {
            model,
            data,
            output,
        } => predict::run(&model, &data, output.as_deref(), cli.json, cli.quiet),

        Commands::Inspect { model } => inspect::run(&model, cli.json),

        Commands::Score {
            model,
            data,
            decision_score,
        } => score::run(&model, &data, &decision_score, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
