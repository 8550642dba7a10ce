//! chatflow command line
//!
//! # Commands
//!
//! - `chatflow compile --model bot.json` prints the directly-follows graph
//! - `chatflow net --model bot.json` prints the synthesized process model
//! - `chatflow enhance --model bot.json --log log.json` prints the enhanced model
//! - `chatflow stats --log log.json` prints log statistics
//!
//! JSON goes to stdout, logs to stderr. `RUST_LOG` overrides the log level.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

/// Conversation-design mining for chatbot models
#[derive(Debug, Parser)]
#[command(name = "chatflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a bot model into its directly-follows graph
    Compile {
        /// Bot-model JSON file
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Synthesize the Petri net of a bot model
    Net {
        /// Bot-model JSON file
        #[arg(short, long)]
        model: PathBuf,

        /// Keep every routing transition
        #[arg(long)]
        no_reduce: bool,
    },

    /// Enhance a bot model with frequencies, durations and service subprocesses
    Enhance {
        /// Bot-model JSON file
        #[arg(short, long)]
        model: PathBuf,

        /// Event log JSON file
        #[arg(short, long)]
        log: PathBuf,

        /// Precomputed alignments; label matching is used when absent
        #[arg(short, long)]
        alignments: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON object mapping activity names to mean intent confidence
        #[arg(long)]
        confidence: Option<PathBuf>,
    },

    /// Summarize an event log
    Stats {
        /// Event log JSON file
        #[arg(short, long)]
        log: PathBuf,

        /// Print one summary per conversation instead
        #[arg(long)]
        cases: bool,
    },
}

fn setup_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Command::Compile { model } => commands::compile(&model),
        Command::Net { model, no_reduce } => commands::net(&model, !no_reduce),
        Command::Enhance {
            model,
            log,
            alignments,
            config,
            confidence,
        } => commands::enhance(&commands::EnhanceInputs {
            model: &model,
            log: &log,
            alignments: alignments.as_deref(),
            config: config.as_deref(),
            confidence: confidence.as_deref(),
        }),
        Command::Stats { log, cases } => commands::stats(&log, cases),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(commands::exit_code(&err))
        }
    }
}
