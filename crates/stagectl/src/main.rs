//! Stagectl - classify free-text input into stage navigation intents.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log filter variable; overrides `--verbose`
const LOG_ENV: &str = "STAGECTL_LOG";

#[derive(Parser)]
#[command(name = "stagectl")]
#[command(about = "Stage navigation intent classifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify input and print the response JSON
    Classify {
        input: String,

        /// Task context JSON file
        #[arg(long)]
        context: Option<PathBuf>,

        /// Config file (TOML, or JSON with a .json extension)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ignore any configured backend
        #[arg(long)]
        patterns_only: bool,
    },

    /// Print the stage the input refers to, or "none"
    Stage {
        input: String,

        #[arg(long)]
        context: Option<PathBuf>,
    },

    /// Print the active classification rules
    Rules {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a task context file
    Validate {
        #[arg(long)]
        context: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Classify {
            input,
            context,
            config,
            patterns_only,
        } => commands::classify(&input, context.as_deref(), config.as_deref(), patterns_only).await,
        Commands::Stage { input, context } => commands::stage(&input, context.as_deref()),
        Commands::Rules { config } => commands::rules(config.as_deref()),
        Commands::Validate { context } => commands::validate(&context),
    }
}
