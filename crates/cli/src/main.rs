mod config;
mod normalize_cmd;
mod output;
mod replay;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "turnweave",
    about = "turnweave - rebuild one consistent conversation view from history, live and local turns"
)]
struct Cli {
    /// Config file (default: ~/.config/turnweave/turnweave.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session and print the reconciled turns, timeline and state
    Replay {
        /// Confirmed history, one origin record per line
        history: PathBuf,

        /// Records delivered by the live stream but not yet persisted
        #[arg(long)]
        live: Option<PathBuf>,

        /// Local turn(s) not yet confirmed: a JSON object or array of
        /// `{"id"?, "role"?, "content"}`. Repeatable.
        #[arg(long)]
        optimistic: Vec<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Normalize origin records into canonical events (JSONL on stdout)
    Normalize {
        /// JSONL file of origin records
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            history,
            live,
            optimistic,
            format,
        } => replay::run_replay(
            cli.config.as_deref(),
            &history,
            live.as_deref(),
            &optimistic,
            format,
        ),
        Commands::Normalize { file } => normalize_cmd::run_normalize(&file),
        Commands::Config => config::show_config(cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
