//! # tickerbook CLI
//!
//! Command-line interface for the tickerbook investment knowledge base.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tickerbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "tickerbook.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate governance.md from downloaded dividend and sanctions data
    FillGovernance {
        /// Tickers to process (defaults to every company)
        tickers: Vec<String>,
    },

    /// Regenerate events.md from downloaded corporate events
    FillEvents {
        /// Tickers to process (defaults to every company)
        tickers: Vec<String>,
    },

    /// Build the static dashboard
    Dashboard,

    /// Render a markdown file to an HTML fragment on stdout
    Render {
        /// Markdown file (reads stdin when omitted)
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `render` output stays clean
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::FillGovernance { tickers } => commands::fill_governance(&cli.config, &tickers),
        Commands::FillEvents { tickers } => commands::fill_events(&cli.config, &tickers),
        Commands::Dashboard => commands::build_dashboard(&cli.config),
        Commands::Render { file } => commands::render_markdown(file.as_deref()),
    }
}
