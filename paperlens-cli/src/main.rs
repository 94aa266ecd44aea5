//! Paperlens CLI — terminal front end for the Paperlens research dashboard.
//!
//! Each subcommand drives one dashboard component against the analytics API
//! and prints its snapshot as a table or as JSON.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Paperlens: research trend and profile analytics from the command line
#[derive(Parser, Debug)]
#[command(name = "paperlens", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for `.paperlens/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Backend base URL, overriding configuration
    #[arg(long)]
    base_url: Option<String>,

    /// Print snapshots as pretty JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Topic frequency per year, pivoted into a chart matrix
    Trends,
    /// List authors
    Authors,
    /// List papers
    Papers,
    /// Search papers by free text
    Search {
        /// Query words
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Landscape summary, topic clusters and recommended papers
    Insights,
    /// Show, save or analyze the researcher profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ProfileAction {
    /// Show the stored profile and its last analysis
    Show,
    /// Save profile fields
    Save {
        #[command(flatten)]
        fields: ProfileFields,
    },
    /// Save profile fields, then request an analysis
    Analyze {
        #[command(flatten)]
        fields: ProfileFields,
    },
}

/// Profile fields; omitted fields keep their stored value.
#[derive(clap::Args, Debug, Default)]
struct ProfileFields {
    /// Researcher name
    #[arg(long)]
    name: Option<String>,
    /// Job title
    #[arg(long)]
    title: Option<String>,
    /// Research proposal text
    #[arg(long)]
    proposal: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "paperlens", "paperlens")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "paperlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = paperlens_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    commands::handle_command(cli.command, &config, cli.json).await
}
