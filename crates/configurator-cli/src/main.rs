//! # configurator-cli
//!
//! Command-line interface for exploring configuration sessions.

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use configurator_core::Config;

mod commands;

/// Configurator - explore product configurations against a remote engine
#[derive(Parser)]
#[command(name = "configurator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure a product interactively
    Explore(ExploreArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
    /// Diagnose configuration issues
    Doctor,
}

#[derive(Args)]
struct ExploreArgs {
    /// Deployment to load the configuration model from
    #[arg(short, long)]
    deployment: String,

    /// Release channel of the deployment
    #[arg(short, long, default_value = "release")]
    channel: String,

    /// Usage rule parameter (repeatable)
    #[arg(
        short,
        long = "param",
        value_name = "NAME=VALUE",
        value_parser = commands::input::parse_param
    )]
    params: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show where configuration files are read from
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Explore(args) => {
            let config = Config::load_validated()?;
            commands::explore::run(args, &config).await?;
        }
        Commands::Config { action } => {
            commands::config::handle(action)?;
        }
        Commands::Version => {
            println!("configurator {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Doctor => {
            commands::doctor::run()?;
        }
    }

    Ok(())
}
