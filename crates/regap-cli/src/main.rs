//! regap CLI - render and inspect custom-element markup.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "regap")]
#[command(about = "Render and inspect custom-element markup hosted by regap")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a manifest file, or a directory of manifests
    #[arg(short, long, default_value = "regap.toml")]
    manifest: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade registered elements and print the rendered document
    Render {
        /// Markup file to render
        input: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print each element's typed attributes and slot distribution as JSON
    Inspect {
        /// Markup file to inspect
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so rendered output can be piped
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render { input, output } => {
            commands::render::run(&cli.manifest, &input, output.as_deref())?;
        }
        Commands::Inspect { input } => {
            commands::inspect::run(&cli.manifest, &input)?;
        }
    }

    Ok(())
}
