//! Framecast CLI
//!
//! Stream periodic camera or screen snapshots to a peer.
//!
//! # Usage
//!
//! ```bash
//! # Run a receiver that keeps the latest frame on disk
//! framecast receive --save-dir /tmp/frames
//!
//! # Cast the camera to it, one frame per second
//! framecast cast --source camera --peer 127.0.0.1:7878
//!
//! # Write a default config file
//! framecast config init
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Framecast - periodic camera/screen snapshots over a socket
#[derive(Parser)]
#[command(name = "framecast")]
#[command(version)]
#[command(about = "Stream camera or screen snapshots to a peer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a source and send frames to a peer
    Cast(commands::CastArgs),

    /// Accept frames from casting peers
    #[command(alias = "recv")]
    Receive(commands::ReceiveArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("framecast={}", level).parse()?)
                .add_directive(format!("framecast_core={}", level).parse()?),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Cast(args) => commands::cast(args).await?,
        Commands::Receive(args) => commands::receive(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
