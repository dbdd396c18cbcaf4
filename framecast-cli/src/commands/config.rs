//! Config command - manage the configuration file

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use framecast_core::config::{sample_config, ConfigFile};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    let path = ConfigFile::default_path();

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            if !path.exists() {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            let file = ConfigFile::load_from(path.clone())?;
            if path.exists() {
                println!("Configuration file: {}\n", path.display());
            } else {
                println!("No configuration file at {}; showing defaults.\n", path.display());
            }

            let capture = file
                .capture_config()
                .context("Invalid [capture] settings")?;

            println!("[capture]");
            println!("  source:      {}", capture.source_kind);
            println!("  interval_ms: {}", capture.sample_interval_ms);
            println!(
                "  quality:     {} ({}%)",
                capture.jpeg_quality,
                capture.jpeg_quality_percent()
            );
            println!("[transport]");
            println!("  peer:        {}", file.transport.peer);
            println!("  event:       {}", file.transport.event);
            println!("  timeout_ms:  {}", file.transport.connect_timeout_ms);
            println!("[receiver]");
            println!("  listen:      {}", file.receiver.listen);
            match &file.receiver.save_dir {
                Some(dir) => println!("  save_dir:    {}", dir.display()),
                None => println!("  save_dir:    (none)"),
            }

            let warnings = capture.validate();
            if !warnings.is_empty() {
                println!();
                for warning in warnings {
                    println!("warning: {}", warning);
                }
            }
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
