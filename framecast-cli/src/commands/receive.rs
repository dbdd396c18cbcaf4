//! Receive command - accept frames from casting peers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use framecast_core::{config::ConfigFile, transport::FrameReceiver};
use tokio::signal;

/// Arguments for the receive command
#[derive(Args)]
pub struct ReceiveArgs {
    /// Address to listen on (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Event name to accept
    #[arg(long)]
    event: Option<String>,

    /// Directory to keep the latest frame in
    #[arg(short, long)]
    save_dir: Option<PathBuf>,
}

/// Run a frame receiver until interrupted
pub async fn receive(args: ReceiveArgs) -> Result<()> {
    let file = ConfigFile::load().context("Failed to load configuration")?;

    let listen = args.listen.unwrap_or(file.receiver.listen);
    let event = args.event.unwrap_or(file.transport.event);
    let save_dir = args.save_dir.or(file.receiver.save_dir);

    let mut receiver = FrameReceiver::bind(&listen, event.clone())
        .await
        .context("Failed to start receiver")?;
    if let Some(dir) = &save_dir {
        receiver = receiver.with_save_dir(dir.clone());
    }

    let local = receiver.local_addr()?;
    println!("Framecast - Receiving\n");
    println!("  Listening: {}", local);
    println!("  Event:     {}", event);
    if let Some(dir) = &save_dir {
        println!("  Saving to: {}", dir.display());
    }
    println!();
    println!("Press Ctrl+C to stop...\n");

    let mut frames = receiver.subscribe();
    let server = tokio::spawn(receiver.run());
    let mut count = 0u64;

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                println!("\nReceived interrupt signal...");
                break;
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = frames.borrow_and_update().clone();
                if let Some(frame) = latest {
                    count += 1;
                    println!(
                        "Frame #{}: {} ({:.1} KB)",
                        frame.sequence,
                        frame.mime_type,
                        frame.data.len() as f64 / 1024.0
                    );
                }
            }
        }
    }

    server.abort();
    println!("Received {} frames.", count);
    Ok(())
}
