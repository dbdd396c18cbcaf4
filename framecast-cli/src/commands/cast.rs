//! Cast command - capture a source and send frames to a peer

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use framecast_core::{
    capture::{PlaybackSurface, SyntheticSource},
    config::ConfigFile,
    pipeline::{CapturePipeline, PipelineHandle},
    transport::{SocketChannel, TransportChannel},
    types::SourceKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

/// Arguments for the cast command
#[derive(Args)]
pub struct CastArgs {
    /// Source to capture (camera, screen)
    #[arg(short, long)]
    source: Option<SourceKind>,

    /// Peer address (host:port)
    #[arg(short, long)]
    peer: Option<String>,

    /// Sampling interval in milliseconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// JPEG quality in (0, 1]
    #[arg(short, long)]
    quality: Option<f32>,

    /// Event name frames are sent under
    #[arg(long)]
    event: Option<String>,

    /// Start hidden; type `show` to begin capturing
    #[arg(long)]
    hidden: bool,

    /// Simulated permission prompt delay in milliseconds
    #[arg(long, default_value = "0")]
    prompt_delay: u64,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

/// Commands accepted on stdin while casting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlCommand {
    Select(SourceKind),
    Show,
    Hide,
    Stop,
    Status,
    Quit,
}

impl ControlCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "show" | "start" => Some(Self::Show),
            "hide" => Some(Self::Hide),
            "stop" => Some(Self::Stop),
            "status" | "s" => Some(Self::Status),
            "quit" | "exit" | "q" => Some(Self::Quit),
            other => other.parse().ok().map(Self::Select),
        }
    }

    /// Forward to the pipeline; returns false for `Quit`
    fn apply(self, handle: &PipelineHandle) -> Result<bool> {
        match self {
            Self::Select(kind) => handle.select_source(kind)?,
            Self::Show => handle.set_visible(true)?,
            Self::Hide => handle.set_visible(false)?,
            Self::Stop => handle.stop()?,
            Self::Status => {}
            Self::Quit => return Ok(false),
        }
        Ok(true)
    }
}

/// Start a capture session
pub async fn cast(args: CastArgs) -> Result<()> {
    println!("Framecast - Starting Capture\n");

    let file = ConfigFile::load().context("Failed to load configuration")?;

    let mut config = file
        .capture_config()
        .context("Invalid capture settings in config file")?;
    if let Some(source) = args.source {
        config.source_kind = source;
    }
    if let Some(interval) = args.interval {
        config.sample_interval_ms = interval;
    }
    if let Some(quality) = args.quality {
        config.jpeg_quality = quality;
    }
    if let Some(event) = args.event {
        config.event_name = event;
    }

    let peer = args.peer.unwrap_or_else(|| file.transport.peer.clone());

    println!("Configuration:");
    println!("  Source:   {}", config.source_kind);
    println!("  Interval: {} ms", config.sample_interval_ms);
    println!("  Quality:  {}", config.jpeg_quality_percent());
    println!("  Event:    {}", config.event_name);
    println!("  Peer:     {}", peer);
    println!();

    // A missing peer is not fatal: frames are dropped until one exists
    let timeout = Duration::from_millis(file.transport.connect_timeout_ms);
    let channel = match SocketChannel::connect_with_timeout(&peer, timeout).await {
        Ok(channel) => Some(Arc::new(channel)),
        Err(e) => {
            warn!("{}", e);
            println!("Could not reach {}; frames will be dropped.\n", peer);
            None
        }
    };

    let source = Arc::new(
        SyntheticSource::new().with_prompt_delay(Duration::from_millis(args.prompt_delay)),
    );
    let surface = Arc::new(PlaybackSurface::new());

    let mut pipeline =
        CapturePipeline::new(config, source, surface).context("Failed to create pipeline")?;
    if let Some(channel) = &channel {
        pipeline = pipeline.with_channel(channel.clone() as Arc<dyn TransportChannel>);
    }

    let handle = pipeline.handle();
    let mut status_rx = pipeline.subscribe();
    let status_view = pipeline.subscribe();
    let pipeline_task = tokio::spawn(pipeline.run());

    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            println!("Status: {}", status);
        }
    });

    if !args.hidden {
        handle.set_visible(true)?;
    }

    println!("Commands: camera | screen | show | hide | stop | status | quit");
    println!("Press Ctrl+C to stop...\n");

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                println!("\nReceived interrupt signal...");
                break;
            }
            _ = &mut deadline => {
                info!("Duration elapsed");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match ControlCommand::parse(&line) {
                        Some(ControlCommand::Status) => {
                            let status = status_view.borrow().clone();
                            println!("Status: {}, {}", status, peer_status(&channel));
                        }
                        Some(command) => {
                            if !command.apply(&handle)? {
                                break;
                            }
                        }
                        None => println!("Unknown command: {}", line.trim()),
                    },
                    None => stdin_open = false,
                }
            }
        }
    }

    println!("Stopping capture...");
    handle.shutdown()?;
    pipeline_task.await.context("Pipeline task failed")?;
    status_task.abort();

    if let Some(channel) = channel {
        channel.close();
    }

    println!("Capture stopped.");
    Ok(())
}

fn peer_status(channel: &Option<Arc<SocketChannel>>) -> String {
    match channel {
        Some(channel) if channel.is_connected() => format!("connected to {}", channel.peer()),
        Some(channel) => format!("disconnected from {}", channel.peer()),
        None => "no peer".to_string(),
    }
}
