//! Peer-side frame receiver
//!
//! Listens for transport connections, decodes frame events and keeps only the
//! most recent frame. Older frames are overwritten, never queued.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::protocol::WireMessage;
use super::FramePayload;
use crate::encode::DataUri;
use crate::error::{FramecastError, Result};

/// A frame received from a peer
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    /// Sequence number across all connections, starting at 1
    pub sequence: u64,
    /// MIME type from the data URI
    pub mime_type: String,
    /// Decoded image bytes
    pub data: Vec<u8>,
    /// Arrival time
    pub received_at: SystemTime,
}

/// State shared with connection handlers
struct ReceiverShared {
    event_name: String,
    save_dir: Option<PathBuf>,
    latest: watch::Sender<Option<Arc<ReceivedFrame>>>,
    frames_received: AtomicU64,
}

/// TCP server that accepts frame events
pub struct FrameReceiver {
    listener: TcpListener,
    shared: Arc<ReceiverShared>,
}

impl FrameReceiver {
    /// Bind to the given address, accepting frames under `event_name`
    pub async fn bind(addr: &str, event_name: impl Into<String>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FramecastError::transport(format!("Failed to bind {}: {}", addr, e)))?;

        let (latest, _) = watch::channel(None);

        info!("Frame receiver listening on {}", addr);

        Ok(Self {
            listener,
            shared: Arc::new(ReceiverShared {
                event_name: event_name.into(),
                save_dir: None,
                latest,
                frames_received: AtomicU64::new(0),
            }),
        })
    }

    /// Write each received frame to `<dir>/latest.<ext>`
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.save_dir = Some(dir.into());
        }
        self
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Watch the most recent frame
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ReceivedFrame>>> {
        self.shared.latest.subscribe()
    }

    /// Number of frames received so far
    pub fn frames_received(&self) -> u64 {
        self.shared.frames_received.load(Ordering::Relaxed)
    }

    /// Accept connections until the task is cancelled
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Peer connected from {}", addr);
                    let shared = self.shared.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, shared).await;
                        info!("Peer {} disconnected", addr);
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Read events from one connection until it closes
async fn handle_connection(stream: TcpStream, shared: Arc<ReceiverShared>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => return,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Err(e) = handle_message(trimmed.as_bytes(), &shared).await {
                    warn!("Rejected message: {}", e);
                }
            }
            Err(e) => {
                error!("Error reading from peer: {}", e);
                return;
            }
        }
    }
}

/// Decode one wire message and publish it if it carries a frame
async fn handle_message(bytes: &[u8], shared: &ReceiverShared) -> Result<()> {
    let msg = WireMessage::from_bytes(bytes)?;
    if msg.event != shared.event_name {
        debug!("Ignoring event {}", msg.event);
        return Ok(());
    }

    let payload: FramePayload = serde_json::from_value(msg.data)?;
    let uri = DataUri::parse(&payload.frame)?;
    let sequence = shared.frames_received.fetch_add(1, Ordering::Relaxed) + 1;

    debug!(
        "Frame #{} received: {} ({} bytes)",
        sequence,
        uri.mime_type,
        uri.data.len()
    );

    let frame = Arc::new(ReceivedFrame {
        sequence,
        mime_type: uri.mime_type,
        data: uri.data,
        received_at: SystemTime::now(),
    });

    if let Some(dir) = &shared.save_dir {
        if let Err(e) = save_latest(dir, &frame).await {
            warn!("Failed to save frame: {}", e);
        }
    }

    shared.latest.send_replace(Some(frame));
    Ok(())
}

async fn save_latest(dir: &Path, frame: &ReceivedFrame) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let ext = match frame.mime_type.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    };
    tokio::fs::write(dir.join(format!("latest.{}", ext)), &frame.data).await?;
    Ok(())
}
