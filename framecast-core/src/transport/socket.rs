//! TCP transport channel
//!
//! Connects to a peer and exchanges newline-delimited JSON events. Emitting
//! never blocks: messages go onto a small outbound queue drained by a writer
//! task, and are dropped when the queue is full or the peer is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::protocol::WireMessage;
use super::TransportChannel;
use crate::error::{FramecastError, Result};

/// Default connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outbound messages allowed in flight before new ones are dropped
const OUTBOUND_CAPACITY: usize = 2;

/// Transport channel over a TCP connection
pub struct SocketChannel {
    /// Peer address
    peer: String,
    /// Cleared as soon as either half of the connection fails
    connected: Arc<AtomicBool>,
    /// Outbound queue to the writer task
    outbound: mpsc::Sender<WireMessage>,
    /// Writer task handle
    writer_task: JoinHandle<()>,
    /// Reader task handle
    reader_task: JoinHandle<()>,
}

impl SocketChannel {
    /// Connect to the peer with default timeout
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, CONNECT_TIMEOUT).await
    }

    /// Connect to the peer with custom timeout
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| FramecastError::transport(format!("Connection to {} timed out", addr)))?
            .map_err(|e| FramecastError::transport(format!("Failed to connect to {}: {}", addr, e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        info!("Connected to peer at {}", addr);

        let (reader, mut writer) = stream.into_split();
        let connected = Arc::new(AtomicBool::new(true));
        let (outbound, mut outbound_rx) = mpsc::channel::<WireMessage>(OUTBOUND_CAPACITY);

        let writer_connected = connected.clone();
        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = writer.write_all(&msg.to_bytes()).await {
                    warn!("Failed to send {}: {}", msg.event, e);
                    writer_connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
            debug!("Writer task finished");
        });

        let reader_connected = connected.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        info!("Peer closed the connection");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match WireMessage::from_bytes(trimmed.as_bytes()) {
                            Ok(msg) => trace!("Inbound event {}", msg.event),
                            Err(e) => debug!("Ignoring malformed inbound message: {}", e),
                        }
                    }
                    Err(e) => {
                        warn!("Error reading from peer: {}", e);
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
        });

        Ok(Self {
            peer: addr.to_string(),
            connected,
            outbound,
            writer_task,
            reader_task,
        })
    }

    /// Peer address
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Close the connection
    pub fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Closing connection to {}", self.peer);
        }
        self.writer_task.abort();
        self.reader_task.abort();
    }
}

impl TransportChannel for SocketChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn emit(&self, event: &str, payload: serde_json::Value) {
        if !self.is_connected() {
            return;
        }
        match self.outbound.try_send(WireMessage::new(event, payload)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(msg)) => {
                debug!("Outbound queue full, dropping {}", msg.event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.connected.store(false, Ordering::SeqCst);
            }
        }
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.writer_task.abort();
        self.reader_task.abort();
    }
}
