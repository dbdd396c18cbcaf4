//! Framecast Core Library
//!
//! Periodic camera and screen snapshots streamed to a peer as JPEG data URIs.
//!
//! This library provides:
//! - A capture pipeline driven by a single event loop, with generation
//!   tokens guarding every asynchronous completion
//! - A readiness-gated render surface and a resizing raster sampler
//! - JPEG encoding to `data:image/jpeg;base64,...` URIs
//! - A newline-delimited JSON transport with a latest-frame receiver
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ MediaSource  │───▶│ RenderSurface  │───▶│ Sampler     │───▶│ Transmitter │
//! │ (acquire)    │    │ (play / ready) │    │ (JPEG)      │    │ (emit)      │
//! └──────────────┘    └────────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod sampler;
pub mod transport;
pub mod types;

pub use capture::{MediaSource, MediaStream, PlaybackSurface, RenderSurface, SyntheticSource};
pub use config::{CaptureConfig, ConfigFile};
pub use error::{FramecastError, Result};
pub use pipeline::{CapturePipeline, PipelineEvent, PipelineHandle, PipelineStats};
pub use transport::{FrameReceiver, SocketChannel, TransportChannel};
pub use types::{CaptureStatus, Generation, PipelineStatus, SourceKind};
