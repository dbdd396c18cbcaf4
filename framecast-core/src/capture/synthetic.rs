//! Synthetic media backend
//!
//! Produces an animated test pattern instead of real device output, so the
//! pipeline can run headless and in tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{MediaSource, MediaStream, SourceError, SourceErrorKind};
use crate::types::{SourceKind, VideoFrame};

static STREAM_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Default resolution for a synthetic source of the given kind
pub fn default_resolution(kind: SourceKind) -> (u32, u32) {
    match kind {
        SourceKind::Camera => (640, 480),
        SourceKind::Screen => (1280, 720),
    }
}

/// Media source that hands out [`SyntheticStream`]s
pub struct SyntheticSource {
    /// Simulated time the permission prompt / picker takes
    prompt_delay: Duration,
    /// Failure to report on the next acquisitions
    failure: Mutex<Option<SourceErrorKind>>,
    /// Resolution override (applies to both kinds)
    resolution: Mutex<Option<(u32, u32)>>,
}

impl SyntheticSource {
    /// Create a source that grants streams immediately
    pub fn new() -> Self {
        Self {
            prompt_delay: Duration::ZERO,
            failure: Mutex::new(None),
            resolution: Mutex::new(None),
        }
    }

    /// Simulate a prompt that takes `delay` to answer
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    /// Use a fixed resolution for every stream
    pub fn with_resolution(self, width: u32, height: u32) -> Self {
        *self.resolution.lock() = Some((width, height));
        self
    }

    /// Make subsequent acquisitions fail (None = succeed again)
    pub fn set_failure(&self, failure: Option<SourceErrorKind>) {
        *self.failure.lock() = failure;
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    async fn acquire(&self, kind: SourceKind) -> Result<Arc<dyn MediaStream>, SourceError> {
        debug!("Synthetic {} acquisition requested", kind);
        if !self.prompt_delay.is_zero() {
            tokio::time::sleep(self.prompt_delay).await;
        }

        let failure = *self.failure.lock();
        if let Some(kind_of_failure) = failure {
            let message = match kind_of_failure {
                SourceErrorKind::PermissionDenied => "Permission denied",
                SourceErrorKind::NotFound => "Requested device not found",
                SourceErrorKind::Aborted => "Selection dismissed",
                SourceErrorKind::Other => "Could not start video source",
            };
            return Err(SourceError::new(kind_of_failure, message));
        }

        let override_size = *self.resolution.lock();
        let (width, height) = override_size.unwrap_or_else(|| default_resolution(kind));
        let stream = SyntheticStream::new(kind, width, height);
        info!("Synthetic {} stream {} granted at {}x{}", kind, stream.id(), width, height);
        Ok(Arc::new(stream))
    }
}

/// Stream producing a moving diagonal gradient
#[derive(Debug)]
pub struct SyntheticStream {
    id: String,
    kind: SourceKind,
    size: Mutex<(u32, u32)>,
    started: Instant,
    stopped: AtomicBool,
}

impl SyntheticStream {
    /// Create a live stream at the given resolution
    pub fn new(kind: SourceKind, width: u32, height: u32) -> Self {
        let n = STREAM_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self {
            id: format!("{}-{}", kind, n),
            kind,
            size: Mutex::new((width, height)),
            started: Instant::now(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Change the resolution, like a resized shared window
    pub fn set_resolution(&self, width: u32, height: u32) {
        *self.size.lock() = (width, height);
    }
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        Some(*self.size.lock())
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        let (width, height) = self.resolution()?;
        let shift = (self.started.elapsed().as_millis() / 16) as u32;

        let mut data = Vec::with_capacity(VideoFrame::byte_len(width, height));
        let span = width as f32 + height as f32;
        for y in 0..height {
            for x in 0..width {
                let r = ((x.wrapping_add(shift) % width) as f32 / width as f32 * 255.0) as u8;
                let g = ((y as f32 / height as f32) * 255.0) as u8;
                let b = ((x as f32 + y as f32) / span * 255.0) as u8;
                data.extend_from_slice(&[r, g, b, 255]);
            }
        }

        Some(VideoFrame {
            width,
            height,
            data,
        })
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Synthetic stream {} stopped", self.id);
        }
    }

    fn is_live(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_default_resolution() {
        let source = SyntheticSource::new();
        let stream = source.acquire(SourceKind::Screen).await.unwrap();
        assert_eq!(stream.resolution(), Some((1280, 720)));
        assert_eq!(stream.kind(), SourceKind::Screen);
        assert!(stream.is_live());
    }

    #[tokio::test]
    async fn test_acquire_failure() {
        let source = SyntheticSource::new();
        source.set_failure(Some(SourceErrorKind::NotFound));
        let err = source.acquire(SourceKind::Camera).await.unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::NotFound);
    }

    #[test]
    fn test_frame_size_follows_resolution() {
        let stream = SyntheticStream::new(SourceKind::Screen, 4, 2);
        let frame = stream.current_frame().unwrap();
        assert_eq!(frame.size(), (4, 2));
        assert_eq!(frame.data.len(), 4 * 2 * 4);

        stream.set_resolution(3, 3);
        assert_eq!(stream.current_frame().unwrap().size(), (3, 3));

        stream.stop();
        assert!(stream.current_frame().is_none());
        assert!(!stream.is_live());
    }
}
