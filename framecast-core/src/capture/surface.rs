//! Render surfaces
//!
//! A render surface plays an attached media stream and tells the pipeline
//! when decodable content is available. The surface is owned by the UI; the
//! pipeline only borrows it for the lifetime of a session.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::{MediaStream, SourceError, SourceErrorKind};
use crate::sampler::RasterBuffer;

/// Playback target for a media stream
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Attach a stream, replacing any previous one
    fn attach(&self, stream: Arc<dyn MediaStream>);

    /// Drop the reference to the attached stream
    ///
    /// The stream itself is not stopped; that is the session's job.
    fn detach(&self);

    /// Wait for metadata and begin playback
    ///
    /// Resolves once the surface has decodable content and playback started.
    async fn play(&self) -> Result<(), SourceError>;

    /// Whether the surface currently has decodable content
    fn is_ready(&self) -> bool;

    /// Natural size of the content being played
    fn natural_size(&self) -> Option<(u32, u32)>;

    /// Copy the current frame into the raster buffer
    ///
    /// The raster takes on the frame's own size. Returns false if no complete
    /// frame was available.
    fn draw_into(&self, raster: &mut RasterBuffer) -> bool;
}

/// Mutable surface state
#[derive(Debug, Default)]
struct SurfaceState {
    /// Attached stream
    stream: Option<Arc<dyn MediaStream>>,
    /// Playback started for the attached stream
    playing: bool,
}

/// Render surface that plays any [`MediaStream`]
///
/// Metadata counts as loaded once the stream reports a resolution.
pub struct PlaybackSurface {
    state: Mutex<SurfaceState>,
    /// How often `play` polls the stream for metadata
    poll_interval: Duration,
    /// When false, `play` fails the way a blocked autoplay does
    autoplay_allowed: Mutex<bool>,
}

impl PlaybackSurface {
    /// Create a surface with the default metadata poll interval
    pub fn new() -> Self {
        Self::with_poll_interval(Duration::from_millis(20))
    }

    /// Create a surface with a custom metadata poll interval
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            state: Mutex::new(SurfaceState::default()),
            poll_interval,
            autoplay_allowed: Mutex::new(true),
        }
    }

    /// Allow or refuse playback
    pub fn set_autoplay_allowed(&self, allowed: bool) {
        *self.autoplay_allowed.lock() = allowed;
    }

    /// Whether a stream is attached
    pub fn has_stream(&self) -> bool {
        self.state.lock().stream.is_some()
    }

    fn attached(&self) -> Option<Arc<dyn MediaStream>> {
        self.state.lock().stream.clone()
    }
}

impl Default for PlaybackSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderSurface for PlaybackSurface {
    fn attach(&self, stream: Arc<dyn MediaStream>) {
        debug!("Surface attached to stream {}", stream.id());
        let mut state = self.state.lock();
        state.stream = Some(stream);
        state.playing = false;
    }

    fn detach(&self) {
        let mut state = self.state.lock();
        if let Some(stream) = state.stream.take() {
            debug!("Surface detached from stream {}", stream.id());
        }
        state.playing = false;
    }

    async fn play(&self) -> Result<(), SourceError> {
        let stream = self
            .attached()
            .ok_or_else(|| SourceError::new(SourceErrorKind::Other, "No stream attached"))?;

        // Wait for loaded metadata
        loop {
            if !stream.is_live() {
                return Err(SourceError::new(
                    SourceErrorKind::Aborted,
                    "Stream ended before playback started",
                ));
            }
            if stream.resolution().is_some() {
                break;
            }
            trace!("Waiting for metadata on stream {}", stream.id());
            tokio::time::sleep(self.poll_interval).await;
        }

        if !*self.autoplay_allowed.lock() {
            return Err(SourceError::named(
                "NotAllowedError",
                "play() request was denied by the autoplay policy",
            ));
        }

        let mut state = self.state.lock();
        match &state.stream {
            Some(current) if Arc::ptr_eq(current, &stream) => {
                state.playing = true;
                Ok(())
            }
            _ => Err(SourceError::new(
                SourceErrorKind::Aborted,
                "Stream was replaced before playback started",
            )),
        }
    }

    fn is_ready(&self) -> bool {
        let state = self.state.lock();
        state.playing
            && state
                .stream
                .as_ref()
                .is_some_and(|s| s.is_live() && s.resolution().is_some())
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        self.attached().and_then(|s| s.resolution())
    }

    fn draw_into(&self, raster: &mut RasterBuffer) -> bool {
        let Some(stream) = self.attached() else {
            return false;
        };
        stream.current_frame().is_some_and(|frame| raster.draw(&frame))
    }
}
