//! Mock infrastructure for testing
//!
//! Media sources whose acquisitions stay pending until the test resolves
//! them, a surface with controllable readiness, and a recording channel.

#![allow(dead_code)]

use async_trait::async_trait;
use framecast_core::capture::{
    MediaSource, MediaStream, RenderSurface, SourceError, SourceErrorKind,
};
use framecast_core::config::CaptureConfig;
use framecast_core::encode::{Frame, FrameEncoder, JpegEncoder};
use framecast_core::error::{FramecastError, Result};
use framecast_core::pipeline::CapturePipeline;
use framecast_core::sampler::RasterBuffer;
use framecast_core::transport::TransportChannel;
use framecast_core::types::{SourceKind, VideoFrame};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};

type Acquisition = oneshot::Sender<std::result::Result<Arc<dyn MediaStream>, SourceError>>;

/// Media source whose acquisitions resolve only when the test says so
#[derive(Default)]
pub struct MockSource {
    pending: Mutex<VecDeque<Acquisition>>,
    requests: Mutex<Vec<SourceKind>>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Kinds requested so far, in order
    pub fn requests(&self) -> Vec<SourceKind> {
        self.requests.lock().clone()
    }

    /// Acquisitions still waiting for an answer
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Hand a stream to the oldest pending acquisition
    pub fn grant(&self, stream: Arc<MockStream>) -> bool {
        self.resolve(Ok(stream as Arc<dyn MediaStream>))
    }

    /// Fail the oldest pending acquisition
    pub fn deny(&self, kind: SourceErrorKind, message: &str) -> bool {
        self.resolve(Err(SourceError::new(kind, message)))
    }

    fn resolve(&self, result: std::result::Result<Arc<dyn MediaStream>, SourceError>) -> bool {
        match self.pending.lock().pop_front() {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MediaSource for MockSource {
    async fn acquire(
        &self,
        kind: SourceKind,
    ) -> std::result::Result<Arc<dyn MediaStream>, SourceError> {
        let (tx, rx) = oneshot::channel();
        self.requests.lock().push(kind);
        self.pending.lock().push_back(tx);

        rx.await
            .unwrap_or_else(|_| Err(SourceError::new(SourceErrorKind::Aborted, "mock dropped")))
    }
}

/// Stream producing solid frames and counting stop calls
#[derive(Debug)]
pub struct MockStream {
    id: String,
    kind: SourceKind,
    resolution: Mutex<Option<(u32, u32)>>,
    color: [u8; 4],
    frame: Mutex<Option<VideoFrame>>,
    stops: AtomicUsize,
    live: AtomicBool,
}

impl MockStream {
    pub fn new(kind: SourceKind, width: u32, height: u32) -> Arc<Self> {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
        Arc::new(Self {
            id: format!("mock-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            resolution: Mutex::new(Some((width, height))),
            color: [200, 40, 40, 255],
            frame: Mutex::new(None),
            stops: AtomicUsize::new(0),
            live: AtomicBool::new(true),
        })
    }

    pub fn camera() -> Arc<Self> {
        Self::new(SourceKind::Camera, 64, 48)
    }

    pub fn screen() -> Arc<Self> {
        Self::new(SourceKind::Screen, 128, 72)
    }

    pub fn set_resolution(&self, width: u32, height: u32) {
        *self.resolution.lock() = Some((width, height));
    }

    /// Serve this frame regardless of the reported resolution
    pub fn set_frame(&self, frame: Option<VideoFrame>) {
        *self.frame.lock() = frame;
    }

    /// The frame a sample of this stream is expected to encode
    pub fn expected_frame(&self) -> Option<VideoFrame> {
        let (width, height) = self.resolution()?;
        Some(VideoFrame::solid(width, height, self.color))
    }

    /// Number of times `stop` was called
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        *self.resolution.lock()
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        if let Some(frame) = self.frame.lock().clone() {
            return Some(frame);
        }
        self.expected_frame()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Surface whose playback start can be held back or failed
pub struct MockSurface {
    stream: Mutex<Option<Arc<dyn MediaStream>>>,
    ready: AtomicBool,
    auto_ready: AtomicBool,
    release: Notify,
    play_error: Mutex<Option<SourceError>>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
}

impl MockSurface {
    /// Surface that becomes ready as soon as `play` is called
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stream: Mutex::new(None),
            ready: AtomicBool::new(false),
            auto_ready: AtomicBool::new(true),
            release: Notify::new(),
            play_error: Mutex::new(None),
            attaches: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
        })
    }

    /// Surface whose `play` waits for [`MockSurface::release_play`]
    pub fn held() -> Arc<Self> {
        let surface = Self::new();
        surface.auto_ready.store(false, Ordering::SeqCst);
        surface
    }

    pub fn release_play(&self) {
        self.release.notify_one();
    }

    /// Make the next `play` fail
    pub fn fail_next_play(&self, error: SourceError) {
        *self.play_error.lock() = Some(error);
    }

    pub fn has_stream(&self) -> bool {
        self.stream.lock().is_some()
    }

    pub fn attached_id(&self) -> Option<String> {
        self.stream.lock().as_ref().map(|s| s.id().to_string())
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSurface for MockSurface {
    fn attach(&self, stream: Arc<dyn MediaStream>) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        *self.stream.lock() = Some(stream);
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        *self.stream.lock() = None;
    }

    async fn play(&self) -> std::result::Result<(), SourceError> {
        if let Some(error) = self.play_error.lock().take() {
            return Err(error);
        }
        if !self.auto_ready.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if !self.has_stream() {
            return Err(SourceError::new(SourceErrorKind::Aborted, "detached"));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && self.has_stream()
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        self.stream.lock().as_ref().and_then(|s| s.resolution())
    }

    fn draw_into(&self, raster: &mut RasterBuffer) -> bool {
        let frame = self.stream.lock().as_ref().and_then(|s| s.current_frame());
        frame.is_some_and(|frame| raster.draw(&frame))
    }
}

/// Channel recording every emitted event
#[derive(Default)]
pub struct MockChannel {
    connected: AtomicBool,
    emitted: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockChannel {
    pub fn new(connected: bool) -> Arc<Self> {
        let channel = Self::default();
        channel.connected.store(connected, Ordering::SeqCst);
        Arc::new(channel)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn emitted(&self) -> Vec<(String, serde_json::Value)> {
        self.emitted.lock().clone()
    }

    /// The `frame` field of every emitted payload
    pub fn frames(&self) -> Vec<String> {
        self.emitted
            .lock()
            .iter()
            .filter_map(|(_, payload)| payload["frame"].as_str().map(str::to_string))
            .collect()
    }
}

impl TransportChannel for MockChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn emit(&self, event: &str, payload: serde_json::Value) {
        self.emitted.lock().push((event.to_string(), payload));
    }
}

/// JPEG encoder that can be told to fail
pub struct ToggleEncoder {
    inner: JpegEncoder,
    failing: Arc<AtomicBool>,
}

impl ToggleEncoder {
    /// Returns the encoder and the switch controlling it
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let failing = Arc::new(AtomicBool::new(false));
        let encoder = Self {
            inner: JpegEncoder::new(0.7),
            failing: failing.clone(),
        };
        (encoder, failing)
    }
}

impl FrameEncoder for ToggleEncoder {
    fn encode(&mut self, raster: &RasterBuffer) -> Result<Frame> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FramecastError::encoding("mock encoder failure"));
        }
        self.inner.encode(raster)
    }
}

/// Build a pipeline over the given mocks
pub fn pipeline(
    source: &Arc<MockSource>,
    surface: &Arc<MockSurface>,
    channel: Option<&Arc<MockChannel>>,
) -> CapturePipeline {
    let mut pipeline = CapturePipeline::new(
        CaptureConfig::default(),
        source.clone(),
        surface.clone(),
    )
    .unwrap();
    if let Some(channel) = channel {
        pipeline.set_channel(Some(channel.clone()));
    }
    pipeline
}

/// Let spawned tasks run and handle whatever they report
pub async fn settle(pipeline: &mut CapturePipeline) {
    for _ in 0..8 {
        tokio::task::yield_now().await;
        pipeline.drain();
    }
}
