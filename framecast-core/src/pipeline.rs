//! Capture-sample-transmit pipeline
//!
//! A single event loop owns every piece of session state. Asynchronous work
//! (stream acquisition, surface playback, the sampling ticker) runs in spawned
//! tasks that report back as [`PipelineEvent`]s tagged with the
//! [`Generation`] that started them. Events from a session that has since
//! been torn down are discarded, and a stream that arrives late is stopped on
//! the spot.
//!
//! Whenever a session ends, for whatever reason, the same teardown runs:
//! sampler cancelled, stream tracks stopped, surface detached. Teardown is
//! idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use crate::capture::{MediaSource, MediaStream, RenderSurface, SourceError};
use crate::config::CaptureConfig;
use crate::encode::{FrameEncoder, JpegEncoder};
use crate::error::{FramecastError, Result};
use crate::sampler::Sampler;
use crate::transport::{TransmitOutcome, TransportChannel, Transmitter};
use crate::types::{CaptureStatus, Generation, PipelineStatus, SourceKind};

/// Inputs to the pipeline state machine
#[derive(Debug)]
pub enum PipelineEvent {
    /// The UI asked for capture to run (true) or stop (false)
    VisibilityChanged(bool),
    /// The user picked a different source
    SourceChanged(SourceKind),
    /// Explicit stop from the UI
    StopRequested,
    /// The environment handed over a stream
    AcquisitionResolved {
        generation: Generation,
        stream: Arc<dyn MediaStream>,
    },
    /// The environment refused or failed to provide a stream
    AcquisitionFailed {
        generation: Generation,
        error: SourceError,
    },
    /// The surface has started playback and reports dimensions
    SurfaceReady { generation: Generation },
    /// The surface could not start playback
    PlaybackFailed {
        generation: Generation,
        error: SourceError,
    },
    /// The sampling ticker fired
    TickFired { generation: Generation },
    /// Tear everything down and leave the event loop
    Shutdown,
}

/// Periodic ticker feeding `TickFired` events
///
/// At most one tick per session sits in the event queue: a tick that fires
/// while the previous one is still unhandled is folded into it. Aborted when
/// dropped, so a session can never outlive its ticker.
#[derive(Debug)]
pub struct SamplingHandle {
    task: JoinHandle<()>,
    pending: Arc<AtomicBool>,
}

impl SamplingHandle {
    /// Start ticking every `interval`; the first tick fires one interval from now
    fn start(
        generation: Generation,
        interval: Duration,
        events: mpsc::UnboundedSender<PipelineEvent>,
    ) -> Self {
        let pending = Arc::new(AtomicBool::new(false));
        let queued = pending.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if queued.swap(true, Ordering::AcqRel) {
                    trace!("{} tick folded into the pending one", generation);
                    continue;
                }
                if events.send(PipelineEvent::TickFired { generation }).is_err() {
                    break;
                }
            }
        });

        Self { task, pending }
    }

    /// Let the ticker queue its next tick
    fn tick_handled(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Whether the ticker task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SamplingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Resources held by one capture attempt
#[derive(Debug)]
pub struct CaptureSession {
    generation: Generation,
    source_kind: SourceKind,
    status: CaptureStatus,
    stream: Option<Arc<dyn MediaStream>>,
    sampler: Option<SamplingHandle>,
    started_at: Instant,
}

impl CaptureSession {
    fn new(source_kind: SourceKind) -> Self {
        Self {
            generation: Generation::next(),
            source_kind,
            status: CaptureStatus::Acquiring,
            stream: None,
            sampler: None,
            started_at: Instant::now(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    /// Whether a stream is held by this session
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether the sampling ticker exists
    pub fn is_sampling(&self) -> bool {
        self.sampler.is_some()
    }

    /// Time since acquisition was requested
    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Release everything: ticker first, then tracks, then the surface
    fn dispose(&mut self, surface: &dyn RenderSurface) {
        if self.sampler.take().is_some() {
            debug!("{} sampling cancelled", self.generation);
        }

        if let Some(stream) = self.stream.take() {
            stream.stop();
            surface.detach();
            debug!("{} stream {} stopped", self.generation, stream.id());
        }

        self.status = CaptureStatus::Idle;
    }
}

/// Cloneable sender for UI-side events
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl PipelineHandle {
    /// Request capture to start or stop
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.send(PipelineEvent::VisibilityChanged(visible))
    }

    /// Switch to another source
    pub fn select_source(&self, kind: SourceKind) -> Result<()> {
        self.send(PipelineEvent::SourceChanged(kind))
    }

    /// Stop the current session
    pub fn stop(&self) -> Result<()> {
        self.send(PipelineEvent::StopRequested)
    }

    /// Stop the event loop
    pub fn shutdown(&self) -> Result<()> {
        self.send(PipelineEvent::Shutdown)
    }

    fn send(&self, event: PipelineEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| FramecastError::PipelineClosed)
    }
}

/// Camera/screen capture pipeline
pub struct CapturePipeline {
    /// Configuration
    config: CaptureConfig,
    /// Where streams come from
    source: Arc<dyn MediaSource>,
    /// Where streams are presented and sampled from
    surface: Arc<dyn RenderSurface>,
    /// Peer connection, if one has been provided
    channel: Option<Arc<dyn TransportChannel>>,
    /// Raster + encoder
    sampler: Sampler,
    /// Frame emitter
    transmitter: Transmitter,
    /// Event queue (sender half is cloned into tasks)
    events_tx: mpsc::UnboundedSender<PipelineEvent>,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    /// Published status snapshot
    status_tx: watch::Sender<PipelineStatus>,
    /// Whether the UI wants capture running
    visible: bool,
    /// Selected source
    source_kind: SourceKind,
    /// Current session, if any
    session: Option<CaptureSession>,
    /// Error that ended the last session
    last_error: Option<FramecastError>,
    /// Sessions started
    sessions_started: u64,
    /// Sessions ended by an error
    sessions_failed: u64,
    /// Ticks handled for a live session
    ticks: u64,
    /// Ticks that produced no frame
    ticks_skipped: u64,
    /// Samples that failed to encode
    frames_failed: u64,
    /// Creation time
    start_time: Instant,
}

impl CapturePipeline {
    /// Create a pipeline encoding with JPEG at the configured quality
    pub fn new(
        config: CaptureConfig,
        source: Arc<dyn MediaSource>,
        surface: Arc<dyn RenderSurface>,
    ) -> Result<Self> {
        let encoder = JpegEncoder::new(config.jpeg_quality);
        Self::with_encoder(config, source, surface, Box::new(encoder))
    }

    /// Create a pipeline with a custom encoder
    pub fn with_encoder(
        config: CaptureConfig,
        source: Arc<dyn MediaSource>,
        surface: Arc<dyn RenderSurface>,
        encoder: Box<dyn FrameEncoder>,
    ) -> Result<Self> {
        config.validate_strict()?;
        for warning in config.validate() {
            warn!("{}", warning);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let source_kind = config.source_kind;
        let (status_tx, _) = watch::channel(PipelineStatus {
            source_kind,
            ..Default::default()
        });

        info!(
            "Pipeline configured for {} sampling every {}ms at quality {}",
            source_kind,
            config.sample_interval_ms,
            config.jpeg_quality_percent()
        );

        Ok(Self {
            transmitter: Transmitter::new(config.event_name.clone()),
            sampler: Sampler::new(encoder),
            config,
            source,
            surface,
            channel: None,
            events_tx,
            events_rx,
            status_tx,
            visible: false,
            source_kind,
            session: None,
            last_error: None,
            sessions_started: 0,
            sessions_failed: 0,
            ticks: 0,
            ticks_skipped: 0,
            frames_failed: 0,
            start_time: Instant::now(),
        })
    }

    /// Attach the peer connection
    pub fn with_channel(mut self, channel: Arc<dyn TransportChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Replace or remove the peer connection
    pub fn set_channel(&mut self, channel: Option<Arc<dyn TransportChannel>>) {
        self.channel = channel;
    }

    /// Sender for UI-side events
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.status_tx.subscribe()
    }

    /// Current status snapshot
    pub fn status(&self) -> PipelineStatus {
        let (has_error, message) = match &self.last_error {
            Some(e) => (true, e.user_message()),
            None => (false, String::new()),
        };

        PipelineStatus {
            status: self
                .session
                .as_ref()
                .map(|s| s.status)
                .unwrap_or(CaptureStatus::Idle),
            source_kind: self.source_kind,
            visible: self.visible,
            has_error,
            message,
        }
    }

    /// The live session, if any
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Error that ended the last session
    pub fn last_error(&self) -> Option<&FramecastError> {
        self.last_error.as_ref()
    }

    /// Configuration in use
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Wait for the next event and handle it
    ///
    /// Returns false once the pipeline has been shut down.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.dispatch(event),
            None => false,
        }
    }

    /// Handle every event already queued, without waiting
    ///
    /// Returns the number of events handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            handled += 1;
            if !self.dispatch(event) {
                break;
            }
        }
        handled
    }

    /// Run the event loop until shutdown
    pub async fn run(mut self) {
        info!("Pipeline event loop started");
        while self.step().await {}
        self.teardown();
        self.publish_status();
        info!("Pipeline event loop finished: {}", self.stats());
    }

    /// Handle one event
    ///
    /// Returns false for `Shutdown`.
    pub fn dispatch(&mut self, event: PipelineEvent) -> bool {
        match event {
            PipelineEvent::VisibilityChanged(visible) => self.on_visibility_changed(visible),
            PipelineEvent::SourceChanged(kind) => self.on_source_changed(kind),
            PipelineEvent::StopRequested => {
                info!("Stop requested");
                self.teardown();
                self.last_error = None;
            }
            PipelineEvent::AcquisitionResolved { generation, stream } => {
                self.on_acquisition_resolved(generation, stream)
            }
            PipelineEvent::AcquisitionFailed { generation, error } => {
                self.on_acquisition_failed(generation, error)
            }
            PipelineEvent::SurfaceReady { generation } => self.on_surface_ready(generation),
            PipelineEvent::PlaybackFailed { generation, error } => {
                self.on_playback_failed(generation, error)
            }
            PipelineEvent::TickFired { generation } => self.on_tick(generation),
            PipelineEvent::Shutdown => {
                info!("Pipeline shutting down");
                self.teardown();
                self.publish_status();
                return false;
            }
        }

        self.publish_status();
        true
    }

    fn on_visibility_changed(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.start_session();
        } else {
            info!("Capture hidden");
            self.teardown();
            self.last_error = None;
        }
    }

    fn on_source_changed(&mut self, kind: SourceKind) {
        if kind == self.source_kind {
            debug!("Source already {}", kind);
            return;
        }

        info!("Switching source {} -> {}", self.source_kind, kind);
        self.teardown();
        self.last_error = None;
        self.source_kind = kind;

        if self.visible {
            self.start_session();
        }
    }

    /// Begin acquisition unless a session already exists
    fn start_session(&mut self) {
        if let Some(session) = &self.session {
            debug!("{} already {}", session.generation, session.status);
            return;
        }

        self.last_error = None;
        let session = CaptureSession::new(self.source_kind);
        let generation = session.generation;
        let kind = session.source_kind;
        self.session = Some(session);
        self.sessions_started += 1;

        info!("{} acquiring {}", generation, kind);

        let source = self.source.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match source.acquire(kind).await {
                Ok(stream) => PipelineEvent::AcquisitionResolved { generation, stream },
                Err(error) => PipelineEvent::AcquisitionFailed { generation, error },
            };

            // Nobody is left to release a stream if the loop is gone
            if let Err(mpsc::error::SendError(event)) = events.send(event) {
                if let PipelineEvent::AcquisitionResolved { stream, .. } = event {
                    stream.stop();
                }
            }
        });
    }

    /// Whether `generation` is the live session in the given status
    fn is_current(&self, generation: Generation, status: CaptureStatus) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.generation == generation && s.status == status)
    }

    fn on_acquisition_resolved(&mut self, generation: Generation, stream: Arc<dyn MediaStream>) {
        if !self.is_current(generation, CaptureStatus::Acquiring) {
            info!("Releasing stale stream {} from {}", stream.id(), generation);
            stream.stop();
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };

        info!("{} acquired stream {}", generation, stream.id());
        session.stream = Some(stream.clone());
        session.status = CaptureStatus::Binding;
        self.surface.attach(stream);

        let surface = self.surface.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match surface.play().await {
                Ok(()) => PipelineEvent::SurfaceReady { generation },
                Err(error) => PipelineEvent::PlaybackFailed { generation, error },
            };
            let _ = events.send(event);
        });
    }

    fn on_acquisition_failed(&mut self, generation: Generation, error: SourceError) {
        if !self.is_current(generation, CaptureStatus::Acquiring) {
            debug!("Ignoring stale acquisition failure from {}: {}", generation, error);
            return;
        }

        let err = FramecastError::from_acquisition(self.source_kind, &error);
        self.fail_session(err);
    }

    fn on_surface_ready(&mut self, generation: Generation) {
        if !self.is_current(generation, CaptureStatus::Binding) {
            debug!("Ignoring stale surface readiness from {}", generation);
            return;
        }

        let interval = self.config.sample_interval();
        let events = self.events_tx.clone();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.sampler = Some(SamplingHandle::start(generation, interval, events));
        session.status = CaptureStatus::Active;

        match self.surface.natural_size() {
            Some((w, h)) => info!(
                "{} active at {}x{}, sampling every {:?}",
                generation, w, h, interval
            ),
            None => info!("{} active, sampling every {:?}", generation, interval),
        }
    }

    fn on_playback_failed(&mut self, generation: Generation, error: SourceError) {
        if !self.is_current(generation, CaptureStatus::Binding) {
            debug!("Ignoring stale playback failure from {}: {}", generation, error);
            return;
        }

        let err = FramecastError::from_playback(self.source_kind, &error);
        self.fail_session(err);
    }

    fn on_tick(&mut self, generation: Generation) {
        if !self.is_current(generation, CaptureStatus::Active) {
            trace!("Ignoring tick from {}", generation);
            return;
        }
        if let Some(sampler) = self.session.as_ref().and_then(|s| s.sampler.as_ref()) {
            sampler.tick_handled();
        }
        self.ticks += 1;

        let Some(channel) = self.channel.clone() else {
            trace!("No transport channel, skipping tick");
            self.ticks_skipped += 1;
            return;
        };

        match self.sampler.sample(self.surface.as_ref()) {
            Ok(Some(frame)) => {
                if self.transmitter.transmit(channel.as_ref(), &frame) == TransmitOutcome::Dropped {
                    trace!("{} frame dropped", generation);
                }
            }
            Ok(None) => {
                self.ticks_skipped += 1;
            }
            Err(e) => {
                self.frames_failed += 1;
                warn!("Dropping sample: {}", e);
            }
        }
    }

    /// Record a fatal error and release the session
    fn fail_session(&mut self, err: FramecastError) {
        error!("Capture failed: {}", err);
        if let Some(hint) = err.user_hint() {
            debug!("Hint: {}", hint);
        }
        self.teardown();
        self.sessions_failed += 1;
        self.last_error = Some(err);
    }

    /// Release the current session, if any
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.dispose(self.surface.as_ref());
            info!(
                "{} released after {:.1}s",
                session.generation,
                session.age().as_secs_f64()
            );
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Get pipeline statistics
    pub fn stats(&self) -> PipelineStats {
        let raster = self.sampler.raster();
        PipelineStats {
            generation: self.session.as_ref().map(|s| s.generation),
            status: self.status().status,
            source_kind: self.source_kind,
            raster: (raster.width(), raster.height()),
            sessions_started: self.sessions_started,
            sessions_failed: self.sessions_failed,
            ticks: self.ticks,
            ticks_skipped: self.ticks_skipped,
            frames_sent: self.transmitter.frames_sent(),
            frames_dropped: self.transmitter.frames_dropped(),
            frames_failed: self.frames_failed,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Pipeline statistics
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Live session, if any
    pub generation: Option<Generation>,
    /// Current status
    pub status: CaptureStatus,
    /// Selected source
    pub source_kind: SourceKind,
    /// Current raster dimensions
    pub raster: (u32, u32),
    /// Sessions started
    pub sessions_started: u64,
    /// Sessions ended by an error
    pub sessions_failed: u64,
    /// Ticks handled for a live session
    pub ticks: u64,
    /// Ticks that produced no frame
    pub ticks_skipped: u64,
    /// Frames handed to the channel
    pub frames_sent: u64,
    /// Frames discarded while disconnected
    pub frames_dropped: u64,
    /// Samples that failed to encode
    pub frames_failed: u64,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} - raster {}x{}, {} sessions ({} failed), {} ticks ({} skipped), {} sent, {} dropped, {} failed, {:.1}s",
            self.source_kind,
            self.status,
            self.raster.0,
            self.raster.1,
            self.sessions_started,
            self.sessions_failed,
            self.ticks,
            self.ticks_skipped,
            self.frames_sent,
            self.frames_dropped,
            self.frames_failed,
            self.elapsed_seconds
        )
    }
}
