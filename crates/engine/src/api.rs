use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WidgetConfig;
use crate::drag::{DragGestureController, Handle};
use crate::error::{EngineError, Result};
use crate::export::{
    EncodedGif, EncoderError, GifEncoder, GifRequest, PreviewBox, build_gif_request,
    export_duration,
};
use crate::indicator::PositionIndicator;
use crate::mapping::TrackGeometry;
use crate::media::{MediaResource, SourceRegistry, SourceUri};
use crate::playback::LoopPlaybackScheduler;
use crate::time::TrimWindow;
use crate::timer::{TimerKind, TimerQueue};

/// Commands accepted by the widget.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Selects a new clip and resets the selection.
    LoadSource {
        path: PathBuf,
    },
    /// Records the displayed size of the preview element.
    SetPreviewBox(PreviewBox),
    GestureStart {
        handle: Handle,
        x: f64,
    },
    GestureMove {
        x: f64,
    },
    /// Releases the engaged handle and commits the window.
    GestureEnd,
    /// Builds a GIF request for the committed window.
    ///
    /// The widget only emits [`Event::ExportStarted`]; whoever drives it
    /// hands the request to an encoder and reports back through
    /// [`TimelineWidget::finish_export`].
    Export,
    Close,
}

/// Events emitted by the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SourceLoaded { uri: SourceUri, duration: f64 },
    DragStarted { handle: Handle },
    HandleMoved { handle: Handle, offset_px: f64 },
    WindowChanged { window: TrimWindow },
    WindowCommitted { window: TrimWindow },
    LoopStarted { uri: SourceUri, interval_ms: u64 },
    LoopRestarted { start_time: f64 },
    PositionChanged { offset_px: f64 },
    ExportStarted { request: GifRequest },
    ExportFinished { image: String },
    ExportFailed { message: String },
    Closed,
    Error(EngineErrorEvent),
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    SourceNotLoaded,
    ExportInProgress,
    Encoder,
    Other,
}

impl From<&EngineError> for EngineErrorKind {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::SourceNotLoaded => Self::SourceNotLoaded,
            EngineError::ExportInProgress => Self::ExportInProgress,
            EngineError::Encoder(_) => Self::Encoder,
            _ => Self::Other,
        }
    }
}

/// Error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineErrorEvent {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            kind: EngineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// Visible export state of the widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ExportPhase {
    #[default]
    Editing,
    Exporting,
    Complete {
        image: String,
    },
}

/// Read-only render model of the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetView {
    pub active: bool,
    pub dragging: Option<Handle>,
    pub start_offset_px: f64,
    pub end_offset_px: f64,
    pub current_offset_px: f64,
    pub committed: Option<TrimWindow>,
    pub phase: ExportPhase,
}

#[derive(Debug, Clone, PartialEq)]
struct LoadedSource {
    path: PathBuf,
    uri: SourceUri,
    duration: f64,
}

/// Trim control composed of drag handling, loop playback and the position
/// indicator. Owns every piece of mutable state.
#[derive(Debug)]
pub struct TimelineWidget<M, R> {
    config: WidgetConfig,
    media: M,
    sources: R,
    timers: TimerQueue,
    now: Duration,
    source: Option<LoadedSource>,
    drag: DragGestureController,
    looper: LoopPlaybackScheduler,
    indicator: PositionIndicator,
    committed: Option<TrimWindow>,
    preview_box: PreviewBox,
    phase: ExportPhase,
    restore_phase: Option<ExportPhase>,
}

impl<M, R> TimelineWidget<M, R>
where
    M: MediaResource,
    R: SourceRegistry,
{
    /// Creates a widget. Fails fast on an invalid configuration.
    ///
    /// # Example
    /// ```
    /// use trim_engine::{LocalFileRegistry, SimulatedPlayer, TimelineWidget, WidgetConfig};
    ///
    /// let widget = TimelineWidget::new(
    ///     WidgetConfig::default(),
    ///     SimulatedPlayer::new(12.0),
    ///     LocalFileRegistry::new(),
    /// )
    /// .expect("valid config");
    /// assert!(!widget.view().active);
    /// ```
    pub fn new(config: WidgetConfig, media: M, sources: R) -> Result<Self> {
        config.validate()?;
        let geometry = TrackGeometry::new(config.track_width_px)?;

        Ok(Self {
            media,
            sources,
            timers: TimerQueue::new(),
            now: Duration::ZERO,
            source: None,
            drag: DragGestureController::new(geometry),
            looper: LoopPlaybackScheduler::new(config.min_loop_interval()),
            indicator: PositionIndicator::new(config.poll_interval()),
            committed: None,
            preview_box: PreviewBox::default(),
            phase: ExportPhase::Editing,
            restore_phase: None,
            config,
        })
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::LoadSource { path } => self.load_source(&path),
            Command::SetPreviewBox(preview) => {
                self.preview_box = preview;
                Ok(Vec::new())
            }
            Command::GestureStart { handle, x } => self.gesture_start(handle, x),
            Command::GestureMove { x } => Ok(self.gesture_move(x)),
            Command::GestureEnd => self.gesture_end(),
            Command::Export => {
                let request = self.begin_export()?;
                Ok(vec![Event::ExportStarted { request }])
            }
            Command::Close => {
                self.close();
                Ok(vec![Event::Closed])
            }
        }
    }

    /// Points the widget at a new clip and resets the selection.
    pub fn load_source(&mut self, path: &Path) -> Result<Vec<Event>> {
        self.looper.stop(&mut self.timers);
        self.indicator.stop(&mut self.timers);
        self.release_source();
        self.drag.reset();
        self.committed = None;
        self.phase = ExportPhase::Editing;
        self.restore_phase = None;

        let uri = SourceUri::new(self.sources.acquire(path)?);
        self.media.load(&uri);
        let duration = self.media.duration();
        if !duration.is_finite() || duration <= 0.0 {
            warn!(path = ?path, duration, "source rejected: invalid duration");
            self.sources.release(uri.handle());
            return Err(EngineError::InvalidDuration(duration));
        }

        self.source = Some(LoadedSource {
            path: path.to_path_buf(),
            uri: uri.clone(),
            duration,
        });
        let offset_px = self.indicator.start(
            &self.media,
            self.drag.geometry(),
            &mut self.timers,
            self.now,
        );

        info!(path = ?path, %uri, duration, "source loaded");
        Ok(vec![
            Event::SourceLoaded { uri, duration },
            Event::PositionChanged { offset_px },
        ])
    }

    /// Engages `handle` with the pointer at `x`.
    pub fn gesture_start(&mut self, handle: Handle, x: f64) -> Result<Vec<Event>> {
        if self.source.is_none() {
            warn!(?handle, "gesture rejected: no source");
            return Err(EngineError::SourceNotLoaded);
        }
        if !x.is_finite() {
            warn!(?handle, x, "gesture rejected: non-finite pointer");
            return Err(EngineError::InvalidPointer(x));
        }
        self.drag.begin(handle, x);
        Ok(vec![Event::DragStarted { handle }])
    }

    /// Moves the engaged handle. A no-op when nothing is engaged.
    pub fn gesture_move(&mut self, x: f64) -> Vec<Event> {
        let (Some(handle), Some(source)) = (self.drag.active_handle(), self.source.as_ref()) else {
            return Vec::new();
        };
        let Some(window) = self.drag.update(x, source.duration) else {
            return Vec::new();
        };

        let offset_px = self
            .drag
            .positions()
            .offset_of(handle, self.drag.geometry());
        vec![
            Event::HandleMoved { handle, offset_px },
            Event::WindowChanged { window },
        ]
    }

    /// Releases the engaged handle and commits the resulting window.
    pub fn gesture_end(&mut self) -> Result<Vec<Event>> {
        let Some(duration) = self.source.as_ref().map(|source| source.duration) else {
            return Ok(Vec::new());
        };
        let Some(window) = self.drag.end(duration) else {
            return Ok(Vec::new());
        };
        self.commit(window)
    }

    /// Fires every timer due at `now`, in deadline order.
    ///
    /// The media clock follows along so each callback sees the position at
    /// its own deadline.
    pub fn advance_to(&mut self, now: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        if now < self.now {
            return events;
        }

        while let Some((token, kind, deadline)) = self.timers.pop_due(now) {
            let deadline = deadline.max(self.now);
            self.media.advance(deadline - self.now);
            self.now = deadline;

            match kind {
                TimerKind::LoopRestart => {
                    if let Some(window) =
                        self.looper
                            .on_timer(token, &mut self.media, &mut self.timers, deadline)
                    {
                        events.push(Event::LoopRestarted {
                            start_time: window.start_time,
                        });
                    }
                }
                TimerKind::PositionPoll => {
                    if let Some(offset_px) = self.indicator.on_timer(
                        token,
                        &self.media,
                        self.drag.geometry(),
                        &mut self.timers,
                        deadline,
                    ) {
                        events.push(Event::PositionChanged { offset_px });
                    }
                }
            }
        }

        self.media.advance(now - self.now);
        self.now = now;
        events
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Builds the GIF request and enters [`ExportPhase::Exporting`].
    pub fn begin_export(&mut self) -> Result<GifRequest> {
        if self.phase == ExportPhase::Exporting {
            warn!("export rejected: already exporting");
            return Err(EngineError::ExportInProgress);
        }
        let source = self.source.as_ref().ok_or(EngineError::SourceNotLoaded)?;

        let duration = export_duration(
            self.committed,
            source.duration,
            self.config.max_export_seconds,
        );
        let request = build_gif_request(&self.config, self.preview_box, &source.uri, duration)?;

        info!(
            duration,
            frame_count = request.frame_count,
            width = request.width,
            height = request.height,
            "export started"
        );
        self.restore_phase = Some(std::mem::replace(&mut self.phase, ExportPhase::Exporting));
        Ok(request)
    }

    /// Applies the encoder outcome of the export in flight.
    ///
    /// On failure the visible state returns to what it was before the export
    /// and the encoder error is returned.
    pub fn finish_export(
        &mut self,
        outcome: std::result::Result<EncodedGif, EncoderError>,
    ) -> Result<Vec<Event>> {
        let Some(previous) = self.restore_phase.take() else {
            return Err(EngineError::NoExportInProgress);
        };

        match outcome {
            Ok(gif) => {
                info!(image_len = gif.image.len(), "export finished");
                self.phase = ExportPhase::Complete {
                    image: gif.image.clone(),
                };
                Ok(vec![Event::ExportFinished { image: gif.image }])
            }
            Err(error) => {
                warn!(%error, "export failed");
                self.phase = previous;
                Err(EngineError::Encoder(error))
            }
        }
    }

    /// Runs one export attempt against `encoder`.
    pub async fn export<E>(&mut self, encoder: &E) -> Result<EncodedGif>
    where
        E: GifEncoder,
    {
        let request = self.begin_export()?;
        let outcome = encoder.encode(request).await;
        self.finish_export(outcome.clone())?;
        outcome.map_err(EngineError::Encoder)
    }

    /// Stops both timers and releases the current source handle.
    pub fn close(&mut self) {
        self.looper.stop(&mut self.timers);
        self.indicator.stop(&mut self.timers);
        self.release_source();
        self.drag.reset();
        self.committed = None;
        info!("widget closed");
    }

    pub fn view(&self) -> WidgetView {
        let geometry = self.drag.geometry();
        WidgetView {
            active: self.source.is_some(),
            dragging: self.drag.active_handle(),
            start_offset_px: self.drag.positions().start_px(),
            end_offset_px: self.drag.positions().end_px(geometry),
            current_offset_px: self.indicator.offset_px(),
            committed: self.committed,
            phase: self.phase.clone(),
        }
    }

    pub fn committed_window(&self) -> Option<TrimWindow> {
        self.committed
    }

    /// Address of the clip currently loaded in the player.
    pub fn source_uri(&self) -> Option<&SourceUri> {
        self.source.as_ref().map(|source| &source.uri)
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn sources(&self) -> &R {
        &self.sources
    }

    fn commit(&mut self, window: TrimWindow) -> Result<Vec<Event>> {
        let Some(path) = self.source.as_ref().map(|source| source.path.clone()) else {
            return Err(EngineError::SourceNotLoaded);
        };

        let uri = SourceUri::new(self.sources.acquire(&path)?).with_range(window);
        self.looper.stop(&mut self.timers);
        self.release_source_handle();
        self.media.load(&uri);
        if let Some(source) = self.source.as_mut() {
            source.uri = uri.clone();
        }
        self.committed = Some(window);

        let interval = self
            .looper
            .start_loop(window, &mut self.media, &mut self.timers, self.now);
        info!(
            start_time = window.start_time,
            end_time = window.end_time,
            %uri,
            "window committed"
        );
        Ok(vec![
            Event::WindowCommitted { window },
            Event::LoopStarted {
                uri,
                interval_ms: interval.as_millis() as u64,
            },
        ])
    }

    fn release_source(&mut self) {
        self.release_source_handle();
        self.source = None;
    }

    fn release_source_handle(&mut self) {
        if let Some(source) = self.source.as_ref() {
            debug!(uri = %source.uri, "releasing superseded source handle");
            self.sources.release(source.uri.handle());
        }
    }
}
