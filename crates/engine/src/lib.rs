//! UI-agnostic engine for the video trim widget.
//!
//! Pixel/time mapping, drag handling, loop playback, the position indicator
//! and GIF export are plain state machines driven by [`TimelineWidget`].
//! [`driver::run`] binds them to wall-clock time.

pub mod api;
pub mod config;
pub mod drag;
pub mod driver;
pub mod error;
pub mod export;
pub mod indicator;
pub mod mapping;
pub mod media;
pub mod playback;
pub mod time;
pub mod timer;

pub use api::{
    Command, EngineErrorEvent, EngineErrorKind, Event, ExportPhase, TimelineWidget, WidgetView,
};
pub use config::WidgetConfig;
pub use drag::{DragGestureController, DragState, Handle, HandlePositions};
pub use error::{EngineError, Result};
pub use export::{
    EncodedGif, EncoderError, FfmpegGifEncoder, GifEncoder, GifRequest, PreviewBox,
};
pub use indicator::PositionIndicator;
pub use mapping::{TrackGeometry, pixel_to_time, time_to_pixel};
pub use media::{LocalFileRegistry, MediaResource, SimulatedPlayer, SourceRegistry, SourceUri};
pub use playback::LoopPlaybackScheduler;
pub use time::TrimWindow;
pub use timer::{TimerKind, TimerQueue, TimerToken};
