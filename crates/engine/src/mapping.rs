use crate::error::{EngineError, Result};
use crate::time::TrimWindow;

/// Converts a track offset in pixels into a clip time in seconds.
///
/// The mapping is proportional: the left edge is `0` and the right edge is
/// `duration`. No clamping happens here; callers clamp `offset_px` into
/// `[0, width_px]` first.
///
/// # Example
/// ```
/// use trim_engine::mapping::pixel_to_time;
///
/// assert_eq!(pixel_to_time(75.0, 300.0, 20.0), 5.0);
/// ```
pub fn pixel_to_time(offset_px: f64, width_px: f64, duration: f64) -> f64 {
    debug_assert!(width_px > 0.0, "track width must be positive");
    (offset_px / width_px) * duration
}

/// Converts a clip time in seconds into a track offset in pixels.
///
/// Returns `0` for an empty or unknown duration.
///
/// # Example
/// ```
/// use trim_engine::mapping::time_to_pixel;
///
/// assert_eq!(time_to_pixel(10.0, 300.0, 20.0), 150.0);
/// assert_eq!(time_to_pixel(10.0, 300.0, 0.0), 0.0);
/// ```
pub fn time_to_pixel(time: f64, width_px: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 {
        return 0.0;
    }
    (time / duration) * width_px
}

/// Fixed-width track the handles are dragged along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGeometry {
    width_px: f64,
}

impl TrackGeometry {
    /// Creates a validated track geometry.
    pub fn new(width_px: f64) -> Result<Self> {
        if !width_px.is_finite() || width_px <= 0.0 {
            return Err(EngineError::InvalidTrackWidth(width_px));
        }
        Ok(Self { width_px })
    }

    pub fn width_px(&self) -> f64 {
        self.width_px
    }

    /// Clamps `offset_px` into `[0, width_px]`.
    pub fn clamp_offset(&self, offset_px: f64) -> f64 {
        offset_px.clamp(0.0, self.width_px)
    }

    /// Maps a (clamped) offset to clip time.
    pub fn time_at(&self, offset_px: f64, duration: f64) -> f64 {
        pixel_to_time(self.clamp_offset(offset_px), self.width_px, duration)
    }

    /// Maps a clip time to a track offset.
    pub fn offset_at(&self, time: f64, duration: f64) -> f64 {
        time_to_pixel(time, self.width_px, duration)
    }

    /// Derives the trim window spanned by two handle offsets.
    pub fn window_between(&self, start_px: f64, end_px: f64, duration: f64) -> TrimWindow {
        TrimWindow::new(self.time_at(start_px, duration), self.time_at(end_px, duration))
    }
}
