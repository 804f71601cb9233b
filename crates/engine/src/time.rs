use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Selected `[start_time, end_time]` sub-range of a clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start_time: f64,
    pub end_time: f64,
}

impl TrimWindow {
    /// Creates a window spanning `start_time..end_time`.
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Window covering a full clip of `duration` seconds.
    ///
    /// # Example
    /// ```
    /// use trim_engine::TrimWindow;
    ///
    /// let window = TrimWindow::full(20.0);
    /// assert_eq!(window.duration_secs(), 20.0);
    /// ```
    pub fn full(duration: f64) -> Self {
        Self::new(0.0, duration)
    }

    /// Length of the window in seconds. Never negative.
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// Converts seconds into a [`Duration`], mapping negative or non-finite input
/// to zero.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use trim_engine::time::seconds_to_duration;
///
/// assert_eq!(seconds_to_duration(1.5), Duration::from_millis(1_500));
/// assert_eq!(seconds_to_duration(-3.0), Duration::ZERO);
/// ```
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(seconds)
}
