use std::time::Duration;

use tracing::debug;

use crate::mapping::TrackGeometry;
use crate::media::MediaResource;
use crate::timer::{TimerKind, TimerQueue, TimerToken};

/// Polls the playback position and maps it onto the track.
#[derive(Debug, Clone)]
pub struct PositionIndicator {
    cadence: Duration,
    token: Option<TimerToken>,
    offset_px: f64,
}

impl PositionIndicator {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            token: None,
            offset_px: 0.0,
        }
    }

    /// Samples once and starts polling, replacing any previous poll.
    pub fn start<M>(
        &mut self,
        media: &M,
        geometry: &TrackGeometry,
        timers: &mut TimerQueue,
        now: Duration,
    ) -> f64
    where
        M: MediaResource + ?Sized,
    {
        self.stop(timers);
        self.sample(media, geometry);
        self.token = Some(timers.schedule(TimerKind::PositionPoll, now + self.cadence));
        debug!(
            cadence_ms = self.cadence.as_millis() as u64,
            "position polling started"
        );
        self.offset_px
    }

    /// Handles a fired timer. Returns the new marker offset, or `None` when
    /// `token` is not the pending poll.
    pub fn on_timer<M>(
        &mut self,
        token: TimerToken,
        media: &M,
        geometry: &TrackGeometry,
        timers: &mut TimerQueue,
        now: Duration,
    ) -> Option<f64>
    where
        M: MediaResource + ?Sized,
    {
        if self.token != Some(token) {
            return None;
        }
        self.sample(media, geometry);
        self.token = Some(timers.schedule(TimerKind::PositionPoll, now + self.cadence));
        Some(self.offset_px)
    }

    pub fn stop(&mut self, timers: &mut TimerQueue) {
        if let Some(token) = self.token.take() {
            timers.cancel(token);
            debug!("position polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Offset of the current-position marker in pixels.
    pub fn offset_px(&self) -> f64 {
        self.offset_px
    }

    fn sample<M>(&mut self, media: &M, geometry: &TrackGeometry)
    where
        M: MediaResource + ?Sized,
    {
        self.offset_px = geometry.offset_at(media.current_time(), media.duration());
    }
}
