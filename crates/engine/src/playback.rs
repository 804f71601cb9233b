use std::time::Duration;

use tracing::{debug, info};

use crate::media::MediaResource;
use crate::time::{TrimWindow, seconds_to_duration};
use crate::timer::{TimerKind, TimerQueue, TimerToken};

/// Restart period for `window`, floored to `min_interval`.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use trim_engine::TrimWindow;
/// use trim_engine::playback::loop_interval;
///
/// let floor = Duration::from_millis(100);
/// assert_eq!(loop_interval(TrimWindow::new(2.0, 4.5), floor), Duration::from_millis(2_500));
/// assert_eq!(loop_interval(TrimWindow::new(3.0, 3.0), floor), floor);
/// ```
pub fn loop_interval(window: TrimWindow, min_interval: Duration) -> Duration {
    seconds_to_duration(window.duration_secs()).max(min_interval)
}

/// Replays the trimmed window forever, one restart timer at a time.
#[derive(Debug, Clone)]
pub struct LoopPlaybackScheduler {
    min_interval: Duration,
    active: Option<ActiveLoop>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveLoop {
    token: TimerToken,
    window: TrimWindow,
    interval: Duration,
}

impl LoopPlaybackScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            active: None,
        }
    }

    /// Starts looping `window`, replacing any running loop.
    ///
    /// The media is expected to already address `window`. Returns the restart
    /// interval.
    pub fn start_loop<M>(
        &mut self,
        window: TrimWindow,
        media: &mut M,
        timers: &mut TimerQueue,
        now: Duration,
    ) -> Duration
    where
        M: MediaResource + ?Sized,
    {
        self.stop(timers);

        let interval = loop_interval(window, self.min_interval);
        media.play();
        let token = timers.schedule(TimerKind::LoopRestart, now + interval);
        self.active = Some(ActiveLoop {
            token,
            window,
            interval,
        });

        info!(
            start_time = window.start_time,
            end_time = window.end_time,
            interval_ms = interval.as_millis() as u64,
            "loop started"
        );
        interval
    }

    /// Handles a fired timer. Returns the window restarted, or `None` when
    /// `token` does not belong to the running loop.
    pub fn on_timer<M>(
        &mut self,
        token: TimerToken,
        media: &mut M,
        timers: &mut TimerQueue,
        now: Duration,
    ) -> Option<TrimWindow>
    where
        M: MediaResource + ?Sized,
    {
        let active = self.active.as_mut().filter(|active| active.token == token)?;

        media.pause();
        media.set_current_time(active.window.start_time);
        media.play();
        active.token = timers.schedule(TimerKind::LoopRestart, now + active.interval);

        debug!(
            start_time = active.window.start_time,
            interval_ms = active.interval.as_millis() as u64,
            "loop restarted"
        );
        Some(active.window)
    }

    /// Cancels the running loop, if any.
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        if let Some(active) = self.active.take() {
            timers.cancel(active.token);
            debug!(
                start_time = active.window.start_time,
                end_time = active.window.end_time,
                "loop stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn window(&self) -> Option<TrimWindow> {
        self.active.map(|active| active.window)
    }

    pub fn token(&self) -> Option<TimerToken> {
        self.active.map(|active| active.token)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::LoopPlaybackScheduler;
    use crate::media::{MediaResource, SimulatedPlayer, SourceUri};
    use crate::time::TrimWindow;
    use crate::timer::{TimerKind, TimerQueue};

    fn loaded_player(window: TrimWindow) -> SimulatedPlayer {
        let mut player = SimulatedPlayer::new(20.0);
        player.load(&SourceUri::new("media://1/a.mp4").with_range(window));
        player
    }

    #[test]
    fn restarting_a_loop_cancels_the_previous_timer() {
        let mut timers = TimerQueue::new();
        let mut looper = LoopPlaybackScheduler::new(Duration::from_millis(100));
        let mut player = loaded_player(TrimWindow::new(0.0, 4.0));

        looper.start_loop(TrimWindow::new(0.0, 4.0), &mut player, &mut timers, Duration::ZERO);
        let first = looper.token().expect("running");
        looper.start_loop(TrimWindow::new(1.0, 2.0), &mut player, &mut timers, Duration::ZERO);

        assert!(!timers.is_pending(first));
        assert_eq!(timers.count_of(TimerKind::LoopRestart), 1);
        assert_eq!(looper.window(), Some(TrimWindow::new(1.0, 2.0)));
    }

    #[test]
    fn fired_timer_seeks_back_to_start_and_reschedules() {
        let window = TrimWindow::new(5.0, 7.0);
        let mut timers = TimerQueue::new();
        let mut looper = LoopPlaybackScheduler::new(Duration::from_millis(100));
        let mut player = loaded_player(window);

        looper.start_loop(window, &mut player, &mut timers, Duration::ZERO);
        player.advance(Duration::from_secs(2));
        assert_eq!(player.current_time(), 7.0);
        assert!(!player.is_playing());

        let (token, _, deadline) = timers.pop_due(Duration::from_secs(2)).expect("due");
        assert_eq!(deadline, Duration::from_secs(2));
        let restarted = looper.on_timer(token, &mut player, &mut timers, deadline);

        assert_eq!(restarted, Some(window));
        assert_eq!(player.current_time(), 5.0);
        assert!(player.is_playing());
        assert_eq!(timers.next_deadline(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn foreign_tokens_are_ignored() {
        let mut timers = TimerQueue::new();
        let mut looper = LoopPlaybackScheduler::new(Duration::from_millis(100));
        let mut player = loaded_player(TrimWindow::new(0.0, 1.0));
        looper.start_loop(TrimWindow::new(0.0, 1.0), &mut player, &mut timers, Duration::ZERO);

        let foreign = timers.schedule(TimerKind::PositionPoll, Duration::ZERO);

        assert_eq!(
            looper.on_timer(foreign, &mut player, &mut timers, Duration::ZERO),
            None
        );
    }

    #[test]
    fn zero_length_window_uses_interval_floor() {
        let mut timers = TimerQueue::new();
        let mut looper = LoopPlaybackScheduler::new(Duration::from_millis(100));
        let mut player = loaded_player(TrimWindow::new(3.0, 3.0));

        let interval =
            looper.start_loop(TrimWindow::new(3.0, 3.0), &mut player, &mut timers, Duration::ZERO);

        assert_eq!(interval, Duration::from_millis(100));
    }

    #[test]
    fn stop_cancels_pending_restart() {
        let mut timers = TimerQueue::new();
        let mut looper = LoopPlaybackScheduler::new(Duration::from_millis(100));
        let mut player = loaded_player(TrimWindow::new(0.0, 1.0));
        looper.start_loop(TrimWindow::new(0.0, 1.0), &mut player, &mut timers, Duration::ZERO);

        looper.stop(&mut timers);

        assert!(!looper.is_running());
        assert!(timers.is_empty());
    }
}
