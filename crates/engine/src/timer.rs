use std::time::Duration;

use serde::Serialize;

/// Opaque cancellation token for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerToken(u64);

/// Owner of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerKind {
    LoopRestart,
    PositionPoll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledTimer {
    token: TimerToken,
    kind: TimerKind,
    deadline: Duration,
}

/// Single-threaded timer queue driven by an external clock.
///
/// Deadlines are offsets from an arbitrary origin chosen by the driver. Every
/// [`TimerQueue::schedule`] call returns a fresh token; a cancelled or fired
/// token never becomes valid again.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use trim_engine::timer::{TimerKind, TimerQueue};
///
/// let mut timers = TimerQueue::new();
/// let token = timers.schedule(TimerKind::PositionPoll, Duration::from_millis(100));
///
/// assert!(timers.pop_due(Duration::from_millis(50)).is_none());
/// let fired = timers.pop_due(Duration::from_millis(100)).expect("due");
/// assert_eq!(fired.0, token);
/// ```
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_token: u64,
    scheduled: Vec<ScheduledTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a timer firing at `deadline`.
    pub fn schedule(&mut self, kind: TimerKind, deadline: Duration) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.scheduled.push(ScheduledTimer {
            token,
            kind,
            deadline,
        });
        token
    }

    /// Cancels a pending timer. Returns false for stale tokens.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let Some(index) = self.scheduled.iter().position(|timer| timer.token == token) else {
            return false;
        };
        self.scheduled.swap_remove(index);
        true
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.scheduled.iter().any(|timer| timer.token == token)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduled.iter().map(|timer| timer.deadline).min()
    }

    /// Removes and returns the earliest timer due at `now`.
    ///
    /// Timers sharing a deadline fire in scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerToken, TimerKind, Duration)> {
        let index = self
            .scheduled
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline <= now)
            .min_by_key(|(_, timer)| (timer.deadline, timer.token))
            .map(|(index, _)| index)?;
        let timer = self.scheduled.swap_remove(index);
        Some((timer.token, timer.kind, timer.deadline))
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Number of pending timers of one kind.
    pub fn count_of(&self, kind: TimerKind) -> usize {
        self.scheduled
            .iter()
            .filter(|timer| timer.kind == kind)
            .count()
    }

    pub fn clear(&mut self) {
        self.scheduled.clear();
    }
}
