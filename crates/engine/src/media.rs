use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::time::TrimWindow;

/// Player element the widget drives.
///
/// Implementations own the decoded media; the widget only reads and writes
/// through this interface.
pub trait MediaResource {
    /// Clip length in seconds. Only meaningful after [`MediaResource::load`].
    fn duration(&self) -> f64;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Seeks to `seconds`.
    fn set_current_time(&mut self, seconds: f64);

    fn play(&mut self);

    fn pause(&mut self);

    /// Points the player at `source` and reloads it.
    fn load(&mut self, source: &SourceUri);

    /// Lets the player follow widget time by `elapsed`.
    ///
    /// Players with their own clock ignore this.
    fn advance(&mut self, _elapsed: Duration) {}
}

/// Upload surface issuing addressable handles for raw files.
pub trait SourceRegistry {
    /// Creates a new handle addressing `file`.
    fn acquire(&mut self, file: &Path) -> Result<String>;

    /// Frees a handle returned by [`SourceRegistry::acquire`].
    fn release(&mut self, handle: &str);
}

/// Addressable media handle with an optional `#t=start,end` fragment.
///
/// # Example
/// ```
/// use trim_engine::{SourceUri, TrimWindow};
///
/// let uri = SourceUri::new("media://1/clip.mp4").with_range(TrimWindow::new(2.5, 7.0));
/// assert_eq!(uri.to_string(), "media://1/clip.mp4#t=2.5,7");
/// assert_eq!(SourceUri::parse("media://1/clip.mp4#t=2.5,7").expect("valid"), uri);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUri {
    handle: String,
    range: Option<TrimWindow>,
}

impl SourceUri {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, range: TrimWindow) -> Self {
        self.range = Some(range);
        self
    }

    /// Handle without the fragment.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn range(&self) -> Option<TrimWindow> {
        self.range
    }

    /// Parses `handle[#t=start,end]`.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidSourceUri {
            value: value.to_string(),
        };

        let Some((handle, fragment)) = value.split_once('#') else {
            if value.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::new(value));
        };
        if handle.is_empty() {
            return Err(invalid());
        }

        let times = fragment.strip_prefix("t=").ok_or_else(invalid)?;
        let (start, end) = times.split_once(',').ok_or_else(invalid)?;
        let start_time = start.trim().parse::<f64>().map_err(|_| invalid())?;
        let end_time = end.trim().parse::<f64>().map_err(|_| invalid())?;
        if !start_time.is_finite() || !end_time.is_finite() || end_time < start_time {
            return Err(invalid());
        }

        Ok(Self::new(handle).with_range(TrimWindow::new(start_time, end_time)))
    }
}

impl Display for SourceUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.range {
            Some(range) => write!(
                f,
                "{}#t={},{}",
                self.handle, range.start_time, range.end_time
            ),
            None => write!(f, "{}", self.handle),
        }
    }
}

/// Registry issuing `media://<id>/<file name>` handles for local files.
#[derive(Debug, Default)]
pub struct LocalFileRegistry {
    next_id: u64,
    live: BTreeSet<String>,
}

impl LocalFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: &str) -> bool {
        self.live.contains(handle)
    }
}

impl SourceRegistry for LocalFileRegistry {
    fn acquire(&mut self, file: &Path) -> Result<String> {
        let name = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| EngineError::InvalidSource(file.to_path_buf()))?;

        self.next_id += 1;
        let handle = format!("media://{}/{name}", self.next_id);
        self.live.insert(handle.clone());
        debug!(%handle, path = ?file, live = self.live.len(), "source handle acquired");
        Ok(handle)
    }

    fn release(&mut self, handle: &str) {
        if self.live.remove(handle) {
            debug!(%handle, live = self.live.len(), "source handle released");
        } else {
            warn!(%handle, "release of unknown source handle ignored");
        }
    }
}

/// Headless player that advances only when told to.
///
/// Honors media fragments the way browsers do: loading seeks to the fragment
/// start and playback pauses once the fragment end is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPlayer {
    duration: f64,
    /// Position of the last seek.
    anchor: f64,
    /// Playback time accumulated since `anchor`.
    played: Duration,
    playing: bool,
    range: Option<TrimWindow>,
    loaded: Option<SourceUri>,
}

impl SimulatedPlayer {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            anchor: 0.0,
            played: Duration::ZERO,
            playing: false,
            range: None,
            loaded: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn loaded(&self) -> Option<&SourceUri> {
        self.loaded.as_ref()
    }

    fn stop_at(&self) -> f64 {
        self.range
            .map(|range| range.end_time.min(self.duration))
            .unwrap_or(self.duration)
    }
}

impl MediaResource for SimulatedPlayer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.anchor + self.played.as_secs_f64()
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.anchor = seconds.clamp(0.0, self.duration.max(0.0));
        self.played = Duration::ZERO;
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn load(&mut self, source: &SourceUri) {
        self.range = source.range();
        self.playing = false;
        self.loaded = Some(source.clone());
        let start = self.range.map(|range| range.start_time).unwrap_or(0.0);
        self.set_current_time(start);
    }

    fn advance(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }

        self.played += elapsed;
        let stop_at = self.stop_at();
        if self.current_time() >= stop_at {
            self.set_current_time(stop_at);
            self.playing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::{LocalFileRegistry, MediaResource, SimulatedPlayer, SourceRegistry, SourceUri};
    use crate::error::EngineError;
    use crate::time::TrimWindow;

    #[test]
    fn uri_without_fragment_parses_as_plain_handle() {
        let uri = SourceUri::parse("media://3/a.webm").expect("valid");
        assert_eq!(uri.handle(), "media://3/a.webm");
        assert_eq!(uri.range(), None);
    }

    #[test]
    fn uri_rejects_malformed_fragments() {
        for value in [
            "",
            "#t=1,2",
            "media://1/a.mp4#x=1,2",
            "media://1/a.mp4#t=1",
            "media://1/a.mp4#t=4,2",
            "media://1/a.mp4#t=a,2",
        ] {
            assert!(
                matches!(
                    SourceUri::parse(value),
                    Err(EngineError::InvalidSourceUri { .. })
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn registry_issues_unique_handles_and_tracks_release() {
        let mut registry = LocalFileRegistry::new();
        let first = registry.acquire(Path::new("/tmp/clip.mp4")).expect("acquire");
        let second = registry.acquire(Path::new("/tmp/clip.mp4")).expect("acquire");

        assert_ne!(first, second);
        assert_eq!(registry.live_count(), 2);

        registry.release(&first);
        registry.release(&first);
        assert_eq!(registry.live_count(), 1);
        assert!(registry.is_live(&second));
    }

    #[test]
    fn registry_rejects_paths_without_file_name() {
        let mut registry = LocalFileRegistry::new();
        assert!(matches!(
            registry.acquire(Path::new("/")),
            Err(EngineError::InvalidSource(_))
        ));
    }

    #[test]
    fn player_load_seeks_to_fragment_start_and_stops_at_end() {
        let mut player = SimulatedPlayer::new(20.0);
        player.load(&SourceUri::new("media://1/a.mp4").with_range(TrimWindow::new(5.0, 7.0)));
        assert_eq!(player.current_time(), 5.0);
        assert!(!player.is_playing());

        player.play();
        player.advance(Duration::from_secs(1));
        assert_eq!(player.current_time(), 6.0);

        player.advance(Duration::from_secs(5));
        assert_eq!(player.current_time(), 7.0);
        assert!(!player.is_playing());
    }

    #[test]
    fn paused_player_does_not_advance() {
        let mut player = SimulatedPlayer::new(10.0);
        player.load(&SourceUri::new("media://1/a.mp4"));

        player.advance(Duration::from_secs(3));

        assert_eq!(player.current_time(), 0.0);
    }
}
