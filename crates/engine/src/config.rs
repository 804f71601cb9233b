//! Widget configuration, loaded from a TOML file or built in code.
//!
//! ```
//! use trim_engine::WidgetConfig;
//!
//! let config = WidgetConfig::from_toml_str("track_width_px = 480.0").expect("valid config");
//! assert_eq!(config.track_width_px, 480.0);
//! assert_eq!(config.poll_interval_ms, 100);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub const DEFAULT_TRACK_WIDTH_PX: f64 = 300.0;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MIN_LOOP_INTERVAL_MS: u64 = 100;
/// GIF exports never exceed this many seconds.
pub const DEFAULT_MAX_EXPORT_SECONDS: f64 = 10.0;
pub const DEFAULT_EXPORT_FRAMES_PER_SECOND: f64 = 10.0;
pub const DEFAULT_EXPORT_SCALE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub track_width_px: f64,
    pub poll_interval_ms: u64,
    pub min_loop_interval_ms: u64,
    pub max_export_seconds: f64,
    pub export_frames_per_second: f64,
    /// Export size relative to the displayed preview box.
    pub export_scale: f64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            track_width_px: DEFAULT_TRACK_WIDTH_PX,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            min_loop_interval_ms: DEFAULT_MIN_LOOP_INTERVAL_MS,
            max_export_seconds: DEFAULT_MAX_EXPORT_SECONDS,
            export_frames_per_second: DEFAULT_EXPORT_FRAMES_PER_SECOND,
            export_scale: DEFAULT_EXPORT_SCALE,
        }
    }
}

impl WidgetConfig {
    /// Parses and validates a TOML document. Missing keys keep defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|source| EngineError::ConfigParse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| EngineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would divide by zero or spin timers.
    pub fn validate(&self) -> Result<()> {
        if !self.track_width_px.is_finite() || self.track_width_px <= 0.0 {
            return Err(EngineError::InvalidTrackWidth(self.track_width_px));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "poll_interval_ms must be positive",
            });
        }
        if self.min_loop_interval_ms == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "min_loop_interval_ms must be positive",
            });
        }
        if !is_positive(self.max_export_seconds) {
            return Err(EngineError::InvalidConfig {
                reason: "max_export_seconds must be positive",
            });
        }
        if !is_positive(self.export_frames_per_second) {
            return Err(EngineError::InvalidConfig {
                reason: "export_frames_per_second must be positive",
            });
        }
        if !is_positive(self.export_scale) {
            return Err(EngineError::InvalidConfig {
                reason: "export_scale must be positive",
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn min_loop_interval(&self) -> Duration {
        Duration::from_millis(self.min_loop_interval_ms)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::WidgetConfig;
    use crate::error::EngineError;

    #[test]
    fn defaults_are_valid() {
        assert!(WidgetConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_track_width_fails_fast() {
        let result = WidgetConfig::from_toml_str("track_width_px = 0.0");
        assert!(matches!(result, Err(EngineError::InvalidTrackWidth(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = WidgetConfig::from_toml_str("poll_interval_ms = 0");
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn unknown_value_types_surface_as_parse_errors() {
        let result = WidgetConfig::from_toml_str("track_width_px = \"wide\"");
        assert!(matches!(result, Err(EngineError::ConfigParse { .. })));
    }

    #[test]
    fn load_from_missing_path_reports_io_error() {
        let result = WidgetConfig::load_from_path(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(EngineError::ConfigIo { .. })));
    }

    #[test]
    fn load_from_path_reads_overrides() {
        let path = std::env::temp_dir().join(format!(
            "gif-trim-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "max_export_seconds = 6.0\nexport_scale = 2.0\n")
            .expect("write config");

        let config = WidgetConfig::load_from_path(&path).expect("load config");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.max_export_seconds, 6.0);
        assert_eq!(config.export_scale, 2.0);
        assert_eq!(config.track_width_px, 300.0);
    }
}
