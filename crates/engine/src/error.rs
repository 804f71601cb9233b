use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::export::EncoderError;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by widget commands and configuration.
#[derive(Debug)]
pub enum EngineError {
    InvalidTrackWidth(f64),
    InvalidDuration(f64),
    InvalidConfig {
        reason: &'static str,
    },
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    SourceNotLoaded,
    InvalidSource(PathBuf),
    InvalidSourceUri {
        value: String,
    },
    InvalidPointer(f64),
    EmptyPreviewBox,
    ExportInProgress,
    NoExportInProgress,
    Encoder(EncoderError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTrackWidth(width) => write!(f, "invalid track width: {width}px"),
            Self::InvalidDuration(duration) => write!(f, "invalid media duration: {duration}s"),
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
            Self::ConfigIo { path, source } => {
                write!(f, "failed to read config: {} ({source})", path.display())
            }
            Self::ConfigParse { path, source } => {
                write!(f, "failed to parse config: {} ({source})", path.display())
            }
            Self::SourceNotLoaded => write!(f, "media source is not loaded"),
            Self::InvalidSource(path) => write!(f, "invalid media source: {}", path.display()),
            Self::InvalidSourceUri { value } => write!(f, "invalid source uri: {value}"),
            Self::InvalidPointer(x) => write!(f, "invalid pointer position: {x}"),
            Self::EmptyPreviewBox => write!(f, "preview box has no size"),
            Self::ExportInProgress => write!(f, "an export is already in progress"),
            Self::NoExportInProgress => write!(f, "no export is in progress"),
            Self::Encoder(err) => write!(f, "encoder failed: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigIo { source, .. } => Some(source),
            Self::ConfigParse { source, .. } => Some(source),
            Self::Encoder(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EncoderError> for EngineError {
    fn from(value: EncoderError) -> Self {
        Self::Encoder(value)
    }
}
