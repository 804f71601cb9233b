//! Thin wrappers over the `ffprobe` and `ffmpeg` command line tools.

mod error;
mod gif;
mod probe;

pub use error::{MediaFfmpegError, Result};
pub use gif::{GifExportRequest, export_gif};
pub use probe::{VideoInfo, probe_video};
