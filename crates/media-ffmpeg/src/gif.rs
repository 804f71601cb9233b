use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};

/// Request payload for rendering a clip range into an animated GIF.
#[derive(Debug, Clone, PartialEq)]
pub struct GifExportRequest {
    pub input: PathBuf,
    /// Range start in seconds of `input`.
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frames_per_second: f64,
    pub output_path: PathBuf,
}

/// Renders `request` via `ffmpeg`, overwriting `output_path`.
///
/// Frames are sampled at `frames_per_second`, scaled to the requested box
/// and palette-quantized by the GIF muxer.
pub fn export_gif(request: &GifExportRequest) -> Result<()> {
    validate_request(request)?;

    let output = Command::new("ffmpeg")
        .args(build_args(request))
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffmpeg export gif",
            source,
        })?;
    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: command_for_display(request),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

fn build_args(request: &GifExportRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-v", "error", "-y", "-ss"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(format_seconds(request.start_seconds).into());
    args.push("-t".into());
    args.push(format_seconds(request.duration_seconds).into());
    args.push("-i".into());
    args.push(request.input.clone().into_os_string());
    args.push("-vf".into());
    args.push(build_filter(request).into());
    args.push("-an".into());
    args.push("-loop".into());
    args.push("0".into());
    args.push(request.output_path.clone().into_os_string());
    args
}

fn build_filter(request: &GifExportRequest) -> String {
    format!(
        "fps={},scale={}:{}:flags=lanczos",
        request.frames_per_second, request.width, request.height
    )
}

fn format_seconds(value: f64) -> String {
    format!("{value:.3}")
}

fn validate_request(request: &GifExportRequest) -> Result<()> {
    if !request.start_seconds.is_finite() || request.start_seconds < 0.0 {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "gif start must be non-negative",
        });
    }
    if !request.duration_seconds.is_finite() || request.duration_seconds <= 0.0 {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "gif duration must be positive",
        });
    }
    if request.width == 0 || request.height == 0 {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "gif dimensions must be positive",
        });
    }
    if !request.frames_per_second.is_finite() || request.frames_per_second <= 0.0 {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "gif frame rate must be positive",
        });
    }
    Ok(())
}

fn command_for_display(request: &GifExportRequest) -> String {
    format!(
        "ffmpeg export gif: {} -> {}",
        request.input.display(),
        request.output_path.display()
    )
}
