use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};

/// First video stream of a file as reported by `ffprobe`.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Container duration in seconds.
    pub duration_seconds: f64,
}

/// Probes the first video stream and the container duration via `ffprobe`.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::probe_video;
///
/// let info = probe_video("sample.mp4").expect("probe should succeed");
/// assert!(info.duration_seconds > 0.0);
/// ```
pub fn probe_video(path: impl AsRef<Path>) -> Result<VideoInfo> {
    let path = path.as_ref();

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:format=duration",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffprobe video probe",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: format!("ffprobe video probe: ffprobe {}", path.display()),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8(output.stdout)?;
    parse_probe_output(path, &stdout)
}

/// Parses `key=value` lines printed by [`probe_video`]'s `ffprobe` call.
fn parse_probe_output(path: &Path, stdout: &str) -> Result<VideoInfo> {
    let mut width = None;
    let mut height = None;
    let mut duration = None;
    let mut saw_stream = false;

    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| MediaFfmpegError::Parse {
                context: "probe field",
                value: line.to_string(),
            })?;
        let key = key.trim();
        saw_stream |= matches!(key, "width" | "height");
        let value = value.trim();
        if value.is_empty() || value == "N/A" {
            continue;
        }

        match key {
            "width" => width = Some(parse_u32(value, "width")?),
            "height" => height = Some(parse_u32(value, "height")?),
            "duration" => {
                duration = Some(value.parse::<f64>().map_err(|_| MediaFfmpegError::Parse {
                    context: "format duration seconds",
                    value: value.to_string(),
                })?)
            }
            _ => {}
        }
    }

    if !saw_stream {
        return Err(MediaFfmpegError::MissingVideoStream(path.to_path_buf()));
    }
    let (Some(width), Some(height)) = (width, height) else {
        return Err(MediaFfmpegError::MissingVideoDimensions(path.to_path_buf()));
    };
    let duration_seconds = duration.ok_or_else(|| MediaFfmpegError::Parse {
        context: "format duration seconds",
        value: "N/A".to_string(),
    })?;

    Ok(VideoInfo {
        path: path.to_path_buf(),
        width,
        height,
        duration_seconds,
    })
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32> {
    value.parse::<u32>().map_err(|_| MediaFfmpegError::Parse {
        context,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::parse_probe_output;
    use crate::error::MediaFfmpegError;

    #[test]
    fn parses_stream_and_format_fields() {
        let info = parse_probe_output(
            Path::new("clip.mp4"),
            "width=640\nheight=360\nduration=12.480000\n",
        )
        .expect("parse");

        assert_eq!((info.width, info.height), (640, 360));
        assert_eq!(info.duration_seconds, 12.48);
    }

    #[test]
    fn audio_only_file_has_no_video_stream() {
        let result = parse_probe_output(Path::new("song.m4a"), "duration=3.0\n");
        assert!(matches!(result, Err(MediaFfmpegError::MissingVideoStream(_))));
    }

    #[test]
    fn unknown_dimensions_are_reported() {
        let result = parse_probe_output(
            Path::new("clip.mp4"),
            "width=N/A\nheight=N/A\nduration=3.0\n",
        );
        assert!(matches!(
            result,
            Err(MediaFfmpegError::MissingVideoDimensions(_))
        ));
    }

    #[test]
    fn missing_duration_is_a_parse_error() {
        let result = parse_probe_output(
            Path::new("clip.mp4"),
            "width=640\nheight=360\nduration=N/A\n",
        );
        assert!(matches!(result, Err(MediaFfmpegError::Parse { .. })));
    }
}
