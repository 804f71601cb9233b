use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WidgetConfig;
use crate::error::{EngineError, Result};
use crate::media::SourceUri;
use crate::time::TrimWindow;

/// Absorbs float noise from pixel-derived windows before flooring.
const FRAME_COUNT_EPSILON: f64 = 1e-9;

/// Displayed size of the preview element in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewBox {
    pub width: f64,
    pub height: f64,
}

impl PreviewBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Payload handed to the GIF encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GifRequest {
    pub width: u32,
    pub height: u32,
    pub source_uris: Vec<String>,
    pub frame_count: u32,
}

/// Successful encoder output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedGif {
    /// URI of the encoded image (data or file URI).
    pub image: String,
}

/// Failure reported by the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderError {
    pub message: String,
}

impl EncoderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for EncoderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EncoderError {}

/// External GIF encoder. One call per export, no retries.
pub trait GifEncoder {
    fn encode(
        &self,
        request: GifRequest,
    ) -> impl Future<Output = std::result::Result<EncodedGif, EncoderError>>;
}

/// Seconds to export: the committed window, or the whole clip when nothing
/// (or an empty window) was committed, capped to `max_seconds`.
///
/// # Example
/// ```
/// use trim_engine::TrimWindow;
/// use trim_engine::export::export_duration;
///
/// assert_eq!(export_duration(Some(TrimWindow::new(0.0, 14.0)), 30.0, 10.0), 10.0);
/// assert_eq!(export_duration(None, 4.0, 10.0), 4.0);
/// assert_eq!(export_duration(Some(TrimWindow::new(6.0, 6.0)), 4.0, 10.0), 4.0);
/// ```
pub fn export_duration(committed: Option<TrimWindow>, full_duration: f64, max_seconds: f64) -> f64 {
    committed
        .map(|window| window.duration_secs())
        .filter(|duration| *duration > 0.0)
        .unwrap_or(full_duration)
        .min(max_seconds)
        .max(0.0)
}

/// Number of frames sampled for `duration_secs` at `frames_per_second`.
pub fn frame_count(duration_secs: f64, frames_per_second: f64) -> u32 {
    let frames = (duration_secs * frames_per_second + FRAME_COUNT_EPSILON).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as u32
    } else {
        0
    }
}

/// Builds the encoder payload for the current source.
pub fn build_gif_request(
    config: &WidgetConfig,
    preview: PreviewBox,
    source: &SourceUri,
    duration_secs: f64,
) -> Result<GifRequest> {
    if preview.is_empty() {
        return Err(EngineError::EmptyPreviewBox);
    }

    let request = GifRequest {
        width: (preview.width * config.export_scale).round() as u32,
        height: (preview.height * config.export_scale).round() as u32,
        source_uris: vec![source.to_string()],
        frame_count: frame_count(duration_secs, config.export_frames_per_second),
    };
    debug!(
        width = request.width,
        height = request.height,
        frame_count = request.frame_count,
        source = %source,
        "gif request built"
    );
    Ok(request)
}

/// Encoder rendering through the `ffmpeg` CLI.
///
/// Reads the fragment start from the first source URI and renders
/// `frame_count / frames_per_second` seconds of `input`.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegGifEncoder {
    input: PathBuf,
    output: PathBuf,
    frames_per_second: f64,
}

impl FfmpegGifEncoder {
    pub fn new(input: PathBuf, output: PathBuf, frames_per_second: f64) -> Self {
        Self {
            input,
            output,
            frames_per_second,
        }
    }

    fn job_for(
        &self,
        request: &GifRequest,
    ) -> std::result::Result<media_ffmpeg::GifExportRequest, EncoderError> {
        let source = request
            .source_uris
            .first()
            .ok_or_else(|| EncoderError::new("no source uri"))?;
        let uri = SourceUri::parse(source).map_err(|err| EncoderError::new(err.to_string()))?;
        let start_seconds = uri.range().map(|range| range.start_time).unwrap_or(0.0);

        Ok(media_ffmpeg::GifExportRequest {
            input: self.input.clone(),
            start_seconds,
            duration_seconds: f64::from(request.frame_count) / self.frames_per_second,
            width: request.width,
            height: request.height,
            frames_per_second: self.frames_per_second,
            output_path: self.output.clone(),
        })
    }
}

impl GifEncoder for FfmpegGifEncoder {
    async fn encode(&self, request: GifRequest) -> std::result::Result<EncodedGif, EncoderError> {
        let job = self.job_for(&request)?;
        let output = job.output_path.clone();

        tokio::task::spawn_blocking(move || media_ffmpeg::export_gif(&job))
            .await
            .map_err(|err| EncoderError::new(format!("encoder task failed: {err}")))?
            .map_err(|err| EncoderError::new(err.to_string()))?;

        Ok(EncodedGif {
            image: format!("file://{}", output.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{
        FfmpegGifEncoder, GifRequest, PreviewBox, build_gif_request, export_duration, frame_count,
    };
    use crate::config::WidgetConfig;
    use crate::error::EngineError;
    use crate::media::SourceUri;
    use crate::time::TrimWindow;

    #[test]
    fn long_window_is_capped_to_ten_seconds_and_hundred_frames() {
        let duration = export_duration(Some(TrimWindow::new(0.0, 14.0)), 60.0, 10.0);
        assert_eq!(duration, 10.0);
        assert_eq!(frame_count(duration, 10.0), 100);
    }

    #[test]
    fn three_second_window_yields_thirty_frames() {
        let duration = export_duration(Some(TrimWindow::new(0.0, 3.0)), 60.0, 10.0);
        assert_eq!(frame_count(duration, 10.0), 30);
    }

    #[test]
    fn empty_committed_window_falls_back_to_full_clip() {
        let duration = export_duration(Some(TrimWindow::new(0.0, 0.0)), 6.0, 10.0);
        assert_eq!(duration, 6.0);
        assert_eq!(frame_count(duration, 10.0), 60);
    }

    #[test]
    fn frame_count_floors_partial_frames() {
        assert_eq!(frame_count(2.57, 10.0), 25);
        assert_eq!(frame_count(0.0, 10.0), 0);
    }

    #[test]
    fn request_scales_preview_box_and_addresses_trimmed_range() {
        let source = SourceUri::new("media://4/clip.mp4").with_range(TrimWindow::new(5.0, 15.0));
        let request = build_gif_request(
            &WidgetConfig::default(),
            PreviewBox::new(320.0, 180.0),
            &source,
            10.0,
        )
        .expect("request");

        assert_eq!(
            request,
            GifRequest {
                width: 480,
                height: 270,
                source_uris: vec!["media://4/clip.mp4#t=5,15".to_string()],
                frame_count: 100,
            }
        );
    }

    #[test]
    fn empty_preview_box_is_rejected() {
        let result = build_gif_request(
            &WidgetConfig::default(),
            PreviewBox::default(),
            &SourceUri::new("media://1/a.mp4"),
            3.0,
        );
        assert!(matches!(result, Err(EngineError::EmptyPreviewBox)));
    }

    #[test]
    fn ffmpeg_job_starts_at_fragment_and_spans_frame_count() {
        let encoder = FfmpegGifEncoder::new(
            PathBuf::from("/clips/in.mp4"),
            PathBuf::from("/clips/out.gif"),
            10.0,
        );
        let job = encoder
            .job_for(&GifRequest {
                width: 480,
                height: 270,
                source_uris: vec!["media://2/in.mp4#t=2.5,20".to_string()],
                frame_count: 100,
            })
            .expect("job");

        assert_eq!(job.start_seconds, 2.5);
        assert_eq!(job.duration_seconds, 10.0);
        assert_eq!(job.input, PathBuf::from("/clips/in.mp4"));
    }

    #[test]
    fn ffmpeg_job_requires_a_source() {
        let encoder = FfmpegGifEncoder::new(PathBuf::from("in.mp4"), PathBuf::from("out.gif"), 10.0);
        let result = encoder.job_for(&GifRequest {
            width: 1,
            height: 1,
            source_uris: Vec::new(),
            frame_count: 1,
        });
        assert!(result.is_err());
    }
}
