use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use trim_engine::{
    EncodedGif, EncoderError, EngineError, ExportPhase, GifEncoder, GifRequest, Handle,
    LocalFileRegistry, MediaResource, PreviewBox, SourceUri, TimelineWidget, TimerKind,
    TrimWindow, WidgetConfig,
};

#[derive(Debug, Clone, PartialEq)]
enum MediaCall {
    Load(String),
    Seek(f64),
    Play,
    Pause,
}

/// Player that never advances on its own and records every call.
#[derive(Debug)]
struct RecordingPlayer {
    duration: f64,
    position: f64,
    calls: Vec<MediaCall>,
}

impl RecordingPlayer {
    fn new(duration: f64) -> Self {
        Self {
            duration,
            position: 0.0,
            calls: Vec::new(),
        }
    }
}

impl MediaResource for RecordingPlayer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.position = seconds;
        self.calls.push(MediaCall::Seek(seconds));
    }

    fn play(&mut self) {
        self.calls.push(MediaCall::Play);
    }

    fn pause(&mut self) {
        self.calls.push(MediaCall::Pause);
    }

    fn load(&mut self, source: &SourceUri) {
        self.position = source.range().map(|range| range.start_time).unwrap_or(0.0);
        self.calls.push(MediaCall::Load(source.to_string()));
    }
}

/// Encoder returning a canned outcome after a simulated delay.
struct CannedEncoder {
    outcome: Result<EncodedGif, EncoderError>,
    requests: RefCell<Vec<GifRequest>>,
}

impl CannedEncoder {
    fn succeeding(image: &str) -> Self {
        Self {
            outcome: Ok(EncodedGif {
                image: image.to_string(),
            }),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            outcome: Err(EncoderError::new(message)),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl GifEncoder for CannedEncoder {
    async fn encode(&self, request: GifRequest) -> Result<EncodedGif, EncoderError> {
        self.requests.borrow_mut().push(request);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.outcome.clone()
    }
}

fn widget(duration: f64) -> TimelineWidget<RecordingPlayer, LocalFileRegistry> {
    let mut widget = TimelineWidget::new(
        WidgetConfig::default(),
        RecordingPlayer::new(duration),
        LocalFileRegistry::new(),
    )
    .expect("valid config");
    widget
        .load_source(Path::new("/clips/demo.mp4"))
        .expect("load source");
    widget
        .handle_command(trim_engine::Command::SetPreviewBox(PreviewBox::new(
            320.0, 180.0,
        )))
        .expect("preview box");
    widget
}

fn drag(
    widget: &mut TimelineWidget<RecordingPlayer, LocalFileRegistry>,
    handle: Handle,
    from: f64,
    to: f64,
) {
    widget.gesture_start(handle, from).expect("gesture start");
    widget.gesture_move(to);
    widget.gesture_end().expect("gesture end");
}

#[test]
fn quarter_track_drags_commit_five_to_fifteen_and_loop_from_start() {
    let mut widget = widget(20.0);

    drag(&mut widget, Handle::Start, 0.0, 75.0);
    drag(&mut widget, Handle::End, 300.0, 225.0);

    assert_eq!(widget.committed_window(), Some(TrimWindow::new(5.0, 15.0)));
    assert_eq!(widget.timers().count_of(TimerKind::LoopRestart), 1);
    assert!(
        widget
            .media()
            .calls
            .contains(&MediaCall::Load("media://3/demo.mp4#t=5,15".to_string()))
    );

    widget.advance_to(Duration::from_secs(10));

    let calls = &widget.media().calls;
    assert_eq!(
        calls[calls.len() - 3..],
        [MediaCall::Pause, MediaCall::Seek(5.0), MediaCall::Play]
    );
}

#[test]
fn handles_clamp_to_track_and_to_each_other() {
    let mut widget = widget(20.0);

    drag(&mut widget, Handle::End, 300.0, 900.0);
    assert_eq!(widget.view().end_offset_px, 300.0);

    drag(&mut widget, Handle::Start, 0.0, -40.0);
    assert_eq!(widget.view().start_offset_px, 0.0);

    drag(&mut widget, Handle::End, 300.0, 120.0);
    drag(&mut widget, Handle::Start, 0.0, 250.0);

    let view = widget.view();
    assert_eq!(view.start_offset_px, 120.0);
    assert_eq!(view.end_offset_px, 120.0);
    let window = widget.committed_window().expect("committed");
    assert_eq!(window.start_time, window.end_time);
}

#[test]
fn indicator_reports_half_track_at_half_duration() {
    let mut widget = widget(20.0);
    drag(&mut widget, Handle::Start, 0.0, 150.0);

    widget.advance_to(Duration::from_millis(100));

    assert_eq!(widget.view().current_offset_px, 150.0);
}

#[tokio::test(start_paused = true)]
async fn export_caps_long_window_to_hundred_frames() {
    let mut widget = widget(30.0);
    drag(&mut widget, Handle::End, 300.0, 140.0);
    let encoder = CannedEncoder::succeeding("file:///tmp/out.gif");

    let gif = widget.export(&encoder).await.expect("export");

    assert_eq!(gif.image, "file:///tmp/out.gif");
    let requests = encoder.requests.borrow();
    assert_eq!(requests[0].frame_count, 100);
    assert_eq!((requests[0].width, requests[0].height), (480, 270));
    assert_eq!(
        widget.view().phase,
        ExportPhase::Complete {
            image: "file:///tmp/out.gif".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn export_of_three_second_window_samples_thirty_frames() {
    let mut widget = widget(30.0);
    drag(&mut widget, Handle::End, 300.0, 30.0);
    let encoder = CannedEncoder::succeeding("data:image/gif;base64,R0lG");

    widget.export(&encoder).await.expect("export");

    assert_eq!(encoder.requests.borrow()[0].frame_count, 30);
}

#[tokio::test(start_paused = true)]
async fn failed_export_keeps_visible_state() {
    let mut widget = widget(8.0);
    let before = widget.view();
    let encoder = CannedEncoder::failing("encoder unavailable");

    let result = widget.export(&encoder).await;

    assert!(matches!(result, Err(EngineError::Encoder(_))));
    assert_eq!(widget.view(), before);
}
