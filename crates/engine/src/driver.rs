//! Binds a [`TimelineWidget`] to wall-clock time.
//!
//! Commands, timer deadlines and the encoder of an export in flight are all
//! awaited in one `tokio::select!` loop, so the widget is only ever touched
//! from a single task.

use std::future::Future;
use std::pin::Pin;

use futures_util::future::OptionFuture;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::api::{Command, EngineErrorEvent, Event, TimelineWidget};
use crate::export::{EncodedGif, EncoderError, GifEncoder};
use crate::media::{MediaResource, SourceRegistry};

pub const COMMAND_CHANNEL_CAPACITY: usize = 32;
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

type EncodeFuture<'e> =
    Pin<Box<dyn Future<Output = std::result::Result<EncodedGif, EncoderError>> + 'e>>;

/// Runs `widget` until the command channel closes or the event receiver is
/// dropped.
///
/// Command failures are reported as [`Event::Error`] and do not stop the
/// loop.
pub async fn run<'e, M, R, E>(
    widget: &mut TimelineWidget<M, R>,
    encoder: &'e E,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
) where
    M: MediaResource,
    R: SourceRegistry,
    E: GifEncoder,
{
    let origin = Instant::now();
    let mut encoding: Option<EncodeFuture<'e>> = None;

    loop {
        let wake_at = widget.next_deadline().map(|deadline| origin + deadline);

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("command channel closed");
                    break;
                };

                if !forward(&events, widget.advance_to(origin.elapsed())).await {
                    break;
                }

                let produced = match widget.handle_command(command) {
                    Ok(produced) => produced,
                    Err(error) => {
                        warn!(%error, "command failed");
                        vec![Event::Error(EngineErrorEvent::from_error(&error))]
                    }
                };
                for event in &produced {
                    if let Event::ExportStarted { request } = event {
                        encoding = Some(Box::pin(encoder.encode(request.clone())));
                    }
                }
                if !forward(&events, produced).await {
                    break;
                }
            }
            Some(()) = OptionFuture::from(wake_at.map(sleep_until)) => {
                if !forward(&events, widget.advance_to(origin.elapsed())).await {
                    break;
                }
            }
            Some(outcome) = OptionFuture::from(encoding.as_mut()) => {
                encoding = None;
                let produced = match widget.finish_export(outcome) {
                    Ok(produced) => produced,
                    Err(error) => vec![Event::ExportFailed {
                        message: error.to_string(),
                    }],
                };
                if !forward(&events, produced).await {
                    break;
                }
            }
        }
    }
}

/// Command and event channels a front end hands to [`run`].
pub fn channels() -> (
    (mpsc::Sender<Command>, mpsc::Receiver<Command>),
    (mpsc::Sender<Event>, mpsc::Receiver<Event>),
) {
    (
        mpsc::channel(COMMAND_CHANNEL_CAPACITY),
        mpsc::channel(EVENT_CHANNEL_CAPACITY),
    )
}

async fn forward(events: &mpsc::Sender<Event>, produced: Vec<Event>) -> bool {
    for event in produced {
        if events.send(event).await.is_err() {
            debug!("event receiver dropped");
            return false;
        }
    }
    true
}
