//! Headless front end: loads a clip, trims it, lets the loop run and
//! optionally exports a GIF. Widget events are printed as JSON lines.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trim_engine::driver;
use trim_engine::{
    Command, EngineError, Event, FfmpegGifEncoder, Handle, LocalFileRegistry, PreviewBox,
    SimulatedPlayer, TimelineWidget, WidgetConfig, time_to_pixel,
};

const USAGE: &str = "\
usage: gif-trim [options] <input>

options:
  --config <file>      widget config (TOML)
  --start <seconds>    trim start
  --end <seconds>      trim end
  --run-for <seconds>  playback time before closing (default 5)
  --export <file.gif>  render the trimmed range into a GIF
";

const DEFAULT_RUN_FOR_SECONDS: f64 = 5.0;

#[derive(Debug)]
enum Invocation {
    Help,
    Run(CliArgs),
}

#[derive(Debug)]
struct CliArgs {
    config: Option<PathBuf>,
    start: Option<f64>,
    end: Option<f64>,
    run_for: f64,
    export: Option<PathBuf>,
    input: PathBuf,
}

#[derive(Debug)]
enum CliError {
    Args(pico_args::Error),
    Usage(&'static str),
    Engine(EngineError),
    Media(media_ffmpeg::MediaFfmpegError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Widget(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Args(err) => write!(f, "{err}"),
            Self::Usage(reason) => write!(f, "{reason}"),
            Self::Engine(err) => write!(f, "{err}"),
            Self::Media(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "runtime: {err}"),
            Self::Json(err) => write!(f, "event encoding: {err}"),
            Self::Widget(message) => write!(f, "widget: {message}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<pico_args::Error> for CliError {
    fn from(value: pico_args::Error) -> Self {
        Self::Args(value)
    }
}

impl From<EngineError> for CliError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<media_ffmpeg::MediaFfmpegError> for CliError {
    fn from(value: media_ffmpeg::MediaFfmpegError) -> Self {
        Self::Media(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args(pico_args::Arguments::from_env()) {
        Ok(Invocation::Help) => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Run(args)) => args,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "gif-trim failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_args(mut args: pico_args::Arguments) -> Result<Invocation, CliError> {
    if args.contains(["-h", "--help"]) {
        return Ok(Invocation::Help);
    }

    let parsed = CliArgs {
        config: args.opt_value_from_str("--config")?,
        start: args.opt_value_from_str("--start")?,
        end: args.opt_value_from_str("--end")?,
        run_for: args
            .opt_value_from_str("--run-for")?
            .unwrap_or(DEFAULT_RUN_FOR_SECONDS),
        export: args.opt_value_from_str("--export")?,
        input: args.free_from_str()?,
    };
    if !args.finish().is_empty() {
        return Err(CliError::Usage("unexpected arguments"));
    }
    if !parsed.run_for.is_finite() || parsed.run_for < 0.0 {
        return Err(CliError::Usage("--run-for must be a non-negative number"));
    }
    if [parsed.start, parsed.end]
        .into_iter()
        .flatten()
        .any(|seconds| !seconds.is_finite() || seconds < 0.0)
    {
        return Err(CliError::Usage("--start and --end must be non-negative numbers"));
    }
    Ok(Invocation::Run(parsed))
}

fn run(args: CliArgs) -> Result<(), CliError> {
    let config = match args.config.as_deref() {
        Some(path) => WidgetConfig::load_from_path(path)?,
        None => WidgetConfig::default(),
    };
    let info = media_ffmpeg::probe_video(&args.input)?;
    info!(
        input = ?info.path,
        width = info.width,
        height = info.height,
        duration = info.duration_seconds,
        "input probed"
    );

    let commands = script(&args, &config, &info);
    let encoder = FfmpegGifEncoder::new(
        args.input.clone(),
        args.export
            .clone()
            .unwrap_or_else(|| args.input.with_extension("gif")),
        config.export_frames_per_second,
    );
    let mut widget = TimelineWidget::new(
        config,
        SimulatedPlayer::new(info.duration_seconds),
        LocalFileRegistry::new(),
    )?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let ((command_tx, command_rx), (event_tx, mut event_rx)) = driver::channels();
        let exporting = args.export.is_some();
        let run_for = Duration::from_secs_f64(args.run_for);

        let front_end = async move {
            for command in commands {
                if command_tx.send(command).await.is_err() {
                    return Err(CliError::Widget("driver stopped".to_string()));
                }
            }

            let linger = tokio::time::sleep(run_for);
            tokio::pin!(linger);
            let mut export_done = !exporting;
            let mut outcome = Ok(());

            loop {
                tokio::select! {
                    event = event_rx.recv() => {
                        let Some(event) = event else { break };
                        println!("{}", serde_json::to_string(&event)?);
                        match event {
                            Event::ExportFinished { .. } => export_done = true,
                            Event::ExportFailed { message } => {
                                outcome = Err(CliError::Widget(message));
                                break;
                            }
                            Event::Error(err) => {
                                outcome = Err(CliError::Widget(err.message));
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = &mut linger, if export_done => break,
                }
            }

            // Close, then drain whatever the driver still has to say.
            let _ = command_tx.send(Command::Close).await;
            drop(command_tx);
            while let Some(event) = event_rx.recv().await {
                println!("{}", serde_json::to_string(&event)?);
            }
            outcome
        };

        let ((), outcome) = tokio::join!(
            driver::run(&mut widget, &encoder, command_rx, event_tx),
            front_end
        );
        outcome
    })
}

/// Commands reproducing the requested trim as pointer gestures.
fn script(args: &CliArgs, config: &WidgetConfig, info: &media_ffmpeg::VideoInfo) -> Vec<Command> {
    let width = config.track_width_px;
    let duration = info.duration_seconds;
    let mut commands = vec![
        Command::LoadSource {
            path: args.input.clone(),
        },
        Command::SetPreviewBox(PreviewBox::new(
            f64::from(info.width),
            f64::from(info.height),
        )),
    ];

    if let Some(start) = args.start {
        commands.extend(drag(Handle::Start, 0.0, time_to_pixel(start, width, duration)));
    }
    if let Some(end) = args.end {
        commands.extend(drag(Handle::End, width, time_to_pixel(end, width, duration)));
    }
    if args.export.is_some() {
        commands.push(Command::Export);
    }
    commands
}

fn drag(handle: Handle, from: f64, to: f64) -> [Command; 3] {
    [
        Command::GestureStart { handle, x: from },
        Command::GestureMove { x: to },
        Command::GestureEnd,
    ]
}
