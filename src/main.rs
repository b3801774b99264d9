use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use footfall::{
    event_log::EventLog,
    gaze::GazeGrid,
    replay::{JsonLinesRecorder, ReplayExtractor, ReplaySource},
    AggregatorConfig, FrameSink, FrameWriter, ObservationExtractor, RowSink, Session,
    SessionStats, StopSignal,
};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "footfall", about = "Time-binned audience analytics for camera sessions")]
#[command(group(ArgGroup::new("input").required(true).args(["replay", "file", "capture"])))]
struct Args {
    /// Recorded observations, one JSON line per frame
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,
    /// Video file to analyse (opencv builds)
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Camera index to capture from (opencv builds)
    #[arg(long, value_name = "ID")]
    capture: Option<i32>,
    /// Observations for --file/--capture, line N describing frame N
    #[arg(long, value_name = "PATH")]
    observations: Option<PathBuf>,
    /// CSV output; defaults to the input name with a .csv extension
    #[arg(long, value_name = "PATH")]
    rows: Option<PathBuf>,
    /// Frame recording; defaults next to the input
    #[arg(long, value_name = "PATH")]
    recording: Option<PathBuf>,
    #[arg(long, default_value_t = footfall::config::DEFAULT_BIN_DURATION_MS)]
    bin_duration_ms: u64,
    #[arg(long, default_value_t = footfall::config::DEFAULT_AGE_BUCKET_WIDTH)]
    age_bucket_width: f32,
    #[arg(long)]
    auth_key: Option<String>,
    #[arg(long)]
    headless: bool,
    #[arg(long)]
    log_json: Option<PathBuf>,
    #[arg(long, default_value_t = 1920)]
    screen_width: u32,
    #[arg(long, default_value_t = 1080)]
    screen_height: u32,
    #[arg(long, default_value_t = 640)]
    camera_width: u32,
    #[arg(long, default_value_t = 480)]
    camera_height: u32,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let config = AggregatorConfig::new(args.bin_duration_ms, args.age_bucket_width)?;
    let grid = GazeGrid::new(args.screen_width, args.screen_height)?;
    let stop = StopSignal::install().context("Failed to install the Ctrl-C handler")?;

    if let Some(replay) = args.replay.clone() {
        return run_replay(&args, &replay, config, grid, &stop);
    }
    run_capture(&args, config, grid, &stop)
}

fn run_replay(
    args: &Args,
    replay: &Path,
    config: AggregatorConfig,
    grid: GazeGrid,
    stop: &StopSignal,
) -> Result<()> {
    let mut source = ReplaySource::open(replay)?;
    let rows_path = args
        .rows
        .clone()
        .unwrap_or_else(|| replay.with_extension("csv"));
    let recording_path = args
        .recording
        .clone()
        .unwrap_or_else(|| replay.with_extension("recording.jsonl"));
    let recorder = JsonLinesRecorder::create(&recording_path)
        .with_context(|| format!("Failed to create recording {}", recording_path.display()))?;

    let session = open_session(
        args,
        config,
        grid,
        ReplayExtractor::new(),
        recorder,
        &rows_path,
        &replay.display().to_string(),
    )?;
    let stats = session.run(&mut source, |_, _| stop.requested())?;
    report(&stats, &rows_path);
    Ok(())
}

#[cfg(feature = "opencv")]
fn run_capture(args: &Args, config: AggregatorConfig, grid: GazeGrid, stop: &StopSignal) -> Result<()> {
    use footfall::video::{CaptureSource, SidecarExtractor, VideoRecorder};
    use opencv::{core, highgui, imgproc, prelude::*};

    let (mut source, stem) = match (&args.file, args.capture) {
        (Some(file), _) => (CaptureSource::open_file(file)?, file.clone()),
        (None, Some(camera)) => (
            CaptureSource::open_camera(camera, args.camera_width, args.camera_height)?,
            PathBuf::from(format!("capture-{}", camera)),
        ),
        (None, None) => bail!("Provide --replay, --file or --capture"),
    };
    let observations = args
        .observations
        .as_ref()
        .context("--observations is required with --file or --capture")?;
    let extractor = SidecarExtractor::new(ReplaySource::open(observations)?);

    let rows_path = args.rows.clone().unwrap_or_else(|| stem.with_extension("csv"));
    let recording_path = args
        .recording
        .clone()
        .unwrap_or_else(|| stem.with_extension("recording.avi"));
    let recorder = VideoRecorder::create(&recording_path, source.fps(), source.frame_size())
        .with_context(|| format!("Failed to create recording {}", recording_path.display()))?;

    let label = source.label().to_string();
    let session = open_session(args, config, grid, extractor, recorder, &rows_path, &label)?;

    let mut display_enabled = !args.headless;
    let window_name = "footfall";
    if display_enabled {
        if let Err(err) = highgui::named_window(window_name, highgui::WINDOW_NORMAL) {
            tracing::warn!("Failed to open display window: {}. Running headless.", err);
            display_enabled = false;
        }
    }

    let stats = session.run(&mut source, |frame, report| {
        if stop.requested() {
            return true;
        }
        if !display_enabled {
            return false;
        }
        let shown = frame.try_clone().and_then(|mut view| {
            let text = format!("Frame {} | People: {}", report.frame_index, report.observations);
            imgproc::put_text(
                &mut view,
                &text,
                core::Point::new(10, 24),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.6,
                core::Scalar::new(0.0, 255.0, 0.0, 0.0),
                2,
                imgproc::LINE_8,
                false,
            )?;
            highgui::imshow(window_name, &view)?;
            highgui::wait_key(1)
        });
        match shown {
            Ok(key) => key == 27 || key == 113,
            Err(err) => {
                tracing::warn!("display failed: {}", err);
                false
            }
        }
    })?;
    report(&stats, &rows_path);
    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn run_capture(
    _args: &Args,
    _config: AggregatorConfig,
    _grid: GazeGrid,
    _stop: &StopSignal,
) -> Result<()> {
    bail!("--file and --capture need a build with the `opencv` feature; use --replay instead")
}

fn open_session<E, W>(
    args: &Args,
    config: AggregatorConfig,
    grid: GazeGrid,
    extractor: E,
    recorder: W,
    rows_path: &Path,
    source_label: &str,
) -> Result<Session<E, W, File>>
where
    E: ObservationExtractor,
    W: FrameWriter<Frame = E::Frame>,
{
    let rows = RowSink::create(rows_path)
        .with_context(|| format!("Failed to open row output {}", rows_path.display()))?;
    let mut session =
        Session::new(config, extractor, rows, FrameSink::new(recorder)).with_gaze_grid(grid);
    if let Some(path) = args.log_json.as_ref() {
        let events = EventLog::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        session = session.with_event_log(events, source_label);
    }
    if let Some(key) = args.auth_key.as_deref() {
        session.authenticate(key)?;
    }
    Ok(session)
}

fn report(stats: &SessionStats, rows_path: &Path) {
    tracing::info!(
        "frames={} recorded={} people={} unique={} bins={} extraction_failures={} write_failures={}",
        stats.frames,
        stats.frames_recorded,
        stats.observations,
        stats.unique_ids,
        stats.bins_flushed,
        stats.extraction_failures,
        stats.row_write_failures + stats.frame_write_failures
    );
    tracing::info!("Wrote output to {}", rows_path.display());
}
