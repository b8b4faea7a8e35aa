use clap::Parser;
use flight_replay::config::Config;
use flight_replay::{
    CommandConsole, DecodedLog, FrameAnimator, FrameRenderer, LogSampleStore, MemoryCanvas,
    PlaybackController, ReplayError, RerunCanvas, RigidBodyModel,
};
use flight_replay::render::pace;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const DEFAULT_CONFIG: &str = "config/replay.yaml";

#[derive(Parser, Debug)]
#[command(name = "flight_replay")]
#[command(about = "Replay a flight log as an animated 3D wireframe")]
#[command(version)]
struct Args {
    /// CSV export of the flight log
    log: PathBuf,
    /// YAML configuration [default: config/replay.yaml if present]
    #[arg(short, long)]
    config: Option<String>,
    /// Run one pass through the log without the viewer
    #[arg(long)]
    headless: bool,
}

fn load_config(path: Option<&str>) -> Result<Config, ReplayError> {
    match path {
        Some(path) => Config::from_yaml(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_yaml(DEFAULT_CONFIG),
        None => {
            log::info!("No configuration found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Main function to replay a flight log
fn main() -> Result<(), ReplayError> {
    env_logger::builder()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let decoded = DecodedLog::from_path(&args.log)?;
    let store = Arc::new(LogSampleStore::build(
        &decoded.rows,
        &decoded.column_index(),
        &config.log.fields,
        config.log.stride,
    )?);
    let playback_len = store.playback_len();
    let controller = Arc::new(match config.playback.loop_threshold {
        Some(threshold) => PlaybackController::with_loop_threshold(playback_len, threshold),
        None => PlaybackController::new(playback_len),
    });
    let renderer = FrameRenderer::new(
        Arc::clone(&store),
        RigidBodyModel::from_config(&config.render.model)?,
    )
    .with_z_sign(config.render.z_sign)
    .with_window(config.render.window_mode, config.render.window_span);
    let console = CommandConsole::new(
        Arc::clone(&controller),
        Arc::clone(&store),
        config.log.time_scale,
        config.playback.rtf_window(),
    );
    thread::spawn(move || {
        if let Err(e) = console.run(io::stdin().lock(), io::stdout()) {
            log::error!("Command loop failed: {}", e);
        }
    });

    let interval = config.playback.tick_interval();
    let mut animator = FrameAnimator::new(&renderer);
    if args.headless {
        let frames =
            animator.run_pass(&controller, &renderer, &mut MemoryCanvas::default(), interval)?;
        log::info!("Headless replay rendered {} frames", frames.len());
        return Ok(());
    }

    let rec = rerun::RecordingStreamBuilder::new("flight_replay").spawn()?;
    let mut canvas = RerunCanvas::new(rec);
    let start_time = store.samples().first().map_or(0.0, |s| s.time);
    for tick in 0i64.. {
        let tick_start = Instant::now();
        canvas.set_tick(tick);
        let geometry = animator.on_tick(&controller, &renderer, &mut canvas)?;
        let sample = &store.samples()[geometry.sample_index];
        canvas.set_log_time((sample.time - start_time) / config.log.time_scale);
        canvas.log_sample_telemetry(sample)?;
        pace(tick_start, interval);
    }
    Ok(())
}
