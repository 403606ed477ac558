use anyhow::{Context, Result};
use bump_heatmap::heatmap::{HeatmapFrame, WebMercatorProjection};
use bump_heatmap::live_status::LiveStatus;
use bump_heatmap::sensors::{self, SensorAvailability, SensorListener, DEFAULT_SAMPLE_PERIOD};
use bump_heatmap::types::current_timestamp;
use bump_heatmap::{BumpConfig, BumpMapper, LocationFix, SensorSample, TokioTimer};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval, sleep, Duration};

#[cfg(feature = "rerun")]
use bump_heatmap::rerun_logger::RerunLogger;

/// Fastest location update rate accepted from the command line.
const MIN_LOCATION_INTERVAL_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "bump_tracker")]
#[command(about = "Road bump heatmap recorder", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// JSON config file; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "bump_sessions")]
    output_dir: String,

    /// Heatmap circle radius in pixels
    #[arg(long)]
    radius: Option<f64>,

    /// Heatmap opacity in [0, 1]
    #[arg(long)]
    opacity: Option<f32>,

    /// Run without the gyroscope
    #[arg(long)]
    no_gyro: bool,

    /// Run without the accelerometer
    #[arg(long)]
    no_accel: bool,

    /// Map zoom level used for the rendered viewport
    #[arg(long, default_value = "16")]
    zoom: f64,

    /// Viewport width in pixels
    #[arg(long, default_value = "1080")]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "1920")]
    height: f64,

    /// Location update interval in milliseconds (minimum 1000)
    #[arg(long, default_value = "2000")]
    location_interval_ms: u64,

    /// Latitude the synthetic drive starts from
    #[arg(long, default_value = "37.5665", allow_negative_numbers = true)]
    start_lat: f64,

    /// Longitude the synthetic drive starts from
    #[arg(long, default_value = "126.9780", allow_negative_numbers = true)]
    start_lon: f64,

    /// Record scores and frames to a Rerun .rrd file in the output directory
    #[cfg(feature = "rerun")]
    #[arg(long)]
    rerun: bool,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    timestamp: f64,
    center: (f64, f64),
    zoom: f64,
    frame: &'a HeatmapFrame,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BumpConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BumpConfig::default(),
    };
    if let Some(radius) = args.radius {
        config.heatmap.radius = radius;
    }
    if let Some(opacity) = args.opacity {
        config.heatmap.opacity = opacity;
    }
    config.validate()?;

    info!("Bump tracker starting");
    info!("  Duration: {} seconds (0=continuous)", args.duration);
    info!("  Output Dir: {}", args.output_dir);
    info!(
        "  Heatmap: radius {} px, opacity {}, budget {}",
        config.heatmap.radius, config.heatmap.opacity, config.heatmap.render_budget
    );

    std::fs::create_dir_all(&args.output_dir)?;
    let output_dir = Path::new(&args.output_dir);

    #[cfg(feature = "rerun")]
    let rerun = if args.rerun {
        let path = output_dir.join(format!("bumps_{}.rrd", ts_now_clean()));
        Some(RerunLogger::new(&path.to_string_lossy())?)
    } else {
        None
    };

    let repaint = Arc::new(Notify::new());
    let hook = Arc::clone(&repaint);
    let mapper = BumpMapper::new(config, Arc::new(TokioTimer::current()), move || {
        hook.notify_one()
    })?;

    let (sample_tx, mut sample_rx) = mpsc::channel::<SensorSample>(500);
    let (fix_tx, mut fix_rx) = mpsc::channel::<LocationFix>(16);

    let mut listener = SensorListener::new(
        SensorAvailability {
            accelerometer: !args.no_accel,
            gyroscope: !args.no_gyro,
        },
        DEFAULT_SAMPLE_PERIOD,
    );
    let availability = listener.start(sample_tx)?;

    let location_period =
        Duration::from_millis(args.location_interval_ms.max(MIN_LOCATION_INTERVAL_MS));
    let location_task = tokio::spawn(sensors::location_loop(
        fix_tx,
        location_period,
        (args.start_lat, args.start_lon),
    ));

    let mut projection = WebMercatorProjection::new(
        args.start_lat,
        args.start_lon,
        args.zoom,
        args.width,
        args.height,
    );

    let mut status = LiveStatus::new();
    status.accel_available = availability.accelerometer;
    status.gyro_available = availability.gyroscope;
    status.store_capacity = mapper.store().capacity();

    let mut status_ticker = interval(Duration::from_secs(2));
    let run_for = args.duration;
    let deadline = async move {
        if run_for > 0 {
            sleep(Duration::from_secs(run_for)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);

    let start = Utc::now();
    let frame_path = output_dir.join("heatmap_frame.json");
    let status_path = output_dir.join("live_status.json");

    info!("Starting data collection...");

    loop {
        tokio::select! {
            Some(sample) = sample_rx.recv() => {
                mapper.on_sample(&sample);
            }
            Some(fix) = fix_rx.recv() => {
                let report = mapper.on_location(&fix);
                if report.first_point {
                    if let Some(point) = report.stored_point() {
                        projection.recenter(point.latitude, point.longitude);
                        info!("First bump, centring map on ({:.6}, {:.6})", point.latitude, point.longitude);
                    }
                }
                #[cfg(feature = "rerun")]
                if let Some(rec) = &rerun {
                    rec.set_time(elapsed_secs(start));
                    rec.log_tick(&report);
                }
            }
            _ = repaint.notified() => {
                let frame = mapper.render(&projection.screen_rect(), &projection);
                status.frames_rendered += 1;
                status.last_frame_visible = frame.visible;
                status.last_frame_commands = frame.len();
                #[cfg(feature = "rerun")]
                if let Some(rec) = &rerun {
                    rec.set_time(elapsed_secs(start));
                    rec.log_frame(&frame, mapper.store().len());
                }
                if let Err(e) = save_frame(&frame, &projection, &frame_path) {
                    warn!("Failed to write heatmap frame: {:#}", e);
                }
            }
            _ = status_ticker.tick() => {
                update_status(&mut status, &mapper, start);
                let _ = status.save(&status_path);
            }
            _ = &mut deadline => {
                info!("Duration reached, stopping...");
                break;
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping...");
                break;
            }
        }
    }

    listener.stop();
    location_task.abort();
    mapper.pause();

    // Final frame regardless of any repaint that was still pending
    let frame = mapper.render(&projection.screen_rect(), &projection);
    let final_frame_path = output_dir.join(format!("heatmap_frame_{}_final.json", ts_now_clean()));
    save_frame(&frame, &projection, &final_frame_path)?;

    status.last_frame_visible = frame.visible;
    status.last_frame_commands = frame.len();
    update_status(&mut status, &mapper, start);
    let _ = status.save(output_dir.join("live_status_final.json"));

    let stats = mapper.stats();
    info!("=== Final Stats ===");
    info!("Samples: {} accel, {} gyro", stats.accel_samples, stats.gyro_samples);
    info!(
        "Location ticks: {} ({} stored, {} below threshold, {} inaccurate)",
        stats.location_ticks, stats.points_stored, stats.below_threshold, stats.inaccurate_fixes
    );
    info!(
        "Final frame: {} of {} points visible, {} drawn -> {}",
        frame.visible,
        mapper.store().len(),
        frame.len(),
        final_frame_path.display()
    );

    Ok(())
}

fn update_status(status: &mut LiveStatus, mapper: &BumpMapper, start: chrono::DateTime<Utc>) {
    status.timestamp = current_timestamp();
    status.uptime_seconds = Utc::now().signed_duration_since(start).num_seconds().max(0) as u64;
    status.apply_stats(&mapper.stats());
    status.store_len = mapper.store().len();
    status.set_repaint_state(mapper.scheduler().state());
}

fn save_frame(frame: &HeatmapFrame, projection: &WebMercatorProjection, path: &Path) -> Result<()> {
    let output = FrameOutput {
        timestamp: current_timestamp(),
        center: projection.center(),
        zoom: projection.zoom(),
        frame,
    };
    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(feature = "rerun")]
fn elapsed_secs(start: chrono::DateTime<Utc>) -> f64 {
    Utc::now().signed_duration_since(start).num_milliseconds() as f64 / 1000.0
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
