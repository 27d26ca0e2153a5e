//! Hedgehog CLI - batch runs of the field localizer against the simulator.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hedgehog_core::{FieldBounds, FieldMap, PosePacket, PublishedPose, SingleMarkerFallback};
use hedgehog_sim::{
    camera, characterize_run, generate_frames, simulate, simulate_path, MarkerCountStats, SimConfig, SimRun,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use zerocopy::IntoBytes;

/// Public function that can be called from the main binary
pub fn run_cli_main(args: &[&str]) -> Result<()> {
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        // --help and --version land here too
        Err(e) if !e.use_stderr() => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    main_inner(args)
}

#[derive(Parser, Debug)]
#[command(name = "hedgehog-cli")]
#[command(about = "Fiducial field localization against a simulated robot")]
#[command(version)]
pub struct Args {
    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Output file format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Run a single simulation
    #[arg(long)]
    single: bool,

    /// Score estimates by the number of markers behind them
    #[arg(long)]
    characterize: bool,

    /// Also write the per-frame wire packets (single run only)
    #[arg(long)]
    packets: bool,

    // ── Inputs ────────────────────────────────────────────────
    /// JSON simulation config; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON field layout; defaults to the built-in field
    #[arg(long)]
    field: Option<PathBuf>,

    // ── Overrides ─────────────────────────────────────────────
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    noise_scale: Option<f64>,

    #[arg(long)]
    duration: Option<f64>,

    #[arg(long)]
    speed: Option<f64>,

    /// Run without an odometry prior
    #[arg(long)]
    no_odometry: bool,

    /// Rule for a lone marker with no prior
    #[arg(long, value_enum)]
    fallback: Option<FallbackArg>,

    // ── Sweep options ──────────────────────────────────────────
    #[arg(long, default_value_t = 5)]
    sweep_steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum FallbackArg {
    SignOfY,
    Primary,
    Secondary,
}

impl From<FallbackArg> for SingleMarkerFallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::SignOfY => SingleMarkerFallback::default(),
            FallbackArg::Primary => SingleMarkerFallback::Primary,
            FallbackArg::Secondary => SingleMarkerFallback::Secondary,
        }
    }
}

fn main_inner(args: Args) -> Result<()> {
    println!("Hedgehog Field Localizer");
    println!("========================\n");

    let config = build_sim_config(&args)?;
    let field = load_field(args.field.as_deref())?;

    if args.single {
        run_single(&args, &config, &field)?;
    } else if args.characterize {
        run_characterize(&args, &config, &field)?;
    } else {
        run_sweep(&args, &config, &field)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Single Run
// ---------------------------------------------------------------------------
fn run_single(args: &Args, config: &SimConfig, field: &FieldMap) -> Result<()> {
    println!("Running single simulation...");

    let run = simulate(config, field);
    print_run_stats(&run);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let rows = frame_rows(&run);
    let path = match args.format {
        OutputFormat::Csv => {
            let path = args.output_dir.join("frames.csv");
            write_frames_csv(&path, &rows)?;
            path
        }
        OutputFormat::Json => {
            let path = args.output_dir.join("frames.json");
            let doc = serde_json::json!({
                "config": config,
                "stats": run.stats,
                "frames": rows,
            });
            std::fs::write(&path, serde_json::to_string_pretty(&doc)?)
                .with_context(|| format!("writing {}", path.display()))?;
            path
        }
    };
    println!("Data written to {:?}", path);

    if args.packets {
        let path = args.output_dir.join("frames.bin");
        let bytes: Vec<u8> = run
            .result
            .estimate
            .iter()
            .flat_map(|estimate| PosePacket::from_aggregate(estimate).as_bytes().to_vec())
            .collect();
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        println!("Packets written to {:?}", path);
    }

    Ok(())
}

/// One output row per simulated frame.
#[derive(Debug, Clone, Serialize)]
struct FrameRow {
    time: f64,
    true_x: f64,
    true_y: f64,
    true_yaw: f64,
    est_x: Option<f64>,
    est_y: Option<f64>,
    est_z: Option<f64>,
    est_yaw: Option<f64>,
    dispersion: f64,
    markers: usize,
    detections: usize,
    strategy: &'static str,
    error: Option<f64>,
    /// Whether the estimate would pass the publishing gate.
    published: bool,
}

fn frame_rows(run: &SimRun) -> Vec<FrameRow> {
    let r = &run.result;
    (0..r.len())
        .map(|i| {
            let truth = r.truth[i];
            let estimate = &r.estimate[i];
            let est = estimate.has_estimate().then_some(estimate.pose);
            FrameRow {
                time: r.time[i],
                true_x: truth.translation.x,
                true_y: truth.translation.y,
                true_yaw: truth.rotation.yaw_degrees(),
                est_x: est.map(|p| p.translation.x),
                est_y: est.map(|p| p.translation.y),
                est_z: est.map(|p| p.translation.z),
                est_yaw: est.map(|p| p.rotation.yaw_degrees()),
                dispersion: estimate.dispersion.scalar(),
                markers: estimate.sample_count(),
                detections: r.detections[i],
                strategy: r.strategy[i].label(),
                error: r.position_error(i),
                published: PublishedPose::from_aggregate("vision", estimate, &FieldBounds::DEFAULT).is_some(),
            }
        })
        .collect()
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

fn write_frames_csv(path: &Path, rows: &[FrameRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    wtr.write_record([
        "time",
        // Truth
        "true_x",
        "true_y",
        "true_yaw",
        // Estimate (blank when nothing was seen)
        "est_x",
        "est_y",
        "est_z",
        "est_yaw",
        "dispersion",
        "markers",
        "detections",
        "strategy",
        "error",
        "published",
    ])?;
    for row in rows {
        wtr.write_record(&[
            format!("{:.4}", row.time),
            format!("{:.4}", row.true_x),
            format!("{:.4}", row.true_y),
            format!("{:.2}", row.true_yaw),
            fmt_opt(row.est_x),
            fmt_opt(row.est_y),
            fmt_opt(row.est_z),
            row.est_yaw.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            format!("{:.4}", row.dispersion),
            row.markers.to_string(),
            row.detections.to_string(),
            row.strategy.to_string(),
            fmt_opt(row.error),
            row.published.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Characterization
// ---------------------------------------------------------------------------
fn run_characterize(args: &Args, config: &SimConfig, field: &FieldMap) -> Result<()> {
    println!("Characterizing error by marker count...");

    let path = simulate_path(&config.path);
    let frames = generate_frames(&path, field, &config.camera, &config.odometry);
    let stats = characterize_run(&path, &frames, &config.localizer(field.clone()));

    for s in &stats {
        println!(
            "  {} marker(s): {:>6} samples | RMSE {:.4} m | max {:.4} m",
            s.markers, s.samples, s.rmse, s.max_error
        );
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let out = match args.format {
        OutputFormat::Csv => {
            let out = args.output_dir.join("characterize.csv");
            write_characterize_csv(&out, &stats)?;
            out
        }
        OutputFormat::Json => {
            let out = args.output_dir.join("characterize.json");
            std::fs::write(&out, serde_json::to_string_pretty(&stats)?)
                .with_context(|| format!("writing {}", out.display()))?;
            out
        }
    };
    println!("\nCharacterization written to {:?}", out);
    Ok(())
}

fn write_characterize_csv(path: &Path, stats: &[MarkerCountStats]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    wtr.write_record(["markers", "samples", "rmse", "max_error"])?;
    for s in stats {
        wtr.write_record(&[
            s.markers.to_string(),
            s.samples.to_string(),
            format!("{:.6}", s.rmse),
            format!("{:.6}", s.max_error),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sweep Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct SweepRow {
    noise_scale: f64,
    rmse: f64,
    max_error: f64,
    availability: f64,
    outliers: usize,
}

fn run_sweep(args: &Args, config: &SimConfig, field: &FieldMap) -> Result<()> {
    let values = camera::NOISE_SCALE.sweep(args.sweep_steps);
    println!("Sweeping noise_scale over {} values", values.len());

    let mut rows = Vec::with_capacity(values.len());
    for (i, &noise_scale) in values.iter().enumerate() {
        let mut cfg = *config;
        cfg.camera.noise_scale = noise_scale;
        let run = simulate(&cfg, field);
        println!(
            "Run {}/{} | Noise: {:.2} -> RMSE: {:.4} m, availability {:.0}%",
            i + 1,
            values.len(),
            noise_scale,
            run.stats.rmse,
            run.stats.availability * 100.0
        );
        rows.push(SweepRow {
            noise_scale,
            rmse: run.stats.rmse,
            max_error: run.stats.max_error,
            availability: run.stats.availability,
            outliers: run.stats.outliers,
        });
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let path = match args.format {
        OutputFormat::Csv => {
            let path = args.output_dir.join("sweep_summary.csv");
            let mut wtr = csv::Writer::from_path(&path).with_context(|| format!("opening {}", path.display()))?;
            wtr.write_record(["noise_scale", "rmse", "max_error", "availability", "outliers"])?;
            for row in &rows {
                wtr.write_record(&[
                    format!("{:.2}", row.noise_scale),
                    format!("{:.4}", row.rmse),
                    format!("{:.4}", row.max_error),
                    format!("{:.4}", row.availability),
                    row.outliers.to_string(),
                ])?;
            }
            wtr.flush()?;
            path
        }
        OutputFormat::Json => {
            let path = args.output_dir.join("sweep_summary.json");
            std::fs::write(&path, serde_json::to_string_pretty(&rows)?)
                .with_context(|| format!("writing {}", path.display()))?;
            path
        }
    };

    println!("\nSweep complete. Summary at {:?}", path);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reads a JSON simulation config. Missing fields, or a missing path, keep
/// the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let mut config: SimConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    config.path = config.path.bounded();
    Ok(config)
}

fn build_sim_config(args: &Args) -> Result<SimConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.camera.seed = seed;
    }
    if let Some(noise_scale) = args.noise_scale {
        config.camera.noise_scale = camera::NOISE_SCALE.clamp(noise_scale);
    }
    if let Some(duration) = args.duration {
        config.path.duration = duration;
    }
    if let Some(speed) = args.speed {
        config.path.speed = speed;
    }
    if args.no_odometry {
        config.odometry.enabled = false;
    }
    if let Some(fallback) = args.fallback {
        config.tuning.fallback = fallback.into();
    }
    config.path = config.path.bounded();
    Ok(config)
}

/// Reads a JSON field layout, or the built-in field when no path is given.
pub fn load_field(path: Option<&Path>) -> Result<FieldMap> {
    let Some(path) = path else {
        return Ok(FieldMap::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading field {}", path.display()))?;
    let field = FieldMap::from_json(&text).with_context(|| format!("loading field {}", path.display()))?;
    info!(markers = field.markers().count(), "custom field layout loaded");
    Ok(field)
}

fn print_run_stats(run: &SimRun) {
    let s = &run.stats;
    println!("\nRun Stats:");
    println!("  Frames:       {}", s.frames);
    println!("  Availability: {:.1} %", s.availability * 100.0);
    println!("  RMSE:         {:.4} m", s.rmse);
    println!("  Max Error:    {:.4} m", s.max_error);
    println!("  Yaw RMSE:     {:.2} °", s.rmse_yaw_degrees);
    println!("  Outliers:     {}", s.outliers);
    println!("-----------------------------");
}
