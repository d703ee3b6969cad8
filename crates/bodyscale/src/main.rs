//! bodyscale: estimate torso widths from a segmentation mask and a
//! skeleton scene.
//!
//! Reads a person segmentation mask image and a JSON scene describing the
//! viewport, camera, and skeleton, runs one estimation pass, and prints
//! either a human-readable report or the full result as JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin bodyscale -- [OPTIONS] --scene <SCENE> <MASK_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` to see per-joint progress.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bodyscale_core::diagnostics::{self, ScanTrace};
use bodyscale_core::{
    EstimationResult, EstimatorConfig, JointName, PinholeCamera, ScaleEstimator,
    SegmentationMask, Size, Skeleton,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Torso scale estimation from a segmentation mask and a skeleton.
///
/// Finds the silhouette edges to either side of each joint, converts the
/// pixel widths to world units using the known distance between two
/// reference joints, and cross-checks the root width by unprojection.
#[derive(Parser)]
#[command(name = "bodyscale", version)]
struct Cli {
    /// Path to the segmentation mask (PNG, JPEG, BMP, WebP). Body pixels
    /// are white.
    mask_path: PathBuf,

    /// Path to the scene JSON: `{ "viewport", "camera", "skeleton" }`.
    #[arg(long)]
    scene: PathBuf,

    /// Joint to measure (raw name, e.g. `spine_4_joint`). Repeatable.
    /// Defaults to the root and spine joints.
    #[arg(long = "joint")]
    joints: Vec<JointName>,

    /// Per-channel tolerance when matching the foreground colour.
    #[arg(long, default_value_t = EstimatorConfig::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Output the result as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Also output every classified scan-line sample.
    #[arg(long)]
    trace: bool,

    /// Full estimator config as a JSON string.
    ///
    /// When provided, `--joint` and `--tolerance` are ignored. The JSON
    /// must be a valid `EstimatorConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Everything the estimator needs besides the mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Scene {
    viewport: Size,
    camera: PinholeCamera,
    skeleton: Skeleton,
}

/// JSON output: the result, plus traces when requested.
#[derive(Serialize)]
struct Output<'a> {
    result: &'a EstimationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    traces: Option<&'a [ScanTrace]>,
}

/// Build an [`EstimatorConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EstimatorConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = EstimatorConfig::default();
    if !cli.joints.is_empty() {
        config.joints.clone_from(&cli.joints);
    }
    config.foreground.tolerance = cli.tolerance;
    Ok(config)
}

fn read_scene(path: &Path) -> Result<Scene, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing scene {}: {e}", path.display()))
}

fn read_mask(path: &Path) -> Result<SegmentationMask, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    log::info!("Mask: {} ({} bytes)", path.display(), bytes.len());
    SegmentationMask::decode(&bytes).map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    let estimator = ScaleEstimator::new(config).map_err(|e| e.to_string())?;
    log::info!("Config: {:?}", estimator.config());

    let mask = read_mask(&cli.mask_path)?;
    let scene = read_scene(&cli.scene)?;
    log::info!(
        "Scene: {} joints, viewport {}x{}",
        scene.skeleton.joints.len(),
        scene.viewport.width,
        scene.viewport.height,
    );

    let snapshot = estimator.capture(&scene.skeleton, &scene.camera, scene.viewport);
    let result = estimator
        .estimate(&snapshot, &mask, &scene.camera)
        .map_err(|e| format!("Estimation error: {e}"))?;

    let traces = if cli.trace {
        Some(
            diagnostics::trace_scan_lines(&snapshot, &mask, estimator.config())
                .map_err(|e| format!("Trace error: {e}"))?,
        )
    } else {
        None
    };

    if cli.json {
        let output = Output {
            result: &result,
            traces: traces.as_deref(),
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| format!("Error serializing result: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", result.report());
        if let Some(traces) = &traces {
            for trace in traces {
                log::info!(
                    "{} {}: {} samples, {} body",
                    trace.joint,
                    trace.direction,
                    trace.samples.len(),
                    trace.body_count(),
                );
            }
            let json = serde_json::to_string_pretty(traces)
                .map_err(|e| format!("Error serializing traces: {e}"))?;
            println!();
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
