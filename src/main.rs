// src/main.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pose_events::analysis::PoseFrame;
use pose_events::config::Config;
use pose_events::pipeline::{self, MotionReport};
use pose_events::tracking::{
    select_subjects, BBox, FrameDetections, ReferenceSelection,
};

/// One analysis request: the buffered detection sequence with the
/// operator's reference-frame selections, plus the pose landmark
/// sequence extracted for the selected subject.
#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    frame_width: f32,
    frame_height: f32,
    effective_fps: f32,
    #[serde(default)]
    reference_frame_index: u64,
    #[serde(default)]
    selections: Vec<ReferenceSelection>,
    #[serde(default)]
    frames: Vec<FrameDetections>,
    #[serde(default)]
    pose_sequence: Vec<PoseFrame>,
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    seeds: Vec<(i64, BBox)>,
    /// Per frame, per raw detection: whether it belongs to a subject.
    selected: Vec<Vec<bool>>,
    report: MotionReport,
}

fn main() -> Result<()> {
    let config = if Path::new("config.yaml").exists() {
        Config::load("config.yaml")?
    } else {
        Config::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("pose_events={}", config.logging.level))
        }))
        .init();

    let request_path = std::env::args()
        .nth(1)
        .context("usage: pose-events <request.json>")?;
    let raw = std::fs::read_to_string(&request_path)
        .with_context(|| format!("reading request file {request_path}"))?;
    let request: AnalysisRequest =
        serde_json::from_str(&raw).with_context(|| format!("parsing {request_path}"))?;

    info!(
        frames = request.frames.len(),
        pose_frames = request.pose_sequence.len(),
        selections = request.selections.len(),
        fps = request.effective_fps,
        "request loaded"
    );

    let selection = select_subjects(
        &request.frames,
        &request.selections,
        request.reference_frame_index,
        request.frame_width,
        request.frame_height,
        request.effective_fps,
        &config.tracker,
    );

    let report = pipeline::analyze(&request.pose_sequence, request.effective_fps, &config);

    if report.injury_summary.has_serious_flags {
        tracing::warn!(
            critical = report.injury_summary.critical_count,
            high = report.injury_summary.high_count,
            "serious injury indicators present"
        );
    }

    let response = AnalysisResponse {
        selected: selection.flag_detections(&request.frames),
        seeds: selection.seeds,
        report,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
