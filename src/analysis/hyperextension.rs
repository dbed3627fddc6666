// src/analysis/hyperextension.rs
//
// Dangerous knee angles: near-hyperextension, severe flexion, and
// abrupt single-frame angle changes. Thresholds are deliberately
// extreme — pose estimation noise makes moderate-angle flags useless,
// which is also why this detector is excluded from the aggregate
// indicator summary unless explicitly enabled.

use serde::{Deserialize, Serialize};

use super::pose::{
    angle_between, PoseFrame, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE,
};
use super::signal::moving_average;
use crate::types::{HyperextensionEvent, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperextensionConfig {
    /// Whether these events participate in the injury summary
    pub include_in_summary: bool,
    /// Knee angle beyond which extension is flagged
    pub max_extension_deg: f32,
    /// Knee angle below which flexion is flagged
    pub min_flexion_deg: f32,
    /// Per-frame angle change (after smoothing) that counts as rapid
    pub max_delta_per_frame_deg: f32,
    /// Minimum gap between reported events
    pub min_event_gap_seconds: f32,
}

impl Default for HyperextensionConfig {
    fn default() -> Self {
        Self {
            include_in_summary: false,
            max_extension_deg: 182.0,
            min_flexion_deg: 35.0,
            max_delta_per_frame_deg: 80.0,
            min_event_gap_seconds: 1.0,
        }
    }
}

pub fn detect_hyperextension(
    sequence: &[PoseFrame],
    effective_fps: f32,
    config: &HyperextensionConfig,
) -> Vec<HyperextensionEvent> {
    if sequence.len() < 3 {
        return Vec::new();
    }

    let left: Vec<f32> = sequence
        .iter()
        .map(|f| angle_between(f[LEFT_HIP], f[LEFT_KNEE], f[LEFT_ANKLE]))
        .collect();
    let right: Vec<f32> = sequence
        .iter()
        .map(|f| angle_between(f[RIGHT_HIP], f[RIGHT_KNEE], f[RIGHT_ANKLE]))
        .collect();

    let window = (sequence.len() / 10).clamp(3, 5);
    let left = moving_average(&left, window);
    let right = moving_average(&right, window);

    let min_gap = ((effective_fps * config.min_event_gap_seconds) as usize).max(3);
    let mut events: Vec<HyperextensionEvent> = Vec::new();
    let mut prev: Option<(f32, f32)> = None;

    for i in 0..sequence.len() {
        let (lk, rk) = (left[i], right[i]);
        let mut flags: Vec<String> = Vec::new();

        if lk > config.max_extension_deg || rk > config.max_extension_deg {
            flags.push("near_hyperextension".to_string());
        }
        if lk < config.min_flexion_deg || rk < config.min_flexion_deg {
            flags.push("severe_flexion".to_string());
        }

        let delta = match prev {
            Some((pl, pr)) => (lk - pl).abs().max((rk - pr).abs()),
            None => 0.0,
        };
        if prev.is_some() && delta > config.max_delta_per_frame_deg {
            flags.push("rapid_angle_change".to_string());
        }
        prev = Some((lk, rk));

        if flags.is_empty() {
            continue;
        }
        if let Some(last) = events.last() {
            if i - last.frame_seq_idx < min_gap {
                continue;
            }
        }

        let has = |name: &str| flags.iter().any(|f| f == name);
        let severity = if has("severe_flexion") && has("rapid_angle_change") {
            Severity::Critical
        } else if has("near_hyperextension") {
            Severity::High
        } else {
            Severity::Medium
        };

        events.push(HyperextensionEvent {
            frame_seq_idx: i,
            timestamp: i as f64 / effective_fps as f64,
            left_knee_angle: lk,
            right_knee_angle: rk,
            angle_delta: delta,
            flags,
            severity,
        });
    }

    events
}
