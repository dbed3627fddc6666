// src/analysis/jump.rs
//
// Jump detection from hip-midpoint height. In image coordinates y grows
// downward, so the smoothed hip height is inverted and jumps appear as
// local maxima. A peak only counts when it rises above the sequence
// median baseline by a minimum normalized height; the landing frame is
// the point of maximum height recovery within one second of the peak.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pose::{hip_height, PoseFrame};
use super::signal::{find_peaks, median, moving_average, odd_window};
use crate::types::JumpEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Minimum normalized height above the median baseline
    pub min_jump_height: f32,
    /// Minimum peak prominence in the inverted height signal
    pub min_prominence: f32,
    /// Smoothing window in seconds (minimum 5 frames)
    pub smooth_seconds: f32,
    /// Minimum separation between distinct jumps
    pub min_separation_seconds: f32,
    /// How far past the peak to search for the landing frame
    pub landing_search_seconds: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            min_jump_height: 0.025,
            min_prominence: 0.012,
            smooth_seconds: 0.15,
            min_separation_seconds: 0.35,
            landing_search_seconds: 1.0,
        }
    }
}

pub fn detect_jumps(
    sequence: &[PoseFrame],
    effective_fps: f32,
    config: &JumpConfig,
) -> Vec<JumpEvent> {
    if sequence.len() < 5 {
        return Vec::new();
    }

    let hip_y = hip_height(sequence);
    let window = odd_window(((effective_fps * config.smooth_seconds) as usize).max(5));
    let smooth = moving_average(&hip_y, window);

    let inverted: Vec<f32> = smooth.iter().map(|v| -v).collect();
    let min_distance = ((effective_fps * config.min_separation_seconds) as usize).max(5);
    let peaks = find_peaks(&inverted, config.min_prominence, None, min_distance);

    let baseline = median(&smooth);
    let mut events = Vec::new();

    for peak_idx in peaks {
        let jump_height = baseline - smooth[peak_idx];
        if jump_height < config.min_jump_height {
            continue;
        }

        // Landing: the lowest point (max image y) within the search
        // window after the peak.
        let search_end =
            (peak_idx + (effective_fps * config.landing_search_seconds) as usize).min(smooth.len());
        let landing_idx = if search_end > peak_idx + 1 {
            let segment = &smooth[peak_idx..search_end];
            let mut best = 0;
            for (j, v) in segment.iter().enumerate() {
                if *v > segment[best] {
                    best = j;
                }
            }
            peak_idx + best
        } else {
            peak_idx
        };

        debug!(peak_idx, jump_height, landing_idx, "jump detected");
        events.push(JumpEvent {
            frame_seq_idx: peak_idx,
            timestamp: peak_idx as f64 / effective_fps as f64,
            jump_height_norm: jump_height,
            landing_seq_idx: landing_idx,
            landing_timestamp: landing_idx as f64 / effective_fps as f64,
        });
    }

    events
}
