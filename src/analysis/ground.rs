// src/analysis/ground.rs
//
// Ankle ground-proximity timeline. A frame counts as grounded when the
// lower of the two ankles sits in the bottom band of the normalized
// frame.

use serde::{Deserialize, Serialize};

use super::pose::{PoseFrame, LEFT_ANKLE, RIGHT_ANKLE};
use crate::types::GroundSample;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Normalized y at or below which an ankle counts as on the ground
    pub ground_threshold: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            ground_threshold: 0.92,
        }
    }
}

pub fn ankle_ground_proximity(
    sequence: &[PoseFrame],
    effective_fps: f32,
    config: &GroundConfig,
) -> Vec<GroundSample> {
    sequence
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let ankle_y = frame[LEFT_ANKLE].y.max(frame[RIGHT_ANKLE].y);
            GroundSample {
                timestamp: i as f64 / effective_fps as f64,
                on_ground: ankle_y >= config.ground_threshold,
                ankle_y,
            }
        })
        .collect()
}
