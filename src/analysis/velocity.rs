// src/analysis/velocity.rs
//
// Center-of-mass speed estimation. Both coordinate series are smoothed
// before differencing and the speed series gets a short second pass, so
// the downstream statistics are not dominated by landmark jitter.

use serde::{Deserialize, Serialize};

use super::pose::{center_of_mass, PoseFrame};
use super::signal::{mean, moving_average, odd_window, std_dev};
use crate::types::{VelocitySample, VelocityStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Coordinate smoothing window in seconds (3..=5 frames)
    pub smooth_seconds: f32,
    /// Window of the second smoothing pass over the speed series
    pub speed_smooth_frames: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            smooth_seconds: 0.15,
            speed_smooth_frames: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VelocityProfile {
    /// Smoothed speed per inter-frame interval, normalized units/second.
    pub speeds: Vec<f32>,
    pub stats: VelocityStats,
    pub timeline: Vec<VelocitySample>,
}

pub fn estimate_velocity(
    sequence: &[PoseFrame],
    effective_fps: f32,
    config: &VelocityConfig,
) -> VelocityProfile {
    let coms = center_of_mass(sequence);
    if coms.len() < 2 {
        return VelocityProfile::default();
    }

    let window = odd_window(
        ((effective_fps * config.smooth_seconds) as usize)
            .max(3)
            .min(5),
    );
    let xs: Vec<f32> = coms.iter().map(|c| c.0).collect();
    let ys: Vec<f32> = coms.iter().map(|c| c.1).collect();
    let xs = moving_average(&xs, window);
    let ys = moving_average(&ys, window);

    let dt = 1.0 / effective_fps;
    let speeds: Vec<f32> = xs
        .windows(2)
        .zip(ys.windows(2))
        .map(|(wx, wy)| {
            let dx = wx[1] - wx[0];
            let dy = wy[1] - wy[0];
            (dx * dx + dy * dy).sqrt() / dt
        })
        .collect();
    let speeds = moving_average(&speeds, config.speed_smooth_frames);

    let timeline = speeds
        .iter()
        .enumerate()
        .map(|(i, v)| VelocitySample {
            timestamp: (i as f64 + 0.5) / effective_fps as f64,
            velocity: *v,
        })
        .collect();

    let stats = VelocityStats {
        max_velocity: speeds.iter().cloned().fold(0.0, f32::max),
        mean_velocity: mean(&speeds),
        std_velocity: std_dev(&speeds),
    };

    VelocityProfile {
        speeds,
        stats,
        timeline,
    }
}
