// src/analysis/collapse.rs
//
// Body collapse detection: the subject falls and stays down.
//
// A candidate must clear four gates before it is reported:
//   1. the shoulder midpoint drops by a large amount within ~0.5s
//   2. the dropped position is below the standing baseline
//   3. the subject remains at or below the dropped height for ~1.5s
//   4. the shoulder-hip separation compresses, ruling out a subject who
//      merely moved lower in the frame while staying upright
//
// Normal bending, jump landings, defensive stances, and pose jitter fail
// at least one of these gates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pose::{hip_height, shoulder_height, PoseFrame};
use super::signal::{moving_average, odd_window, percentile};
use crate::types::{CollapseEvent, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseConfig {
    /// Minimum footage needed to detect a collapse plus its confirmation
    pub min_footage_seconds: f32,
    /// Heavy smoothing window for shoulder/hip signals
    pub smooth_seconds: f32,
    /// Reject sequences whose standing shoulder-hip separation is below
    /// this (landmarks too close together to be reliable)
    pub min_standing_height: f32,
    /// Minimum drop: max(fraction × standing height, absolute floor)
    pub min_drop_height_fraction: f32,
    pub min_drop_abs: f32,
    /// Window within which the drop must occur
    pub drop_window_seconds: f32,
    /// Confirmation window and required fraction of frames at or below
    /// the dropped height
    pub stay_down_seconds: f32,
    pub stay_down_ratio: f32,
    /// Tolerance band as a fraction of standing height
    pub stay_down_tolerance_fraction: f32,
    /// Maximum post-drop body height relative to standing for the
    /// compression gate
    pub max_compressed_height_ratio: f32,
    /// Minimum gap between reported collapses
    pub min_event_gap_seconds: f32,
    /// Critical band: drop beyond this multiple of the minimum, with a
    /// stay-down ratio above the critical ratio
    pub critical_drop_multiplier: f32,
    pub critical_stay_ratio: f32,
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self {
            min_footage_seconds: 2.5,
            smooth_seconds: 0.4,
            min_standing_height: 0.02,
            min_drop_height_fraction: 0.15,
            min_drop_abs: 0.06,
            drop_window_seconds: 0.5,
            stay_down_seconds: 1.5,
            stay_down_ratio: 0.75,
            stay_down_tolerance_fraction: 0.08,
            max_compressed_height_ratio: 0.85,
            min_event_gap_seconds: 3.0,
            critical_drop_multiplier: 2.0,
            critical_stay_ratio: 0.9,
        }
    }
}

pub fn detect_body_collapse(
    sequence: &[PoseFrame],
    effective_fps: f32,
    config: &CollapseConfig,
) -> Vec<CollapseEvent> {
    if sequence.len() < (effective_fps * config.min_footage_seconds) as usize {
        return Vec::new();
    }

    let window = odd_window(((effective_fps * config.smooth_seconds) as usize).max(7));
    let shoulder_y = moving_average(&shoulder_height(sequence), window);
    let hip_y = moving_average(&hip_height(sequence), window);

    let body_height: Vec<f32> = shoulder_y
        .iter()
        .zip(&hip_y)
        .map(|(s, h)| (s - h).abs())
        .collect();

    // 25th percentile is robust to the frames where the subject is down.
    let standing_height = percentile(&body_height, 25.0);
    if standing_height < config.min_standing_height {
        return Vec::new();
    }
    let standing_shoulder = percentile(&shoulder_y, 25.0);

    let min_drop = (standing_height * config.min_drop_height_fraction).max(config.min_drop_abs);
    let drop_window = ((effective_fps * config.drop_window_seconds) as usize).max(3);
    let stay_down_window = ((effective_fps * config.stay_down_seconds) as usize).max(5);
    let min_gap = ((effective_fps * config.min_event_gap_seconds) as usize).max(5);
    let tolerance = standing_height * config.stay_down_tolerance_fraction;

    let mut events = Vec::new();
    let mut i = drop_window;
    while i + stay_down_window < shoulder_y.len() {
        // Gate 1: rapid drop. Compare against the highest position seen
        // shortly before the drop window.
        let pre_lo = i.saturating_sub(drop_window * 2);
        let pre_hi = i - drop_window + 1;
        let pre_shoulder = shoulder_y[pre_lo..pre_hi]
            .iter()
            .cloned()
            .fold(f32::INFINITY, f32::min);
        let current = shoulder_y[i];
        let drop = current - pre_shoulder; // positive = moved down in image

        if drop < min_drop {
            i += 1;
            continue;
        }

        // Gate 2: below the standing baseline, not just a dip within the
        // normal posture range.
        if current < standing_shoulder + min_drop * 0.5 {
            i += 1;
            continue;
        }

        // Gate 3: sustained. Count confirmation frames at or below the
        // dropped height.
        let post = &shoulder_y[i..i + stay_down_window];
        let stayed = post.iter().filter(|&&v| v >= current - tolerance).count();
        let stayed_ratio = stayed as f32 / post.len() as f32;
        if stayed_ratio < config.stay_down_ratio {
            i += 1;
            continue;
        }

        // Gate 4: body compression corroborates a real fall.
        let post_height: f32 = body_height[i..i + stay_down_window].iter().sum::<f32>()
            / stay_down_window as f32;
        let height_ratio = post_height / (standing_height + 1e-6);
        if height_ratio > config.max_compressed_height_ratio {
            i += 1;
            continue;
        }

        let severity = if drop > min_drop * config.critical_drop_multiplier
            && stayed_ratio > config.critical_stay_ratio
        {
            Severity::Critical
        } else {
            Severity::High
        };

        debug!(i, drop, stayed_ratio, height_ratio, ?severity, "collapse detected");
        events.push(CollapseEvent {
            frame_seq_idx: i,
            timestamp: i as f64 / effective_fps as f64,
            fall_rate: drop / (drop_window as f32 / effective_fps),
            drop_amount: drop,
            stayed_down_ratio: stayed_ratio,
            body_height_ratio: height_ratio,
            severity,
        });

        // Skip past the confirmation window plus the inter-event gap.
        i += stay_down_window + min_gap;
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pose::{
        Landmark, LANDMARK_COUNT, LEFT_HIP, LEFT_SHOULDER, RIGHT_HIP, RIGHT_SHOULDER,
    };

    fn frame(shoulder_y: f32, hip_y: f32) -> PoseFrame {
        let lm = Landmark {
            x: 0.5,
            y: 0.5,
            z: 0.0,
            visibility: 1.0,
        };
        let mut f = vec![lm; LANDMARK_COUNT];
        f[LEFT_SHOULDER].y = shoulder_y;
        f[RIGHT_SHOULDER].y = shoulder_y;
        f[LEFT_HIP].y = hip_y;
        f[RIGHT_HIP].y = hip_y;
        f
    }

    /// Standing at shoulder 0.4 / hip 0.6, then falling at `fall_at`:
    /// shoulder drops to 0.75 and the hip to 0.8 (body compressed).
    fn falling_sequence(n: usize, fall_at: usize, fps: f32) -> Vec<PoseFrame> {
        let fall_frames = (fps * 0.3) as usize;
        (0..n)
            .map(|i| {
                if i < fall_at {
                    frame(0.4, 0.6)
                } else if i < fall_at + fall_frames {
                    let p = (i - fall_at) as f32 / fall_frames as f32;
                    frame(0.4 + 0.35 * p, 0.6 + 0.2 * p)
                } else {
                    frame(0.75, 0.8)
                }
            })
            .collect()
    }

    #[test]
    fn test_genuine_collapse_detected() {
        // 10s at 30fps, fall at t≈7.7s, down for the rest. The standing
        // baseline (25th percentile) needs the down period to be a
        // minority of the footage.
        let sequence = falling_sequence(300, 230, 30.0);
        let events = detect_body_collapse(&sequence, 30.0, &CollapseConfig::default());
        assert_eq!(events.len(), 1, "exactly one event despite persistent gates");
        let e = &events[0];
        assert!((e.timestamp - 7.7).abs() < 1.0, "timestamp {}", e.timestamp);
        assert!(e.stayed_down_ratio >= 0.75);
        assert!(e.body_height_ratio <= 0.85);
        assert!(e.severity >= Severity::High);
    }

    #[test]
    fn test_momentary_spike_not_a_collapse() {
        // One-frame drop with immediate return to baseline: the heavy
        // smoothing flattens it and the stay-down gate rejects the rest.
        let mut sequence: Vec<PoseFrame> = (0..300).map(|_| frame(0.4, 0.6)).collect();
        sequence[150] = frame(0.78, 0.82);
        let events = detect_body_collapse(&sequence, 30.0, &CollapseConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_crouch_without_compression_not_a_collapse() {
        // Subject moves lower in frame but stays upright: shoulder and
        // hip drop together, separation unchanged, gate 4 rejects.
        let sequence: Vec<PoseFrame> = (0..300)
            .map(|i| {
                if i < 120 {
                    frame(0.4, 0.6)
                } else {
                    frame(0.55, 0.75)
                }
            })
            .collect();
        let events = detect_body_collapse(&sequence, 30.0, &CollapseConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_short_footage_returns_empty() {
        let sequence = falling_sequence(60, 20, 30.0); // 2s < 2.5s minimum
        assert!(detect_body_collapse(&sequence, 30.0, &CollapseConfig::default()).is_empty());
    }

    #[test]
    fn test_degenerate_landmarks_rejected() {
        // Shoulder and hip nearly coincident: standing height below the
        // reliability floor.
        let sequence: Vec<PoseFrame> = (0..300).map(|_| frame(0.6, 0.61)).collect();
        assert!(detect_body_collapse(&sequence, 30.0, &CollapseConfig::default()).is_empty());
    }

}
