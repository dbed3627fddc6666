// src/analysis/contact.rs
//
// Contact approximation: abrupt decelerations of the center of mass show
// up as spikes in acceleration and jerk. Thresholds adapt to the
// sequence's own statistics (mean + k·std of the absolute signal) but
// are floored by absolute minimums so a near-constant, low-noise
// trajectory is never flagged.
//
// Severity precedence is explicit and total-ordered: with
// ratio = max(jerk/jerk_threshold, accel/accel_threshold), the bands are
// evaluated highest first — ratio > high_ratio ⇒ High, ratio >
// medium_ratio ⇒ Medium, else Low.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pose::{center_of_mass, PoseFrame};
use super::signal::{derivative, find_peaks, mean, moving_average, odd_window, std_dev};
use crate::types::{ContactEvent, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// k in the adaptive threshold mean(|s|) + k·std(|s|)
    pub std_multiplier: f32,
    /// Absolute floors preventing flags on near-constant signals
    pub min_jerk_threshold: f32,
    pub min_accel_threshold: f32,
    /// Minimum gap between distinct contacts
    pub min_gap_seconds: f32,
    /// Severity band multipliers, applied to the winning threshold ratio
    pub high_ratio: f32,
    pub medium_ratio: f32,
    /// Speed smoothing window in seconds before differentiation
    pub smooth_seconds: f32,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            std_multiplier: 2.5,
            min_jerk_threshold: 8.0,
            min_accel_threshold: 3.0,
            min_gap_seconds: 0.5,
            high_ratio: 1.8,
            medium_ratio: 1.2,
            smooth_seconds: 0.1,
        }
    }
}

fn severity_for(ratio: f32, config: &ContactConfig) -> Severity {
    if ratio > config.high_ratio {
        Severity::High
    } else if ratio > config.medium_ratio {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn detect_contacts(
    sequence: &[PoseFrame],
    effective_fps: f32,
    config: &ContactConfig,
) -> Vec<ContactEvent> {
    let coms = center_of_mass(sequence);
    if coms.len() < 4 {
        return Vec::new();
    }

    let dt = 1.0 / effective_fps;
    let speeds: Vec<f32> = coms
        .windows(2)
        .map(|w| {
            let dx = w[1].0 - w[0].0;
            let dy = w[1].1 - w[0].1;
            (dx * dx + dy * dy).sqrt() / dt
        })
        .collect();
    if speeds.len() < 3 {
        return Vec::new();
    }
    let window = odd_window(((effective_fps * config.smooth_seconds) as usize).max(3));
    let speeds = moving_average(&speeds, window);

    let accel = derivative(&speeds, dt);
    let jerk = derivative(&accel, dt);

    let abs_accel: Vec<f32> = accel.iter().map(|v| v.abs()).collect();
    let abs_jerk: Vec<f32> = jerk.iter().map(|v| v.abs()).collect();

    let jerk_threshold = (mean(&abs_jerk) + config.std_multiplier * std_dev(&abs_jerk))
        .max(config.min_jerk_threshold);
    let accel_threshold = (mean(&abs_accel) + config.std_multiplier * std_dev(&abs_accel))
        .max(config.min_accel_threshold);

    let min_gap = ((effective_fps * config.min_gap_seconds) as usize).max(4);
    let jerk_peaks = find_peaks(&abs_jerk, 0.0, Some(jerk_threshold), min_gap);
    let accel_peaks = find_peaks(&abs_accel, 0.0, Some(accel_threshold), min_gap);

    // Jerk lags acceleration by one differentiation; shift acceleration
    // peaks onto the jerk index base, merge, and de-duplicate by gap.
    let mut all_peaks: Vec<usize> = jerk_peaks
        .into_iter()
        .chain(accel_peaks.into_iter().map(|p| p + 1))
        .collect();
    all_peaks.sort_unstable();
    all_peaks.dedup();

    let mut merged: Vec<usize> = Vec::new();
    for p in all_peaks {
        if merged.last().map_or(true, |&last| p - last >= min_gap) {
            merged.push(p);
        }
    }

    let mut events = Vec::new();
    for idx in merged {
        let jerk_val = abs_jerk.get(idx).copied().unwrap_or(0.0);
        let accel_val = abs_accel[idx.min(abs_accel.len() - 1)];

        // Residual floor after the merge: a shifted acceleration peak may
        // land on an index where both signals are quiet.
        if jerk_val < config.min_jerk_threshold * 0.5
            && accel_val < config.min_accel_threshold * 0.5
        {
            continue;
        }

        let ratio = (jerk_val / jerk_threshold).max(accel_val / accel_threshold);
        let severity = severity_for(ratio, config);
        debug!(idx, jerk_val, accel_val, ?severity, "contact detected");

        events.push(ContactEvent {
            frame_seq_idx: idx,
            timestamp: idx as f64 / effective_fps as f64,
            deceleration: accel_val,
            jerk: jerk_val,
            severity,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pose::{Landmark, LANDMARK_COUNT, LEFT_HIP, RIGHT_HIP};

    fn frame_with_hip(x: f32, y: f32) -> PoseFrame {
        let lm = Landmark {
            x: 0.5,
            y: 0.5,
            z: 0.0,
            visibility: 1.0,
        };
        let mut frame = vec![lm; LANDMARK_COUNT];
        frame[LEFT_HIP] = Landmark { x, y, ..lm };
        frame[RIGHT_HIP] = Landmark { x, y, ..lm };
        frame
    }

    /// Constant-speed motion followed by an abrupt stop at `stop_frame`.
    fn sudden_stop_sequence(n: usize, stop_frame: usize, step: f32) -> Vec<PoseFrame> {
        (0..n)
            .map(|i| {
                let x = 0.05 + step * i.min(stop_frame) as f32;
                frame_with_hip(x, 0.5)
            })
            .collect()
    }

    #[test]
    fn test_constant_velocity_yields_no_contacts() {
        let sequence: Vec<PoseFrame> = (0..120)
            .map(|i| frame_with_hip(0.1 + i as f32 * 0.005, 0.5))
            .collect();
        let events = detect_contacts(&sequence, 30.0, &ContactConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_stationary_subject_yields_no_contacts() {
        let sequence: Vec<PoseFrame> = (0..120).map(|_| frame_with_hip(0.5, 0.5)).collect();
        let events = detect_contacts(&sequence, 30.0, &ContactConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_sudden_stop_yields_one_contact() {
        // 0.01/frame at 30fps = 0.3 units/s, stopping dead at frame 60:
        // deceleration ≈ 9 units/s² over one frame, jerk in the hundreds.
        let sequence = sudden_stop_sequence(120, 60, 0.01);
        let events = detect_contacts(&sequence, 30.0, &ContactConfig::default());
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert!((e.timestamp - 2.0).abs() < 0.25, "timestamp {}", e.timestamp);
        assert!(e.jerk > 0.0 || e.deceleration > 0.0);
    }

    #[test]
    fn test_too_short_sequence_empty() {
        let sequence = sudden_stop_sequence(3, 1, 0.01);
        assert!(detect_contacts(&sequence, 30.0, &ContactConfig::default()).is_empty());
    }

    #[test]
    fn test_severity_bands_total_order() {
        let cfg = ContactConfig::default();
        assert_eq!(severity_for(2.5, &cfg), Severity::High);
        assert_eq!(severity_for(1.5, &cfg), Severity::Medium);
        assert_eq!(severity_for(1.0, &cfg), Severity::Low);
        // Band edges: strictly-greater comparisons.
        assert_eq!(severity_for(1.8, &cfg), Severity::Medium);
        assert_eq!(severity_for(1.2, &cfg), Severity::Low);
    }
}
