// src/analysis/stillness.rs
//
// Post-impact stillness: a subject who stops moving after a hard
// contact. Only evaluated for high-severity contacts — ordinary contacts
// never produce a stillness event on their own. The stillness threshold
// adapts to the subject's own baseline speed (75th percentile, since the
// subject is usually moving) with an absolute floor.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pose::{center_of_mass, PoseFrame};
use super::signal::{mean, percentile};
use crate::types::{ContactEvent, Severity, StillnessEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StillnessConfig {
    /// Percentile of the speed series used as the movement baseline
    pub baseline_percentile: f32,
    /// Reject sequences where the subject barely moves at all —
    /// stillness is meaningless without a movement baseline
    pub min_baseline_speed: f32,
    /// Stillness threshold: max(fraction × baseline, absolute floor)
    pub threshold_fraction: f32,
    pub min_threshold_abs: f32,
    /// Examination window relative to the impact frame
    pub window_start_seconds: f32,
    pub window_end_seconds: f32,
    pub min_window_seconds: f32,
    /// Required fraction of still frames, and the cap on mean
    /// post-impact speed as a multiple of the threshold
    pub min_still_ratio: f32,
    pub max_mean_speed_multiplier: f32,
    /// Critical band on the still-frame fraction
    pub critical_still_ratio: f32,
}

impl Default for StillnessConfig {
    fn default() -> Self {
        Self {
            baseline_percentile: 75.0,
            min_baseline_speed: 0.01,
            threshold_fraction: 0.05,
            min_threshold_abs: 0.003,
            window_start_seconds: 0.5,
            window_end_seconds: 3.0,
            min_window_seconds: 1.0,
            min_still_ratio: 0.80,
            max_mean_speed_multiplier: 1.5,
            critical_still_ratio: 0.95,
        }
    }
}

pub fn detect_post_impact_stillness(
    sequence: &[PoseFrame],
    effective_fps: f32,
    contacts: &[ContactEvent],
    config: &StillnessConfig,
) -> Vec<StillnessEvent> {
    if contacts.is_empty() || sequence.len() < 5 {
        return Vec::new();
    }

    let coms = center_of_mass(sequence);
    if coms.len() < 2 {
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

    let baseline_speed = percentile(&speeds, config.baseline_percentile);
    if baseline_speed < config.min_baseline_speed {
        return Vec::new();
    }
    let threshold = (baseline_speed * config.threshold_fraction).max(config.min_threshold_abs);

    let min_window = ((effective_fps * config.min_window_seconds) as usize).max(5);
    let mut events = Vec::new();

    for contact in contacts {
        if contact.severity < Severity::High {
            continue;
        }

        let impact = contact.frame_seq_idx;
        let start = impact + ((effective_fps * config.window_start_seconds) as usize).max(1);
        let end = (impact + (effective_fps * config.window_end_seconds) as usize).min(speeds.len());
        if start >= end || end - start < min_window {
            continue;
        }

        let post = &speeds[start..end];
        let avg_post = mean(post);
        let still = post.iter().filter(|&&v| v < threshold).count();
        let still_ratio = still as f32 / post.len() as f32;

        if still_ratio > config.min_still_ratio
            && avg_post < threshold * config.max_mean_speed_multiplier
        {
            let severity = if still_ratio > config.critical_still_ratio {
                Severity::Critical
            } else {
                Severity::High
            };
            debug!(impact, still_ratio, avg_post, ?severity, "post-impact stillness");
            events.push(StillnessEvent {
                frame_seq_idx: start,
                timestamp: start as f64 / effective_fps as f64,
                duration_seconds: (end - start) as f64 / effective_fps as f64,
                still_ratio,
                avg_speed_post_impact: avg_post,
                related_contact_timestamp: contact.timestamp,
                severity,
            });
        }
    }

    events
}
