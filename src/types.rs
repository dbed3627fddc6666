// src/types.rs
//
// Event records produced by the detection engine. Events are immutable
// once produced and ordered by timestamp; severities are computed
// deterministically from metric-vs-threshold ratios.

use serde::{Deserialize, Serialize};

/// Event severity. Ordering is total: Low < Medium < High < Critical.
/// Banding logic everywhere evaluates the highest tier first and the
/// first matching band wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// An upward hip displacement followed by a landing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpEvent {
    pub frame_seq_idx: usize,
    pub timestamp: f64,
    /// Height of the hip peak above the sequence median baseline,
    /// normalized image coordinates.
    pub jump_height_norm: f32,
    pub landing_seq_idx: usize,
    pub landing_timestamp: f64,
}

/// A sudden deceleration consistent with a contact or landing impact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEvent {
    pub frame_seq_idx: usize,
    pub timestamp: f64,
    pub deceleration: f32,
    pub jerk: f32,
    pub severity: Severity,
}

/// A rapid drop of the upper body that is sustained afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapseEvent {
    pub frame_seq_idx: usize,
    pub timestamp: f64,
    /// Drop speed in normalized units per second.
    pub fall_rate: f32,
    pub drop_amount: f32,
    pub stayed_down_ratio: f32,
    pub body_height_ratio: f32,
    pub severity: Severity,
}

/// Near-total absence of motion following a high-severity contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StillnessEvent {
    pub frame_seq_idx: usize,
    pub timestamp: f64,
    pub duration_seconds: f64,
    pub still_ratio: f32,
    pub avg_speed_post_impact: f32,
    pub related_contact_timestamp: f64,
    pub severity: Severity,
}

/// An extreme or abruptly changing knee angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperextensionEvent {
    pub frame_seq_idx: usize,
    pub timestamp: f64,
    pub left_knee_angle: f32,
    pub right_knee_angle: f32,
    pub angle_delta: f32,
    pub flags: Vec<String>,
    pub severity: Severity,
}

/// One entry of the merged injury-indicator stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorEvent {
    Collapse(CollapseEvent),
    PostImpactStillness(StillnessEvent),
    Hyperextension(HyperextensionEvent),
}

impl IndicatorEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Collapse(e) => e.timestamp,
            Self::PostImpactStillness(e) => e.timestamp,
            Self::Hyperextension(e) => e.timestamp,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Collapse(e) => e.severity,
            Self::PostImpactStillness(e) => e.severity,
            Self::Hyperextension(e) => e.severity,
        }
    }
}

/// Aggregate injury-indicator summary: merged, time-sorted events plus
/// derived counts. Derived, never independently mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjurySummary {
    pub indicators: Vec<IndicatorEvent>,
    pub collapse_count: usize,
    pub stillness_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub total_count: usize,
    /// Gates the downstream risk-floor behavior.
    pub has_serious_flags: bool,
}

/// One sample of the per-frame velocity timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocitySample {
    pub timestamp: f64,
    pub velocity: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelocityStats {
    pub max_velocity: f32,
    pub mean_velocity: f32,
    pub std_velocity: f32,
}

/// One sample of the ankle ground-proximity timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundSample {
    pub timestamp: f64,
    pub on_ground: bool,
    pub ankle_y: f32,
}

/// Sequence-level joint-angle features for the downstream risk scorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiomechFeatures {
    pub avg_knee_angle: f32,
    pub min_knee_angle: f32,
    pub knee_variability: f32,
    pub avg_hip_angle: f32,
    pub hip_variability: f32,
    pub movement_variability: f32,
    pub sample_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_indicator_event_json_tag() {
        let event = IndicatorEvent::Collapse(CollapseEvent {
            frame_seq_idx: 10,
            timestamp: 1.0,
            fall_rate: 0.2,
            drop_amount: 0.1,
            stayed_down_ratio: 0.9,
            body_height_ratio: 0.7,
            severity: Severity::High,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"collapse""#));
        assert!(json.contains(r#""severity":"high""#));
    }
}
