// src/pipeline.rs
//
// Full analysis over one subject's pose sequence: every detector runs on
// the same landmark timeline and the results are assembled into a single
// serializable report. Contact detection runs before stillness, which
// consumes its events.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{
    ankle_ground_proximity, detect_body_collapse, detect_contacts, detect_hyperextension,
    detect_jumps, detect_post_impact_stillness, estimate_velocity, extract_biomech_features,
    summarize_indicators, PoseFrame,
};
use crate::config::Config;
use crate::types::{
    BiomechFeatures, ContactEvent, GroundSample, InjurySummary, JumpEvent, VelocitySample,
    VelocityStats,
};

/// Everything the engine derives from one subject's pose sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionReport {
    pub frame_count: usize,
    pub effective_fps: f32,
    pub jump_count: usize,
    pub jumps: Vec<JumpEvent>,
    pub contact_count: usize,
    pub contacts: Vec<ContactEvent>,
    pub velocity_stats: VelocityStats,
    pub velocity_timeline: Vec<VelocitySample>,
    pub ground_timeline: Vec<GroundSample>,
    pub biomechanics: BiomechFeatures,
    pub injury_summary: InjurySummary,
}

pub fn analyze(sequence: &[PoseFrame], effective_fps: f32, config: &Config) -> MotionReport {
    let jumps = detect_jumps(sequence, effective_fps, &config.jumps);
    let velocity = estimate_velocity(sequence, effective_fps, &config.velocity);
    let contacts = detect_contacts(sequence, effective_fps, &config.contacts);
    let collapses = detect_body_collapse(sequence, effective_fps, &config.collapse);
    let stillness =
        detect_post_impact_stillness(sequence, effective_fps, &contacts, &config.stillness);
    let hyperextension = detect_hyperextension(sequence, effective_fps, &config.hyperextension);

    let injury_summary = summarize_indicators(
        &collapses,
        &stillness,
        &hyperextension,
        config.hyperextension.include_in_summary,
    );

    info!(
        frames = sequence.len(),
        jumps = jumps.len(),
        contacts = contacts.len(),
        indicators = injury_summary.total_count,
        serious = injury_summary.has_serious_flags,
        "analysis complete"
    );

    MotionReport {
        frame_count: sequence.len(),
        effective_fps,
        jump_count: jumps.len(),
        jumps,
        contact_count: contacts.len(),
        contacts,
        velocity_stats: velocity.stats,
        velocity_timeline: velocity.timeline,
        ground_timeline: ankle_ground_proximity(sequence, effective_fps, &config.ground),
        biomechanics: extract_biomech_features(sequence),
        injury_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pose::{Landmark, LANDMARK_COUNT, LEFT_HIP, RIGHT_HIP};

    fn frame_with_hip(x: f32) -> PoseFrame {
        let lm = Landmark {
            x: 0.5,
            y: 0.5,
            z: 0.0,
            visibility: 1.0,
        };
        let mut frame = vec![lm; LANDMARK_COUNT];
        frame[LEFT_HIP] = Landmark { x, ..lm };
        frame[RIGHT_HIP] = Landmark { x, ..lm };
        frame
    }

    #[test]
    fn test_calm_sequence_produces_empty_event_streams() {
        let sequence: Vec<PoseFrame> = (0..150)
            .map(|i| frame_with_hip(0.1 + i as f32 * 0.002))
            .collect();
        let report = analyze(&sequence, 30.0, &Config::default());

        assert_eq!(report.frame_count, 150);
        assert_eq!(report.jump_count, 0);
        assert_eq!(report.contact_count, 0);
        assert_eq!(report.injury_summary.total_count, 0);
        assert!(!report.injury_summary.has_serious_flags);
        assert!(report.velocity_stats.mean_velocity > 0.0);
        assert_eq!(report.ground_timeline.len(), 150);
        assert_eq!(report.biomechanics.sample_size, 150);
    }

    #[test]
    fn test_sudden_stop_reaches_the_report() {
        let sequence: Vec<PoseFrame> = (0..120)
            .map(|i| frame_with_hip(0.05 + 0.01 * i.min(60) as f32))
            .collect();
        let report = analyze(&sequence, 30.0, &Config::default());

        assert_eq!(report.contact_count, report.contacts.len());
        assert_eq!(report.contact_count, 1);
        assert!((report.contacts[0].timestamp - 2.0).abs() < 0.25);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let sequence: Vec<PoseFrame> = (0..90)
            .map(|i| frame_with_hip(0.1 + i as f32 * 0.003))
            .collect();
        let report = analyze(&sequence, 30.0, &Config::default());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"jump_count\""));
        assert!(json.contains("\"injury_summary\""));
    }
}
