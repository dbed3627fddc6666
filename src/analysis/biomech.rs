// src/analysis/biomech.rs
//
// Sequence-level joint-angle features consumed by the downstream risk
// scorer: knee and hip angle statistics from the left-side chain.

use super::pose::{
    angle_between, PoseFrame, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER,
};
use super::signal::{mean, std_dev};
use crate::types::BiomechFeatures;

pub fn extract_biomech_features(sequence: &[PoseFrame]) -> BiomechFeatures {
    if sequence.is_empty() {
        return BiomechFeatures::default();
    }

    let mut knee_angles = Vec::with_capacity(sequence.len());
    let mut hip_angles = Vec::with_capacity(sequence.len());
    for frame in sequence {
        knee_angles.push(angle_between(
            frame[LEFT_HIP],
            frame[LEFT_KNEE],
            frame[LEFT_ANKLE],
        ));
        hip_angles.push(angle_between(
            frame[LEFT_SHOULDER],
            frame[LEFT_HIP],
            frame[LEFT_KNEE],
        ));
    }

    let knee_std = std_dev(&knee_angles);
    BiomechFeatures {
        avg_knee_angle: mean(&knee_angles),
        min_knee_angle: knee_angles.iter().cloned().fold(f32::INFINITY, f32::min),
        knee_variability: knee_std,
        avg_hip_angle: mean(&hip_angles),
        hip_variability: std_dev(&hip_angles),
        movement_variability: knee_std * knee_std,
        sample_size: sequence.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pose::{Landmark, LANDMARK_COUNT};

    #[test]
    fn test_static_pose_zero_variability() {
        let lm = Landmark {
            x: 0.5,
            y: 0.5,
            z: 0.0,
            visibility: 1.0,
        };
        let mut frame = vec![lm; LANDMARK_COUNT];
        frame[LEFT_SHOULDER] = Landmark { x: 0.5, y: 0.1, ..lm };
        frame[LEFT_HIP] = Landmark { x: 0.5, y: 0.4, ..lm };
        frame[LEFT_KNEE] = Landmark { x: 0.5, y: 0.6, ..lm };
        frame[LEFT_ANKLE] = Landmark { x: 0.5, y: 0.8, ..lm };
        let sequence: Vec<PoseFrame> = (0..20).map(|_| frame.clone()).collect();

        let features = extract_biomech_features(&sequence);
        assert_eq!(features.sample_size, 20);
        assert!((features.avg_knee_angle - 180.0).abs() < 1.0);
        assert!(features.knee_variability < 1e-3);
        assert!((features.min_knee_angle - features.avg_knee_angle).abs() < 1e-3);
    }

    #[test]
    fn test_empty_sequence_defaults() {
        let features = extract_biomech_features(&[]);
        assert_eq!(features.sample_size, 0);
    }
}
