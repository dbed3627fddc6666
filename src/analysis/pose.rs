// src/analysis/pose.rs
//
// Fixed 33-point human pose schema and landmark geometry helpers.
// All angle and midpoint computation uses the x,y projection only —
// the z channel from the upstream estimator is too noisy to trust.

use serde::{Deserialize, Serialize};

// Canonical landmark indices (33-point schema).
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

pub const LANDMARK_COUNT: usize = 33;

fn default_visibility() -> f32 {
    1.0
}

/// One body landmark in normalized image coordinates. A missing
/// visibility channel deserializes as fully trusted rather than failing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

/// One frame of the keypoint time series: landmarks indexed by the
/// canonical schema positions above.
pub type PoseFrame = Vec<Landmark>;

/// Midpoint of two landmarks in the x,y plane.
pub fn midpoint(frame: &PoseFrame, a: usize, b: usize) -> (f32, f32) {
    let la = frame[a];
    let lb = frame[b];
    ((la.x + lb.x) * 0.5, (la.y + lb.y) * 0.5)
}

/// Angle in degrees at point b formed by a-b-c, x,y plane only. The
/// cosine is clipped to [-1, 1] before acos so floating-point overshoot
/// on collinear points cannot produce NaN.
pub fn angle_between(a: Landmark, b: Landmark, c: Landmark) -> f32 {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);
    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    let norm_ba = (ba.0 * ba.0 + ba.1 * ba.1).sqrt();
    let norm_bc = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();
    let cos = dot / (norm_ba * norm_bc + 1e-6);
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Center of mass proxy per frame: the hip midpoint.
pub fn center_of_mass(sequence: &[PoseFrame]) -> Vec<(f32, f32)> {
    sequence
        .iter()
        .map(|frame| midpoint(frame, LEFT_HIP, RIGHT_HIP))
        .collect()
}

/// Hip midpoint height (normalized y, larger = lower in frame) per frame.
pub fn hip_height(sequence: &[PoseFrame]) -> Vec<f32> {
    sequence
        .iter()
        .map(|frame| midpoint(frame, LEFT_HIP, RIGHT_HIP).1)
        .collect()
}

/// Shoulder midpoint height per frame.
pub fn shoulder_height(sequence: &[PoseFrame]) -> Vec<f32> {
    sequence
        .iter()
        .map(|frame| midpoint(frame, LEFT_SHOULDER, RIGHT_SHOULDER).1)
        .collect()
}
