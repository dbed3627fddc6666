// src/analysis/mod.rs
//
// Temporal event detection over pose landmark sequences.
//
// Signal flow:
//   Pose landmarks → pose (joint signals) → signal (smooth/diff/peaks) ─┐
//   jump / velocity / contact ──────────────────────────────────────────┼→ pipeline::MotionReport
//   collapse / stillness / hyperextension → indicators (InjurySummary) ─┘
//   ground / biomech feed the report directly.
//
// Orchestrated by pipeline::analyze.

pub mod biomech;
pub mod collapse;
pub mod contact;
pub mod ground;
pub mod hyperextension;
pub mod indicators;
pub mod jump;
pub mod pose;
pub mod signal;
pub mod stillness;
pub mod velocity;

// Re-exports for ergonomic access from the pipeline and main.rs
pub use biomech::extract_biomech_features;
pub use collapse::{detect_body_collapse, CollapseConfig};
pub use contact::{detect_contacts, ContactConfig};
pub use ground::{ankle_ground_proximity, GroundConfig};
pub use hyperextension::{detect_hyperextension, HyperextensionConfig};
pub use indicators::summarize_indicators;
pub use jump::{detect_jumps, JumpConfig};
pub use pose::{Landmark, PoseFrame};
pub use stillness::{detect_post_impact_stillness, StillnessConfig};
pub use velocity::{estimate_velocity, VelocityConfig, VelocityProfile};
