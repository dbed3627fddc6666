// src/lib.rs
//
// Subject identity continuity over noisy per-frame detections, plus
// temporal event detection over the selected subject's pose landmark
// sequence.

pub mod analysis;
pub mod config;
pub mod pipeline;
pub mod tracking;
pub mod types;

pub use config::Config;
pub use pipeline::{analyze, MotionReport};
