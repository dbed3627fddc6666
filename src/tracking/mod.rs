// src/tracking/mod.rs
//
// Identity continuity over a noisy upstream detection sequence.
//
// Signal flow:
//   Detector output (per-frame id+bbox lists) → continuity::SubjectTracker
//   Reference-frame selections → batch::select_subjects (forward+backward)

pub mod batch;
pub mod continuity;
pub mod geometry;

pub use batch::{select_subjects, FrameDetections, ReferenceSelection, SelectionResult};
pub use continuity::{Detection, SubjectTracker, TrackPhase, TrackerConfig};
pub use geometry::{frame_diagonal, BBox};
