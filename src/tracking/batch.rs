// src/tracking/batch.rs
//
// Offline subject selection over a fully buffered detection sequence.
//
// A reference frame carries manually confirmed subject boxes. Those are
// matched to the reference frame's raw detections by highest-IoU
// one-to-one assignment, then one tracker per subject runs forward from
// the reference frame to the end while an independently seeded set runs
// backward to the start. The two passes share nothing mutable — each
// operates on freshly seeded trackers over the immutable detection list —
// so they run on parallel threads and their per-frame selected-identifier
// sets are merged by union once both finish.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::thread;
use tracing::{debug, info, warn};

use super::continuity::{Detection, SubjectTracker, TrackerConfig};
use super::geometry::BBox;

// ============================================================================
// TYPES
// ============================================================================

/// All detections retained for one source-video frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
}

/// A manually confirmed subject box on the reference frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReferenceSelection {
    pub bbox: BBox,
}

/// Per-frame selection outcome for the whole sequence: for each frame,
/// the set of raw detector identifiers belonging to selected subjects.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub selected_per_frame: Vec<HashSet<i64>>,
    /// Seeds actually assigned at the reference frame; selections that
    /// cleared no detection at the minimum IoU are simply absent.
    pub seeds: Vec<(i64, BBox)>,
}

impl SelectionResult {
    /// Flag every raw detection in every frame as selected or not.
    pub fn flag_detections(&self, frames: &[FrameDetections]) -> Vec<Vec<bool>> {
        frames
            .iter()
            .zip(&self.selected_per_frame)
            .map(|(frame, sel)| frame.detections.iter().map(|d| sel.contains(&d.id)).collect())
            .collect()
    }
}

// ============================================================================
// SEEDING
// ============================================================================

/// Match reference selections to the reference frame's raw detections by
/// highest IoU, one-to-one. Selections that clear nothing at the minimum
/// IoU get no seed — that subject has no tracked frames, which is not an
/// error.
pub fn seed_selections(
    reference: &FrameDetections,
    selections: &[ReferenceSelection],
    min_iou: f32,
) -> Vec<(i64, BBox)> {
    let mut assigned: HashSet<i64> = HashSet::new();
    let mut seeds = Vec::new();

    for (sel_idx, sel) in selections.iter().enumerate() {
        let mut best: Option<(&Detection, f32)> = None;
        for det in &reference.detections {
            if assigned.contains(&det.id) {
                continue;
            }
            let iou = sel.bbox.iou(&det.bbox);
            if iou >= min_iou && best.map_or(true, |(_, b)| iou > b) {
                best = Some((det, iou));
            }
        }
        match best {
            Some((det, iou)) => {
                debug!(sel_idx, id = det.id, iou, "reference selection seeded");
                assigned.insert(det.id);
                seeds.push((det.id, det.bbox));
            }
            None => {
                warn!(sel_idx, "reference selection matched no detection, skipping");
            }
        }
    }

    seeds
}

// ============================================================================
// PASSES
// ============================================================================

/// Run one pass of sibling trackers over a range of frames, in order.
/// Trackers run in fixed priority order within each frame and exclude
/// identifiers already claimed by earlier siblings, so a detection is
/// assigned to at most one subject per frame.
fn run_pass<'a, I>(
    frames: I,
    seeds: &[(i64, BBox)],
    config: &TrackerConfig,
    frame_w: f32,
    frame_h: f32,
    max_lost: u32,
) -> Vec<(usize, HashSet<i64>)>
where
    I: Iterator<Item = (usize, &'a FrameDetections)>,
{
    let mut trackers: Vec<SubjectTracker> = seeds
        .iter()
        .map(|(id, bbox)| SubjectTracker::new(config.clone(), *id, Some(*bbox), max_lost))
        .collect();

    let mut out = Vec::new();
    for (ri, frame) in frames {
        let mut claimed: HashSet<i64> = HashSet::new();
        for tracker in &mut trackers {
            if let Some((_, id)) = tracker.update(&frame.detections, frame_w, frame_h, &claimed) {
                claimed.insert(id);
            }
        }
        out.push((ri, claimed));
    }
    out
}

/// Select subjects across the whole sequence from a reference frame.
///
/// `reference_frame_index` is a source-video frame number; the retained
/// frame closest to it is used as the reference.
pub fn select_subjects(
    frames: &[FrameDetections],
    selections: &[ReferenceSelection],
    reference_frame_index: u64,
    frame_w: f32,
    frame_h: f32,
    effective_fps: f32,
    config: &TrackerConfig,
) -> SelectionResult {
    let mut selected_per_frame: Vec<HashSet<i64>> = vec![HashSet::new(); frames.len()];
    if frames.is_empty() {
        return SelectionResult {
            selected_per_frame,
            seeds: Vec::new(),
        };
    }

    let ref_idx = (0..frames.len())
        .min_by_key(|&i| frames[i].frame_index.abs_diff(reference_frame_index))
        .unwrap_or(0);

    let seeds = seed_selections(&frames[ref_idx], selections, config.min_seed_iou);
    if seeds.is_empty() {
        info!("no reference selections could be seeded");
        return SelectionResult {
            selected_per_frame,
            seeds,
        };
    }

    for (id, _) in &seeds {
        selected_per_frame[ref_idx].insert(*id);
    }

    let max_lost = config.max_lost_frames(effective_fps);

    // Forward and backward passes are independent: freshly seeded
    // trackers, read-only access to the frame list.
    let (forward, backward) = thread::scope(|s| {
        let fwd = s.spawn(|| {
            run_pass(
                frames.iter().enumerate().skip(ref_idx + 1),
                &seeds,
                config,
                frame_w,
                frame_h,
                max_lost,
            )
        });
        let bwd = s.spawn(|| {
            run_pass(
                frames.iter().enumerate().take(ref_idx).rev(),
                &seeds,
                config,
                frame_w,
                frame_h,
                max_lost,
            )
        });
        (fwd.join().expect("forward pass"), bwd.join().expect("backward pass"))
    });

    for (ri, ids) in forward.into_iter().chain(backward) {
        selected_per_frame[ri].extend(ids);
    }

    let covered = selected_per_frame.iter().filter(|s| !s.is_empty()).count();
    info!(
        subjects = seeds.len(),
        frames = frames.len(),
        covered,
        "batch selection complete"
    );

    SelectionResult {
        selected_per_frame,
        seeds,
    }
}

// ============================================================================
// TESTS
// ============================================================================
