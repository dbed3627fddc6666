// src/tracking/continuity.rs
//
// Identity continuity tracker for one pre-selected subject.
//
// The upstream detector already runs its own appearance-based tracker and
// its identifiers are the primary signal: when our identifier is present
// and geometrically plausible we accept it outright. Spatial
// re-association is a fallback, used only after the identifier has been
// missing for a grace period, and a fallback candidate is never committed
// on a single sighting — it must reappear near the same place on
// consecutive frames before we adopt its identifier. This two-stage
// accept-then-confirm design avoids snapping onto a nearby but distinct
// subject during a brief single-frame ID mixup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::geometry::{frame_diagonal, BBox};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Max center displacement for a direct identifier match, as a
    /// fraction of the frame diagonal
    pub max_center_jump_ratio: f32,
    /// Frames to wait (trusting the upstream tracker to recover the
    /// identifier) before attempting spatial re-association
    pub grace_frames: u32,
    /// Consecutive sightings required before a fallback candidate's
    /// identifier is committed
    pub pending_needed: u32,
    /// Max displacement of a pending candidate between sightings, as a
    /// fraction of the frame diagonal
    pub pending_match_ratio: f32,
    /// Exponential smoothing factor for the running width/height estimate
    pub size_alpha: f32,
    /// Floor for the body extent used to scale the fallback search radius
    pub min_body_extent_px: f32,
    /// Fallback search radius = body extent × (base + per_frame × frames
    /// lost past grace), capped at cap_ratio × frame diagonal
    pub fallback_base_reach: f32,
    pub fallback_reach_per_frame: f32,
    pub fallback_cap_ratio: f32,
    /// Candidate area must be within [min, max] × the running size
    /// estimate; anything outside is an implausible scale jump
    pub min_area_ratio: f32,
    pub max_area_ratio: f32,
    /// Minimum composite score to start pending confirmation
    pub min_fallback_score: f32,
    /// Lost threshold = max(min_lost_frames, lost_after_seconds × fps)
    pub min_lost_frames: u32,
    pub lost_after_seconds: f32,
    /// Minimum IoU to seed a tracker from a reference-frame selection
    pub min_seed_iou: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_center_jump_ratio: 0.25,
            grace_frames: 4,
            pending_needed: 2,
            pending_match_ratio: 0.15,
            size_alpha: 0.15,
            min_body_extent_px: 50.0,
            fallback_base_reach: 3.0,
            fallback_reach_per_frame: 0.5,
            fallback_cap_ratio: 0.20,
            min_area_ratio: 0.2,
            max_area_ratio: 5.0,
            min_fallback_score: 0.15,
            min_lost_frames: 15,
            lost_after_seconds: 3.0,
            min_seed_iou: 0.10,
        }
    }
}

impl TrackerConfig {
    /// Frames without a confirmed match after which spatial fallback is
    /// disabled for the rest of the pass.
    pub fn max_lost_frames(&self, effective_fps: f32) -> u32 {
        self.min_lost_frames
            .max((self.lost_after_seconds * effective_fps) as u32)
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// One detection from the upstream detector for one frame. Identifiers
/// are unique within a frame but not stable across frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Detection {
    pub id: i64,
    pub bbox: BBox,
}

/// Observable tracker state, derived from the internal counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    /// Identifier matched on the most recent frame
    Active,
    /// Identifier missing, still within tolerated loss
    Grace,
    /// A spatial-fallback candidate is under confirmation
    PendingConfirm,
    /// Loss exceeded the maximum; fallback disabled
    Lost,
}

#[derive(Debug, Clone, Copy)]
struct PendingCandidate {
    id: i64,
    bbox: BBox,
    count: u32,
}

// ============================================================================
// TRACKER
// ============================================================================

/// Tracks one subject across a detection sequence. Created when the
/// subject is selected, mutated once per frame by `update`, and lives
/// for the duration of one pass over the video.
#[derive(Debug, Clone)]
pub struct SubjectTracker {
    config: TrackerConfig,
    current_id: i64,
    last_bbox: Option<BBox>,
    frames_lost: u32,
    avg_w: f32,
    avg_h: f32,
    pending: Option<PendingCandidate>,
    max_lost: u32,
}

impl SubjectTracker {
    pub fn new(config: TrackerConfig, id: i64, bbox: Option<BBox>, max_lost: u32) -> Self {
        // Default size estimate approximates a standing person when the
        // seed selection carried no box.
        let (avg_w, avg_h) = match &bbox {
            Some(b) => (b.width(), b.height()),
            None => (60.0, 120.0),
        };
        Self {
            config,
            current_id: id,
            last_bbox: bbox,
            frames_lost: 0,
            avg_w,
            avg_h,
            pending: None,
            max_lost,
        }
    }

    pub fn current_id(&self) -> i64 {
        self.current_id
    }

    pub fn frames_lost(&self) -> u32 {
        self.frames_lost
    }

    pub fn phase(&self) -> TrackPhase {
        if self.pending.is_some() {
            TrackPhase::PendingConfirm
        } else if self.frames_lost == 0 {
            TrackPhase::Active
        } else if self.frames_lost >= self.max_lost {
            TrackPhase::Lost
        } else {
            TrackPhase::Grace
        }
    }

    /// Process one frame of detections. Returns the best-estimate box and
    /// identifier, or `None` when the subject was not found this frame.
    /// `claimed_ids` holds identifiers already taken by sibling trackers
    /// in this frame; the caller must add the returned identifier to it.
    pub fn update(
        &mut self,
        detections: &[Detection],
        frame_w: f32,
        frame_h: f32,
        claimed_ids: &HashSet<i64>,
    ) -> Option<(BBox, i64)> {
        if detections.is_empty() {
            self.frames_lost += 1;
            self.pending = None;
            return None;
        }

        let diag = frame_diagonal(frame_w, frame_h);

        // Step 1: direct identifier match — trust the upstream tracker's
        // appearance matching unless the box jumped implausibly far.
        for det in detections {
            if det.id != self.current_id || claimed_ids.contains(&det.id) {
                continue;
            }
            if let Some(last) = &self.last_bbox {
                if last.center_dist(&det.bbox) > diag * self.config.max_center_jump_ratio {
                    continue;
                }
            }
            self.accept(det.bbox, det.id);
            self.pending = None;
            return Some((det.bbox, det.id));
        }

        // Step 1b: pending candidate confirmation. The pending identifier
        // must reappear near the pending box; tentative boxes are returned
        // immediately so downstream consumers are not starved, but the
        // identifier is only committed after pending_needed sightings.
        if let Some(pending) = self.pending {
            let confirm = detections.iter().find(|d| {
                d.id == pending.id
                    && !claimed_ids.contains(&d.id)
                    && pending.bbox.center_dist(&d.bbox) <= diag * self.config.pending_match_ratio
            });
            match confirm {
                Some(det) => {
                    let count = pending.count + 1;
                    if count >= self.config.pending_needed {
                        debug!(
                            id = det.id,
                            count, "pending candidate confirmed, adopting identifier"
                        );
                        self.accept(det.bbox, det.id);
                        self.pending = None;
                    } else {
                        self.pending = Some(PendingCandidate {
                            id: det.id,
                            bbox: det.bbox,
                            count,
                        });
                        self.last_bbox = Some(det.bbox);
                        self.frames_lost = 0;
                    }
                    return Some((det.bbox, det.id));
                }
                None => {
                    debug!(id = pending.id, "pending candidate vanished, discarding");
                    self.pending = None;
                }
            }
        }

        // Step 2: grace period. The upstream tracker usually recovers the
        // identifier within a few frames without help.
        if self.frames_lost < self.config.grace_frames {
            self.frames_lost += 1;
            return None;
        }

        // Step 3: spatial fallback, only between grace expiry and the
        // lost threshold.
        let last = match self.last_bbox {
            Some(b) if self.frames_lost < self.max_lost => b,
            _ => {
                self.frames_lost += 1;
                return None;
            }
        };

        let body_extent = self
            .avg_w
            .max(self.avg_h)
            .max(self.config.min_body_extent_px);
        let frames_past_grace = self.frames_lost.saturating_sub(self.config.grace_frames);
        // Search radius widens the longer the subject has been missing,
        // capped at a fraction of the frame diagonal.
        let max_dist = (body_extent
            * (self.config.fallback_base_reach
                + frames_past_grace as f32 * self.config.fallback_reach_per_frame))
            .min(diag * self.config.fallback_cap_ratio);

        let avg_area = self.avg_w * self.avg_h;
        let mut best: Option<(&Detection, f32)> = None;

        for det in detections {
            if claimed_ids.contains(&det.id) {
                continue;
            }

            let center_d = last.center_dist(&det.bbox);
            let edge_d = last.edge_dist(&det.bbox);
            if center_d.min(edge_d) > max_dist {
                continue;
            }

            let area_ratio = det.bbox.area() / (avg_area + 1e-6);
            if area_ratio < self.config.min_area_ratio || area_ratio > self.config.max_area_ratio {
                continue;
            }

            let iou = last.iou(&det.bbox);
            let center_score = (1.0 - center_d / max_dist).max(0.0);
            let edge_score = (1.0 - edge_d / max_dist).max(0.0);
            let score = iou * 0.5 + edge_score * 0.3 + center_score * 0.2;

            if best.map_or(true, |(_, s)| score > s) {
                best = Some((det, score));
            }
        }

        if let Some((det, score)) = best {
            if score > self.config.min_fallback_score {
                debug!(
                    id = det.id,
                    score, "spatial fallback candidate, starting confirmation"
                );
                self.pending = Some(PendingCandidate {
                    id: det.id,
                    bbox: det.bbox,
                    count: 1,
                });
                // Tentatively use the box without committing the identifier.
                self.last_bbox = Some(det.bbox);
                self.frames_lost = 0;
                return Some((det.bbox, det.id));
            }
        }

        self.frames_lost += 1;
        None
    }

    fn accept(&mut self, bbox: BBox, id: i64) {
        self.last_bbox = Some(bbox);
        self.current_id = id;
        self.frames_lost = 0;
        let alpha = self.config.size_alpha;
        self.avg_w = self.avg_w * (1.0 - alpha) + bbox.width() * alpha;
        self.avg_h = self.avg_h * (1.0 - alpha) + bbox.height() * alpha;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 1280.0;
    const H: f32 = 720.0;

    fn det(id: i64, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            id,
            bbox: BBox::new(x1, y1, x2, y2),
        }
    }

    fn tracker(id: i64, bbox: BBox) -> SubjectTracker {
        let cfg = TrackerConfig::default();
        let max_lost = cfg.max_lost_frames(10.0);
        SubjectTracker::new(cfg, id, Some(bbox), max_lost)
    }

    #[test]
    fn test_direct_match_every_frame_stays_active() {
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();
        for i in 0..20 {
            let dx = i as f32 * 2.0;
            let dets = vec![det(7, 100.0 + dx, 100.0, 150.0 + dx, 250.0)];
            let out = tr.update(&dets, W, H, &claimed);
            assert!(out.is_some());
            assert_eq!(out.unwrap().1, 7);
            assert_eq!(tr.phase(), TrackPhase::Active);
        }
    }

    #[test]
    fn test_zero_detections_monotonic_loss() {
        let mut tr = tracker(3, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();
        let mut prev = 0;
        for _ in 0..30 {
            assert!(tr.update(&[], W, H, &claimed).is_none());
            assert!(tr.frames_lost() >= prev);
            prev = tr.frames_lost();
        }
        assert_eq!(tr.phase(), TrackPhase::Lost);
    }

    #[test]
    fn test_brief_loss_within_grace_stays_out_of_pending() {
        // Identifier 7 missing for 3 frames (< grace 4), then back within
        // the plausibility radius: must go straight back to ACTIVE.
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();
        for _ in 0..3 {
            let out = tr.update(&[], W, H, &claimed);
            assert!(out.is_none());
            assert_ne!(tr.phase(), TrackPhase::PendingConfirm);
        }
        let out = tr.update(&[det(7, 105.0, 102.0, 155.0, 252.0)], W, H, &claimed);
        assert_eq!(out.unwrap().1, 7);
        assert_eq!(tr.phase(), TrackPhase::Active);
    }

    #[test]
    fn test_implausible_jump_of_own_id_rejected() {
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();
        // Same identifier reappears across the frame — further than 25%
        // of the diagonal. Treated as not found.
        let out = tr.update(&[det(7, 1100.0, 500.0, 1150.0, 650.0)], W, H, &claimed);
        assert!(out.is_none());
        assert_eq!(tr.frames_lost(), 1);
    }

    #[test]
    fn test_fallback_requires_two_confirming_frames() {
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();

        // Burn through the grace period with empty frames.
        for _ in 0..4 {
            tr.update(&[], W, H, &claimed);
        }

        // A nearby candidate with a new identifier appears.
        let candidate = det(9, 110.0, 105.0, 160.0, 255.0);
        let out = tr.update(&[candidate], W, H, &claimed);
        assert_eq!(out.unwrap().1, 9, "tentative box should be returned");
        assert_eq!(tr.phase(), TrackPhase::PendingConfirm);
        assert_eq!(
            tr.current_id(),
            7,
            "identifier must not be committed on a single sighting"
        );

        // Second consecutive sighting confirms.
        let out = tr.update(&[candidate], W, H, &claimed);
        assert_eq!(out.unwrap().1, 9);
        assert_eq!(tr.current_id(), 9);
        assert_eq!(tr.phase(), TrackPhase::Active);
    }

    #[test]
    fn test_pending_discarded_when_candidate_vanishes() {
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();
        for _ in 0..4 {
            tr.update(&[], W, H, &claimed);
        }
        let candidate = det(9, 110.0, 105.0, 160.0, 255.0);
        tr.update(&[candidate], W, H, &claimed);
        assert_eq!(tr.phase(), TrackPhase::PendingConfirm);

        // Candidate gone next frame: pending state is dropped, identifier
        // unchanged.
        tr.update(&[], W, H, &claimed);
        assert_ne!(tr.phase(), TrackPhase::PendingConfirm);
        assert_eq!(tr.current_id(), 7);
    }

    #[test]
    fn test_scale_jump_rejected_as_fallback() {
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let claimed = HashSet::new();
        for _ in 0..4 {
            tr.update(&[], W, H, &claimed);
        }
        // Candidate at the right place but 8x the area — implausible.
        let huge = det(9, 50.0, 0.0, 350.0, 500.0);
        assert!(tr.update(&[huge], W, H, &claimed).is_none());
        assert_eq!(tr.phase(), TrackPhase::Grace);
    }

    #[test]
    fn test_lost_disables_fallback_until_id_returns() {
        let cfg = TrackerConfig::default();
        let mut tr = SubjectTracker::new(cfg, 7, Some(BBox::new(100.0, 100.0, 150.0, 250.0)), 15);
        let claimed = HashSet::new();
        for _ in 0..15 {
            tr.update(&[], W, H, &claimed);
        }
        assert_eq!(tr.phase(), TrackPhase::Lost);

        // A plausible spatial candidate is ignored once lost.
        let candidate = det(9, 110.0, 105.0, 160.0, 255.0);
        assert!(tr.update(&[candidate], W, H, &claimed).is_none());

        // The original identifier reappearing is still accepted directly.
        let back = det(7, 110.0, 105.0, 160.0, 255.0);
        let out = tr.update(&[back], W, H, &claimed);
        assert_eq!(out.unwrap().1, 7);
        assert_eq!(tr.phase(), TrackPhase::Active);
    }

    #[test]
    fn test_claimed_id_excluded() {
        let mut tr = tracker(7, BBox::new(100.0, 100.0, 150.0, 250.0));
        let mut claimed = HashSet::new();
        claimed.insert(7);
        // Sibling already took identifier 7 this frame.
        let out = tr.update(&[det(7, 102.0, 100.0, 152.0, 250.0)], W, H, &claimed);
        assert!(out.is_none());
    }

    #[test]
    fn test_max_lost_frames_scales_with_fps() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.max_lost_frames(10.0), 30);
        assert_eq!(cfg.max_lost_frames(3.0), 15); // floor applies
    }
}
