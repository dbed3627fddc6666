// src/tracking/geometry.rs
//
// Bounding-box geometry shared by the continuity tracker and the
// reference-frame seeding. Pixel coordinates, x1/y1 top-left.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    /// Intersection-over-union. 0.0 for disjoint or degenerate boxes.
    pub fn iou(&self, other: &BBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    /// Distance between box centers.
    pub fn center_dist(&self, other: &BBox) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Minimum distance between box edges. Returns 0 when the boxes
    /// overlap. Handles sideways displacement where the new box is
    /// adjacent to the old one rather than overlapping it.
    pub fn edge_dist(&self, other: &BBox) -> f32 {
        let dx = (self.x1.max(other.x1) - self.x2.min(other.x2)).max(0.0);
        let dy = (self.y1.max(other.y1) - self.y2.min(other.y2)).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Diagonal of a frame, used to scale distance thresholds.
pub fn frame_diagonal(frame_w: f32, frame_h: f32) -> f32 {
    (frame_w * frame_w + frame_h * frame_h).sqrt()
}
