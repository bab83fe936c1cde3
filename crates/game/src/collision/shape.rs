use std::sync::Arc;

use glam::DVec2;

use crate::math::segments_intersect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Aabb {
    pub fn overlaps(&self, other: &Aabb, off_x: f64, off_y: f64) -> bool {
        self.left <= other.right + off_x
            && self.right >= other.left + off_x
            && self.top <= other.bottom + off_y
            && self.bottom >= other.top + off_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// A rotatable polygon in the owner's local space, with the rotated copy and
/// its bounding box cached against the last-set angle.
#[derive(Debug, Clone)]
pub struct CollisionShape {
    source: Arc<Vec<DVec2>>,
    rotated: Vec<DVec2>,
    angle: f64,
    bounds: Aabb,
}

impl CollisionShape {
    pub fn new(source: Arc<Vec<DVec2>>) -> Self {
        let mut shape = Self {
            rotated: source.as_ref().clone(),
            source,
            angle: f64::NAN,
            bounds: Aabb {
                left: 0.0,
                top: 0.0,
                right: 0.0,
                bottom: 0.0,
            },
        };
        shape.update(0.0);
        shape
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn points(&self) -> &[DVec2] {
        &self.rotated
    }

    /// Rotates the source polygon to `angle` and recomputes the bounding
    /// box. A repeat call with the cached angle leaves everything untouched.
    pub fn update(&mut self, angle: f64) {
        if angle == self.angle {
            return;
        }
        self.angle = angle;

        let (sin_a, cos_a) = angle.sin_cos();
        let mut left = f64::INFINITY;
        let mut top = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::NEG_INFINITY;

        for (i, p) in self.source.iter().enumerate() {
            let x = p.x * cos_a - p.y * sin_a;
            let y = p.y * cos_a + p.x * sin_a;
            self.rotated[i] = DVec2::new(x, y);
            left = left.min(x);
            top = top.min(y);
            right = right.max(x);
            bottom = bottom.max(y);
        }

        self.bounds = Aabb {
            left,
            top,
            right,
            bottom,
        };
    }

    /// Ray-cast point containment: count edge crossings on a segment from
    /// the query point to a point guaranteed outside the bounds. Odd count
    /// means inside.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }

        let out_x = self.bounds.left;
        let out_y = self.bounds.top - 10.0;

        let mut crossings = 0u32;
        let n = self.rotated.len();
        for i in 0..n {
            let a = self.rotated[i];
            let b = self.rotated[(i + 1) % n];
            if segments_intersect(x, y, out_x, out_y, a.x, a.y, b.x, b.y) {
                crossings += 1;
            }
        }
        crossings % 2 == 1
    }

    /// Polygon-polygon intersection where `(off_x, off_y)` is the other
    /// shape's world position minus this shape's. Assumes simple polygons
    /// with low vertex counts; the edge test is quadratic.
    pub fn intersects_other(&self, other: &CollisionShape, off_x: f64, off_y: f64) -> bool {
        if !self.bounds.overlaps(&other.bounds, off_x, off_y) {
            return false;
        }

        // One polygon fully inside the other has no edge crossings, so check
        // a single vertex of each first.
        if let Some(p) = other.rotated.first() {
            if self.contains_point(p.x + off_x, p.y + off_y) {
                return true;
            }
        }
        if let Some(p) = self.rotated.first() {
            if other.contains_point(p.x - off_x, p.y - off_y) {
                return true;
            }
        }

        let n = self.rotated.len();
        let m = other.rotated.len();
        for i in 0..n {
            let a1 = self.rotated[i];
            let a2 = self.rotated[(i + 1) % n];
            for j in 0..m {
                let b1 = other.rotated[j];
                let b2 = other.rotated[(j + 1) % m];
                if segments_intersect(
                    a1.x,
                    a1.y,
                    a2.x,
                    a2.y,
                    b1.x + off_x,
                    b1.y + off_y,
                    b2.x + off_x,
                    b2.y + off_y,
                ) {
                    return true;
                }
            }
        }

        false
    }
}
