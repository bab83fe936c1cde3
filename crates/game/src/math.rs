use std::f64::consts::TAU;

pub const ANGLE_QUANTUM: f64 = TAU / 65535.0;

pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn angle_to(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    wrap_angle((y2 - y1).atan2(x2 - x1))
}

pub fn distance_squared(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    dx * dx + dy * dy
}

pub fn distance_to(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    distance_squared(x1, y1, x2, y2).sqrt()
}

/// Normalises an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle % TAU;
    if wrapped < 0.0 { wrapped + TAU } else { wrapped }
}

/// Unsigned difference between two angles, in `[0, π]`.
///
/// The dot product is clamped before `acos` so accumulated floating point
/// error on near-identical angles cannot produce NaN.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let (sin_a, cos_a) = a.sin_cos();
    let (sin_b, cos_b) = b.sin_cos();
    (sin_a * sin_b + cos_a * cos_b).clamp(-1.0, 1.0).acos()
}

/// Rotates `start` towards `end` by at most `step` radians, taking the
/// shorter way around.
pub fn angle_rotate(start: f64, end: f64, step: f64) -> f64 {
    if angle_difference(start, end) <= step {
        return wrap_angle(end);
    }

    let (sin_start, cos_start) = start.sin_cos();
    let (sin_end, cos_end) = end.sin_cos();
    if cos_start * sin_end - sin_start * cos_end > 0.0 {
        wrap_angle(start + step)
    } else {
        wrap_angle(start - step)
    }
}

/// Rotates `(x, y)` around `(ox, oy)` with the sine and cosine precomputed,
/// for use in per-vertex inner loops.
#[inline]
pub fn rotate_point2(x: f64, y: f64, sin_a: f64, cos_a: f64, ox: f64, oy: f64) -> (f64, f64) {
    let dx = x - ox;
    let dy = y - oy;
    (ox + dx * cos_a - dy * sin_a, oy + dy * cos_a + dx * sin_a)
}

pub fn angle_to_u16(angle: f64) -> u16 {
    (wrap_angle(angle) * 65535.0 / TAU).round() as u16
}

pub fn u16_to_angle(value: u16) -> f64 {
    value as f64 * TAU / 65535.0
}

fn orient(ax: f64, ay: f64, bx: f64, by: f64, px: f64, py: f64) -> f64 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

/// True if segment a1-a2 properly crosses segment b1-b2. Collinear overlap
/// does not count as an intersection, which is what the ray-cast parity test
/// and the polygon edge test both want.
pub fn segments_intersect(
    a1x: f64,
    a1y: f64,
    a2x: f64,
    a2y: f64,
    b1x: f64,
    b1y: f64,
    b2x: f64,
    b2y: f64,
) -> bool {
    let d1 = orient(b1x, b1y, b2x, b2y, a1x, a1y);
    let d2 = orient(b1x, b1y, b2x, b2y, a2x, a2y);
    let d3 = orient(a1x, a1y, a2x, a2y, b1x, b1y);
    let d4 = orient(a1x, a1y, a2x, a2y, b2x, b2y);

    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Compensated accumulator for the long-running game clock. Naive summation
/// of ~33 ms increments drifts visibly over minutes of play.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kahan {
    sum: f64,
    compensation: f64,
}

impl Kahan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    pub fn get(&self) -> f64 {
        self.sum
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.compensation = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_negative_angle() {
        let wrapped = wrap_angle(-0.0001);
        assert!((wrapped - (TAU - 0.0001)).abs() < 1e-12);
    }

    #[test]
    fn angle_difference_symmetric() {
        assert!((angle_difference(0.1, 6.1) - angle_difference(6.1, 0.1)).abs() < 1e-12);
        assert!(angle_difference(0.0, std::f64::consts::PI) <= std::f64::consts::PI);
    }

    #[test]
    fn angle_difference_identical_angles_no_nan() {
        let d = angle_difference(1.2345678, 1.2345678);
        assert!(d.is_finite());
        assert!(d < 1e-6);
    }

    #[test]
    fn rotate_takes_shorter_way() {
        // 0.1 rad to 6.2 rad is shorter going negative, through zero.
        let rotated = angle_rotate(0.1, 6.2, 0.05);
        assert!((rotated - 0.05).abs() < 1e-12);

        let rotated = angle_rotate(6.2, 0.1, 0.05);
        assert!((rotated - 6.25).abs() < 1e-12);
    }

    #[test]
    fn rotate_snaps_within_step() {
        let rotated = angle_rotate(1.0, 1.02, 0.05);
        assert!((rotated - 1.02).abs() < 1e-12);
    }

    #[test]
    fn angle_u16_round_trip_within_one_quantum() {
        for &angle in &[0.0, 0.5, 1.0, 3.14159, 6.28, TAU - 1e-9] {
            let decoded = u16_to_angle(angle_to_u16(angle));
            assert!(
                angle_difference(decoded, angle) < ANGLE_QUANTUM,
                "angle {angle} decoded to {decoded}"
            );
        }
    }

    #[test]
    fn segments_crossing() {
        assert!(segments_intersect(
            0.0, 0.0, 10.0, 10.0, 0.0, 10.0, 10.0, 0.0
        ));
        assert!(!segments_intersect(
            0.0, 0.0, 10.0, 0.0, 0.0, 1.0, 10.0, 1.0
        ));
    }

    #[test]
    fn kahan_beats_naive_summation() {
        let dt = 1.0 / 30.0;
        let mut kahan = Kahan::new();
        let mut naive = 0.0f64;
        for _ in 0..100_000 {
            kahan.add(dt);
            naive += dt;
        }
        let exact = 100_000.0 * dt;
        assert!((kahan.get() - exact).abs() <= (naive - exact).abs());
        assert!((kahan.get() - exact).abs() < 1e-9);
    }

    #[test]
    fn kahan_add_then_subtract_returns() {
        let mut kahan = Kahan::new();
        kahan.add(1234.5678);
        let before = kahan.get();
        kahan.add(0.1);
        kahan.add(-0.1);
        assert!((kahan.get() - before).abs() < 1e-12);
    }
}
