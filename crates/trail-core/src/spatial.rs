//! Planar geometry helpers for map coordinates.
//!
//! The map is a flat image, so all distances are Euclidean in map units.

/// Tolerance below which a denominator is treated as zero.
const PARALLEL_EPS: f64 = 1e-12;

/// Euclidean distance between two points.
pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

/// Linear interpolation between `a` and `b` at parameter `t`.
pub fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

/// Total length of a polyline.
pub fn polyline_length(points: &[[f64; 2]]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Check if a point is inside a polygon ring.
/// Uses ray casting; the ring may be open or closed.
pub fn point_in_polygon(x: f64, y: f64, ring: &[[f64; 2]]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];

        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Parametric intersection test between segments `a1 -> a2` and `b1 -> b2`.
///
/// Parallel (and collinear) segments are reported as not intersecting.
pub fn segments_intersect(a1: [f64; 2], a2: [f64; 2], b1: [f64; 2], b2: [f64; 2]) -> bool {
    let d1 = [a2[0] - a1[0], a2[1] - a1[1]];
    let d2 = [b2[0] - b1[0], b2[1] - b1[1]];
    let denom = d1[0] * d2[1] - d1[1] * d2[0];
    if denom.abs() < PARALLEL_EPS {
        return false;
    }

    let ox = b1[0] - a1[0];
    let oy = b1[1] - a1[1];
    let t = (ox * d2[1] - oy * d2[0]) / denom;
    let u = (ox * d1[1] - oy * d1[0]) / denom;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Check if segment `a -> b` crosses any edge of a polygon ring.
pub fn segment_crosses_ring(a: [f64; 2], b: [f64; 2], ring: &[[f64; 2]]) -> bool {
    let n = ring.len();
    if n < 2 {
        return false;
    }
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        if p == q {
            continue;
        }
        if segments_intersect(a, b, p, q) {
            return true;
        }
    }
    false
}

/// Minimum distance from point `p` to the segment `a -> b`.
pub fn distance_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let sx = b[0] - a[0];
    let sy = b[1] - a[1];
    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < PARALLEL_EPS {
        return distance(p, a);
    }

    // Project point onto segment line: t = ((P-A) · (B-A)) / |B-A|²
    let t = (((p[0] - a[0]) * sx + (p[1] - a[1]) * sy) / seg_len_sq).clamp(0.0, 1.0);
    distance(p, [a[0] + t * sx, a[1] + t * sy])
}

/// Unit vector perpendicular (rotated +90°) to the direction `from -> to`.
/// Returns `None` for a degenerate direction.
pub fn unit_normal(from: [f64; 2], to: [f64; 2]) -> Option<[f64; 2]> {
    let dx = to[0] - from[0];
    let dy = to[1] - from[1];
    let len = (dx * dx + dy * dy).sqrt();
    if len < PARALLEL_EPS {
        return None;
    }
    Some([-dy / len, dx / len])
}
