//! Turns grid-aligned paths into organic-looking trails.
//!
//! Pipeline: simplify, resample, terrain nudge, de-duplicate, smooth, then
//! restore the original endpoints. Every stage is deterministic.

use crate::spatial::{distance, distance_to_segment, lerp, polyline_length, unit_normal};
use crate::terrain::TerrainSampler;
use serde::{Deserialize, Serialize};

/// Upper bound on Chaikin iterations; each one doubles the point count.
pub const MAX_CHAIKIN_ITERATIONS: usize = 8;
/// Upper bound on Bézier samples per segment.
pub const MAX_BEZIER_SAMPLES: usize = 64;
/// No stage emits more points than this.
pub const MAX_OUTPUT_POINTS: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Smoothing {
    /// Corner cutting. Each iteration replaces a segment by two points at
    /// `ratio` and `1 - ratio` along it.
    Chaikin {
        #[serde(default = "default_iterations")]
        iterations: usize,
        #[serde(default = "default_ratio")]
        ratio: f64,
    },
    /// Cubic Bézier through every point with Catmull-Rom style handles.
    Bezier {
        #[serde(default = "default_tension")]
        tension: f64,
        #[serde(default = "default_samples")]
        samples: usize,
    },
}

fn default_iterations() -> usize {
    2
}

fn default_ratio() -> f64 {
    0.2
}

fn default_tension() -> f64 {
    0.5
}

fn default_samples() -> usize {
    8
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::Chaikin {
            iterations: default_iterations(),
            ratio: default_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaturalizeOptions {
    pub simplify_epsilon: f64,
    pub resample_spacing: f64,
    /// Perpendicular distance at which terrain is sampled on each side.
    pub nudge_offset: f64,
    pub nudge_strength: f64,
    pub terrain_sensitivity: f64,
    /// Points closer than this to their predecessor are dropped after nudging.
    pub min_point_spacing: f64,
    pub smoothing: Smoothing,
}

impl Default for NaturalizeOptions {
    fn default() -> Self {
        Self {
            simplify_epsilon: 22.0,
            resample_spacing: 80.0,
            nudge_offset: 30.0,
            nudge_strength: 2.0,
            terrain_sensitivity: 1.0,
            min_point_spacing: 15.0,
            smoothing: Smoothing::default(),
        }
    }
}

/// Run the full naturalization pipeline.
///
/// Inputs with fewer than two points are returned unchanged. The first and
/// last output points are always the first and last input points.
pub fn naturalize<S>(points: &[[f64; 2]], sampler: &S, options: &NaturalizeOptions) -> Vec<[f64; 2]>
where
    S: TerrainSampler + ?Sized,
{
    if points.len() < 2 {
        return points.to_vec();
    }

    let simplified = simplify(points, options.simplify_epsilon);
    let resampled = resample(&simplified, options.resample_spacing);
    let nudged = nudge(&resampled, sampler, options);
    let spaced = dedup(&nudged, options.min_point_spacing);
    let mut smoothed = match options.smoothing {
        Smoothing::Chaikin { iterations, ratio } => chaikin(&spaced, iterations, ratio),
        Smoothing::Bezier { tension, samples } => bezier(&spaced, tension, samples),
    };

    if smoothed.len() < 2 {
        return points.to_vec();
    }
    let last = smoothed.len() - 1;
    smoothed[0] = points[0];
    smoothed[last] = points[points.len() - 1];
    smoothed
}

/// Ramer-Douglas-Peucker simplification.
pub fn simplify(points: &[[f64; 2]], epsilon: f64) -> Vec<[f64; 2]> {
    if points.len() < 3 || !(epsilon > 0.0) {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut split = first;
        for i in first + 1..last {
            let d = distance_to_segment(points[i], points[first], points[last]);
            if d > max_dist {
                max_dist = d;
                split = i;
            }
        }
        if max_dist > epsilon {
            keep[split] = true;
            stack.push((first, split));
            stack.push((split, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

/// Insert evenly spaced points along every segment. Corners are kept.
pub fn resample(points: &[[f64; 2]], spacing: f64) -> Vec<[f64; 2]> {
    if points.len() < 2 || !spacing.is_finite() || spacing <= 0.0 {
        return points.to_vec();
    }
    // Widen the spacing when the path would otherwise exceed the point cap.
    let budget = MAX_OUTPUT_POINTS.saturating_sub(points.len()).max(1) as f64;
    let spacing = spacing.max(1.0).max(polyline_length(points) / budget);
    if !spacing.is_finite() {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);
        let pieces = ((distance(a, b) / spacing).ceil() as usize).min(MAX_OUTPUT_POINTS);
        for k in 1..pieces {
            out.push(lerp(a, b, k as f64 / pieces as f64));
        }
    }
    out.push(points[points.len() - 1]);
    out
}

/// Push interior points sideways toward cheaper terrain.
///
/// A point moves only when one side is strictly cheaper than both the centre
/// and the other side. The shift is
/// `strength × sensitivity × (centre - best) / worst`, with the ratio clamped
/// to `[0, 1]` and an impassable centre counting as a full ratio.
pub fn nudge<S>(points: &[[f64; 2]], sampler: &S, options: &NaturalizeOptions) -> Vec<[f64; 2]>
where
    S: TerrainSampler + ?Sized,
{
    let mut out = points.to_vec();
    if points.len() < 3 {
        return out;
    }

    for i in 1..points.len() - 1 {
        let Some(normal) = unit_normal(points[i - 1], points[i + 1]) else {
            continue;
        };
        let p = points[i];
        let offset = options.nudge_offset;
        let left = [p[0] + normal[0] * offset, p[1] + normal[1] * offset];
        let right = [p[0] - normal[0] * offset, p[1] - normal[1] * offset];

        let center_cost = sampler.cost_at(p[0], p[1]);
        let left_cost = sampler.cost_at(left[0], left[1]);
        let right_cost = sampler.cost_at(right[0], right[1]);

        let (side, best) = if left_cost < center_cost && left_cost < right_cost {
            (1.0, left_cost)
        } else if right_cost < center_cost && right_cost < left_cost {
            (-1.0, right_cost)
        } else {
            continue;
        };

        let ratio = if center_cost.is_infinite() {
            1.0
        } else {
            let worst = [center_cost, left_cost, right_cost]
                .into_iter()
                .filter(|c| c.is_finite())
                .fold(0.0, f64::max);
            if worst > 0.0 {
                ((center_cost - best) / worst).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        let shift = side * ratio * options.nudge_strength * options.terrain_sensitivity;
        out[i] = [p[0] + normal[0] * shift, p[1] + normal[1] * shift];
    }
    out
}

/// Drop points closer than `min_spacing` to the last kept point. The final
/// point is always kept.
pub fn dedup(points: &[[f64; 2]], min_spacing: f64) -> Vec<[f64; 2]> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = vec![points[0]];
    for &p in &points[1..points.len() - 1] {
        if let Some(&prev) = out.last() {
            if distance(prev, p) < min_spacing {
                continue;
            }
        }
        out.push(p);
    }
    out.push(points[points.len() - 1]);
    out
}

/// Chaikin corner cutting; endpoints are kept.
pub fn chaikin(points: &[[f64; 2]], iterations: usize, ratio: f64) -> Vec<[f64; 2]> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let ratio = ratio.clamp(0.0, 0.5);

    let mut current = points.to_vec();
    for _ in 0..iterations.min(MAX_CHAIKIN_ITERATIONS) {
        if current.len() * 2 > MAX_OUTPUT_POINTS {
            break;
        }
        let mut next = Vec::with_capacity(current.len() * 2);
        next.push(current[0]);
        for pair in current.windows(2) {
            next.push(lerp(pair[0], pair[1], ratio));
            next.push(lerp(pair[0], pair[1], 1.0 - ratio));
        }
        next.push(current[current.len() - 1]);
        current = next;
    }
    current
}

/// Piecewise cubic Bézier through the points, `samples` points per segment.
pub fn bezier(points: &[[f64; 2]], tension: f64, samples: usize) -> Vec<[f64; 2]> {
    if points.len() < 3 || samples == 0 {
        return points.to_vec();
    }
    let n = points.len();
    let k = tension / 3.0;
    let samples = samples
        .min(MAX_BEZIER_SAMPLES)
        .min((MAX_OUTPUT_POINTS / (n - 1)).max(1));

    let mut out = Vec::with_capacity((n - 1) * samples + 1);
    for i in 0..n - 1 {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(n - 1)];

        let c1 = [p1[0] + (p2[0] - p0[0]) * k, p1[1] + (p2[1] - p0[1]) * k];
        let c2 = [p2[0] - (p3[0] - p1[0]) * k, p2[1] - (p3[1] - p1[1]) * k];

        for s in 0..samples {
            let t = s as f64 / samples as f64;
            out.push(cubic(p1, c1, c2, p2, t));
        }
    }
    out.push(points[n - 1]);
    out
}

fn cubic(p0: [f64; 2], c1: [f64; 2], c2: [f64; 2], p1: [f64; 2], t: f64) -> [f64; 2] {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    [
        a * p0[0] + b * c1[0] + c * c2[0] + d * p1[0],
        a * p0[1] + b * c1[1] + c * c2[1] + d * p1[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(_x: f64, _y: f64) -> f64 {
        1.0
    }

    fn staircase() -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for i in 0..10 {
            let step = i as f64 * 50.0;
            points.push([step, step]);
            points.push([step + 50.0, step]);
        }
        points.push([500.0, 500.0]);
        points
    }

    #[test]
    fn trivial_inputs_are_returned_unchanged() {
        let options = NaturalizeOptions::default();
        assert!(naturalize(&[], &flat, &options).is_empty());
        assert_eq!(naturalize(&[[3.0, 4.0]], &flat, &options), vec![[3.0, 4.0]]);

        let pair = [[0.0, 0.0], [400.0, 30.0]];
        let out = naturalize(&pair, &flat, &options);
        assert_eq!(out.first(), Some(&pair[0]));
        assert_eq!(out.last(), Some(&pair[1]));
    }

    #[test]
    fn endpoints_survive_every_smoothing_mode() {
        let path = staircase();
        for smoothing in [
            Smoothing::default(),
            Smoothing::Bezier {
                tension: 0.5,
                samples: 8,
            },
            Smoothing::Chaikin {
                iterations: 5,
                ratio: 0.25,
            },
        ] {
            let options = NaturalizeOptions {
                smoothing,
                ..NaturalizeOptions::default()
            };
            let out = naturalize(&path, &flat, &options);
            assert_eq!(out[0], path[0]);
            assert_eq!(out[out.len() - 1], path[path.len() - 1]);
        }
    }

    #[test]
    fn output_is_deterministic() {
        let path = staircase();
        let sampler = |x: f64, y: f64| if x > y { 3.0 } else { 1.0 };
        let options = NaturalizeOptions::default();
        assert_eq!(
            naturalize(&path, &sampler, &options),
            naturalize(&path, &sampler, &options)
        );
    }

    #[test]
    fn simplify_removes_collinear_points() {
        let line = [[0.0, 0.0], [10.0, 0.1], [20.0, -0.1], [30.0, 0.0]];
        assert_eq!(simplify(&line, 22.0), vec![[0.0, 0.0], [30.0, 0.0]]);

        let corner = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0]];
        assert_eq!(simplify(&corner, 22.0), corner.to_vec());
    }

    #[test]
    fn resample_keeps_corners_and_limits_spacing() {
        let corner = [[0.0, 0.0], [200.0, 0.0], [200.0, 100.0]];
        let out = resample(&corner, 80.0);

        assert!(out.contains(&[200.0, 0.0]));
        assert_eq!(out.first(), Some(&[0.0, 0.0]));
        assert_eq!(out.last(), Some(&[200.0, 100.0]));
        assert!(out.windows(2).all(|w| distance(w[0], w[1]) <= 80.0 + 1e-9));
        assert!((polyline_length(&out) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn nudge_moves_toward_cheaper_side() {
        // Walking +x; the normal points to +y, which is cheap.
        let sampler = |_x: f64, y: f64| if y > 10.0 { 1.0 } else { 3.0 };
        let points = [[0.0, 0.0], [50.0, 0.0], [100.0, 0.0]];
        let out = nudge(&points, &sampler, &NaturalizeOptions::default());

        // ratio = (3 - 1) / 3, strength 2, sensitivity 1.
        assert!((out[1][1] - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(out[1][0], 50.0);
        assert_eq!(out[0], points[0]);
        assert_eq!(out[2], points[2]);
    }

    #[test]
    fn nudge_ignores_comparable_sides() {
        let sampler = |_x: f64, y: f64| if y.abs() > 10.0 { 1.0 } else { 3.0 };
        let points = [[0.0, 0.0], [50.0, 0.0], [100.0, 0.0]];
        assert_eq!(nudge(&points, &sampler, &NaturalizeOptions::default()), points.to_vec());
    }

    #[test]
    fn nudge_out_of_impassable_uses_full_strength() {
        let sampler = |_x: f64, y: f64| if y < -10.0 { 1.0 } else { f64::INFINITY };
        let points = [[0.0, 0.0], [50.0, 0.0], [100.0, 0.0]];
        let out = nudge(&points, &sampler, &NaturalizeOptions::default());
        assert!((out[1][1] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn dedup_keeps_last_point() {
        let points = [[0.0, 0.0], [5.0, 0.0], [30.0, 0.0], [35.0, 0.0]];
        assert_eq!(dedup(&points, 15.0), vec![[0.0, 0.0], [30.0, 0.0], [35.0, 0.0]]);
    }

    #[test]
    fn chaikin_cuts_corners() {
        let corner = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0]];
        let out = chaikin(&corner, 1, 0.25);
        assert_eq!(
            out,
            vec![
                [0.0, 0.0],
                [25.0, 0.0],
                [75.0, 0.0],
                [100.0, 25.0],
                [100.0, 75.0],
                [100.0, 100.0]
            ]
        );
        assert!(!out.contains(&[100.0, 0.0]));
    }

    #[test]
    fn bezier_passes_through_control_points() {
        let corner = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0]];
        let out = bezier(&corner, 0.5, 4);
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], corner[0]);
        assert_eq!(out[4], corner[1]);
        assert_eq!(out[8], corner[2]);
    }

    #[test]
    fn options_deserialize_with_bezier_smoothing() {
        let options: NaturalizeOptions = serde_json::from_value(serde_json::json!({
            "simplify_epsilon": 10.0,
            "smoothing": { "method": "bezier", "tension": 0.3, "samples": 6 }
        }))
        .unwrap();
        assert_eq!(options.simplify_epsilon, 10.0);
        assert_eq!(options.resample_spacing, 80.0);
        assert_eq!(
            options.smoothing,
            Smoothing::Bezier {
                tension: 0.3,
                samples: 6
            }
        );
    }

    #[test]
    fn bare_smoothing_method_uses_defaults() {
        let smoothing: Smoothing =
            serde_json::from_value(serde_json::json!({ "method": "bezier" })).unwrap();
        assert_eq!(
            smoothing,
            Smoothing::Bezier {
                tension: 0.5,
                samples: 8
            }
        );
    }

    #[test]
    fn smoothing_output_is_bounded() {
        let corner = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0]];
        let capped = chaikin(&corner, MAX_CHAIKIN_ITERATIONS, 0.25);
        assert_eq!(chaikin(&corner, 22, 0.25), capped);
        assert!(capped.len() <= MAX_OUTPUT_POINTS);
        assert_eq!(bezier(&corner, 0.5, 1_000_000).len(), 2 * MAX_BEZIER_SAMPLES + 1);
    }

    #[test]
    fn resampling_a_huge_span_is_capped() {
        let span = [[0.0, 0.0], [1.0e12, 0.0]];
        let out = resample(&span, 1.0);
        assert!(out.len() <= MAX_OUTPUT_POINTS + 1);
        assert_eq!(out.first(), Some(&span[0]));
        assert_eq!(out.last(), Some(&span[1]));

        let options = NaturalizeOptions {
            smoothing: Smoothing::Chaikin {
                iterations: 22,
                ratio: 0.25,
            },
            ..NaturalizeOptions::default()
        };
        let out = naturalize(&span, &flat, &options);
        assert!(out.len() <= MAX_OUTPUT_POINTS);
        assert_eq!(out.last(), Some(&span[1]));
    }
}
