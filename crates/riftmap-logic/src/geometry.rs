//! Plane geometry shared by placement, line-of-sight and rift collision.
//!
//! Pure functions over [`Point`] values. Every distance is in world units
//! (reference radius already applied).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A position in generation space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians, scaled by `length`.
    pub fn polar(angle: f64, length: f64) -> Self {
        Self::new(angle.cos() * length, angle.sin() * length)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product. Positive when `other` is
    /// counter-clockwise from `self`.
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn normalized(self) -> Point {
        let len = self.length();
        if len <= f64::EPSILON {
            Point::ORIGIN
        } else {
            self * (1.0 / len)
        }
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    pub fn as_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Which side of a directed curve a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    /// Bounding box of a point set. Returns `None` for an empty set.
    pub fn from_points(points: &[Point]) -> Option<Aabb> {
        let first = *points.first()?;
        let mut bb = Aabb {
            min: first,
            max: first,
        };
        for p in &points[1..] {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
        }
        Some(bb)
    }

    pub fn around(center: Point, radius: f64) -> Aabb {
        Aabb {
            min: Point::new(center.x - radius, center.y - radius),
            max: Point::new(center.x + radius, center.y + radius),
        }
    }

    /// Grow every side by `pad`.
    pub fn padded(self, pad: f64) -> Aabb {
        Aabb {
            min: Point::new(self.min.x - pad, self.min.y - pad),
            max: Point::new(self.max.x + pad, self.max.y + pad),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

/// Closest distance from `p` to the segment `a`–`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Proper or touching intersection of segments `a1`–`a2` and `b1`–`b2`.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = (a2 - a1).cross(b1 - a1);
    let d2 = (a2 - a1).cross(b2 - a1);
    let d3 = (b2 - b1).cross(a1 - b1);
    let d4 = (b2 - b1).cross(a2 - b1);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear / touching cases
    let eps = 1e-12;
    (d1.abs() < eps && point_segment_distance(b1, a1, a2) < eps)
        || (d2.abs() < eps && point_segment_distance(b2, a1, a2) < eps)
        || (d3.abs() < eps && point_segment_distance(a1, b1, b2) < eps)
        || (d4.abs() < eps && point_segment_distance(a2, b1, b2) < eps)
}

/// Minimum distance between two segments (zero when they intersect).
pub fn segment_segment_distance(a1: Point, a2: Point, b1: Point, b2: Point) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    point_segment_distance(a1, b1, b2)
        .min(point_segment_distance(a2, b1, b2))
        .min(point_segment_distance(b1, a1, a2))
        .min(point_segment_distance(b2, a1, a2))
}

/// Total length of a polyline.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Closest distance from `p` to any segment of the polyline.
pub fn polyline_distance(p: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => p.distance(*only),
        _ => points
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// True when the segment `a`–`b` crosses the polyline.
pub fn segment_crosses_polyline(a: Point, b: Point, points: &[Point]) -> bool {
    points
        .windows(2)
        .any(|w| segments_intersect(a, b, w[0], w[1]))
}

/// Side of the directed polyline `points` that `p` lies on, judged against
/// the nearest segment, or against both segments meeting at the nearest
/// vertex. Points exactly on the curve count as `Left`.
pub fn side_of_polyline(p: Point, points: &[Point]) -> Option<Side> {
    let mut best: Option<(f64, usize)> = None;
    for (i, w) in points.windows(2).enumerate() {
        let d = point_segment_distance(p, w[0], w[1]);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, i));
        }
    }
    let (d, i) = best?;
    let at_vertex = |v: usize| p.distance(points[v]) <= d + VERTEX_EPSILON;

    if i + 2 < points.len() && at_vertex(i + 1) {
        return Some(side_at_vertex(p, points[i], points[i + 1], points[i + 2]));
    }
    if i > 0 && at_vertex(i) {
        return Some(side_at_vertex(p, points[i - 1], points[i], points[i + 1]));
    }
    let (a, b) = (points[i], points[i + 1]);
    Some(if (b - a).cross(p - a) >= 0.0 {
        Side::Left
    } else {
        Side::Right
    })
}

const VERTEX_EPSILON: f64 = 1e-9;

/// Side of the path `prev` → `v` → `next` for a point nearest to `v`. On a
/// left turn the left side is the wedge left of both segments; on a right
/// turn the right side is the wedge right of both.
fn side_at_vertex(p: Point, prev: Point, v: Point, next: Point) -> Side {
    let left_in = (v - prev).cross(p - prev) >= 0.0;
    let left_out = (next - v).cross(p - v) >= 0.0;
    let left = if (v - prev).cross(next - v) >= 0.0 {
        left_in && left_out
    } else {
        left_in || left_out
    };
    if left {
        Side::Left
    } else {
        Side::Right
    }
}

/// Smallest absolute difference between two headings, in radians `[0, π]`.
pub fn turn_angle(from_heading: f64, to_heading: f64) -> f64 {
    let mut d = (to_heading - from_heading) % std::f64::consts::TAU;
    if d < 0.0 {
        d += std::f64::consts::TAU;
    }
    if d > std::f64::consts::PI {
        std::f64::consts::TAU - d
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_point_segment_distance_projects_inside() {
        let d = point_segment_distance(p(0.5, 1.0), p(0.0, 0.0), p(1.0, 0.0));
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_segment_distance_clamps_to_endpoint() {
        let d = point_segment_distance(p(3.0, 4.0), p(-1.0, 0.0), p(0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_crossing_segments_intersect() {
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 2.0), p(0.0, 2.0), p(2.0, 0.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)));
    }

    #[test]
    fn test_touching_segments_intersect() {
        assert!(segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)));
    }

    #[test]
    fn test_parallel_segment_distance() {
        let d = segment_segment_distance(p(0.0, 0.0), p(4.0, 0.0), p(1.0, 0.5), p(3.0, 0.5));
        assert!((d - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_side_of_polyline() {
        let line = [p(-5.0, 0.0), p(0.0, 0.0), p(5.0, 0.0)];
        assert_eq!(side_of_polyline(p(1.0, 2.0), &line), Some(Side::Left));
        assert_eq!(side_of_polyline(p(-3.0, -0.1), &line), Some(Side::Right));
        assert_eq!(side_of_polyline(p(0.0, 1.0), &[p(0.0, 0.0)]), None);
    }

    #[test]
    fn test_side_beyond_a_sharp_vertex() {
        // Sharp left turn: the left side is the narrow wedge inside the bend.
        let bend = [p(-1.0, 0.0), p(0.0, 0.0), p(-1.0, 1.0)];
        assert_eq!(side_of_polyline(p(0.1, 0.05), &bend), Some(Side::Right));
        assert_eq!(side_of_polyline(p(-0.5, 0.2), &bend), Some(Side::Left));
        assert_eq!(side_of_polyline(p(0.0, -0.3), &bend), Some(Side::Right));

        // Mirrored: a sharp right turn.
        let bend = [p(-1.0, 0.0), p(0.0, 0.0), p(-1.0, -1.0)];
        assert_eq!(side_of_polyline(p(0.1, -0.05), &bend), Some(Side::Left));
        assert_eq!(side_of_polyline(p(-0.5, -0.2), &bend), Some(Side::Right));
        assert_eq!(side_of_polyline(p(0.0, 0.3), &bend), Some(Side::Left));
    }

    #[test]
    fn test_turn_angle_wraps() {
        let a = turn_angle(3.0, -3.0);
        assert!((a - (std::f64::consts::TAU - 6.0)).abs() < 1e-9);
        assert!(turn_angle(0.5, 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_aabb_padding_and_overlap() {
        let a = Aabb::from_points(&[p(0.0, 0.0), p(1.0, 1.0)]).unwrap();
        let b = Aabb::around(p(1.6, 1.6), 0.5);
        assert!(!a.intersects(&b));
        assert!(a.padded(0.2).intersects(&b));
    }

    #[test]
    fn test_polyline_length() {
        let line = [p(0.0, 0.0), p(3.0, 0.0), p(3.0, 4.0)];
        assert!((polyline_length(&line) - 7.0).abs() < 1e-9);
    }
}
