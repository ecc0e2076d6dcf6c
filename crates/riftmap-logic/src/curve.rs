//! Parametric curves fitted through rift keypoints.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// A curve evaluated on `t ∈ [0, 1]`.
pub trait CurveEquation {
    fn evaluate(&self, t: f64) -> Point;

    /// Evaluate at a fixed parameter resolution chosen so consecutive samples
    /// are roughly `step` apart along the control polygon.
    fn sample(&self, approx_length: f64, step: f64) -> Vec<Point> {
        let n = if step > 0.0 {
            ((approx_length / step).ceil() as usize).max(1)
        } else {
            1
        };
        (0..=n).map(|i| self.evaluate(i as f64 / n as f64)).collect()
    }
}

/// Uniform Catmull-Rom spline through every control point. End tangents use
/// mirrored phantom points, so the curve starts and ends exactly on the
/// first and last control points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineCurve {
    pub control: Vec<Point>,
}

impl SplineCurve {
    pub fn new(control: Vec<Point>) -> Self {
        Self { control }
    }

    fn control_at(&self, i: isize) -> Point {
        let n = self.control.len() as isize;
        if i < 0 {
            let (a, b) = (self.control[0], self.control[1]);
            a + (a - b)
        } else if i >= n {
            let (a, b) = (self.control[(n - 1) as usize], self.control[(n - 2) as usize]);
            a + (a - b)
        } else {
            self.control[i as usize]
        }
    }
}

impl CurveEquation for SplineCurve {
    fn evaluate(&self, t: f64) -> Point {
        match self.control.len() {
            0 => return Point::ORIGIN,
            1 => return self.control[0],
            _ => {}
        }
        let segments = self.control.len() - 1;
        let scaled = t.clamp(0.0, 1.0) * segments as f64;
        let seg = (scaled.floor() as usize).min(segments - 1);
        let u = scaled - seg as f64;
        let i = seg as isize;

        let p0 = self.control_at(i - 1);
        let p1 = self.control_at(i);
        let p2 = self.control_at(i + 1);
        let p3 = self.control_at(i + 2);

        let u2 = u * u;
        let u3 = u2 * u;
        let blend = |a: f64, b: f64, c: f64, d: f64| {
            0.5 * ((2.0 * b)
                + (-a + c) * u
                + (2.0 * a - 5.0 * b + 4.0 * c - d) * u2
                + (-a + 3.0 * b - 3.0 * c + d) * u3)
        };
        Point::new(
            blend(p0.x, p1.x, p2.x, p3.x),
            blend(p0.y, p1.y, p2.y, p3.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_passes_through_control_points() {
        let curve = SplineCurve::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 1.0),
        ]);
        assert!(approx(curve.evaluate(0.0), curve.control[0]));
        assert!(approx(curve.evaluate(1.0 / 3.0), curve.control[1]));
        assert!(approx(curve.evaluate(2.0 / 3.0), curve.control[2]));
        assert!(approx(curve.evaluate(1.0), curve.control[3]));
    }

    #[test]
    fn test_straight_line_stays_straight() {
        let curve = SplineCurve::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ]);
        for s in curve.sample(2.0, 0.1) {
            assert!(s.y.abs() < 1e-12);
            assert!((-1e-12..=2.0 + 1e-12).contains(&s.x));
        }
    }

    #[test]
    fn test_sample_resolution() {
        let curve = SplineCurve::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let samples = curve.sample(1.0, 0.25);
        assert_eq!(samples.len(), 5);
        assert!(approx(samples[2], Point::new(0.5, 0.0)));
    }
}
