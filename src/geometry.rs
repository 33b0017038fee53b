//! Planar value types shared by the transform and spiral modules

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::{PlanError, Result};

/// Relative tolerance used when testing three points for collinearity
const COLLINEAR_EPS: f64 = 1e-9;

/// A 2D point in whatever frame the caller is working in.
///
/// Serialized as a plain `[x, y]` pair so config files stay readable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length when the point is read as a vector
    #[inline]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn distance(&self, other: Point2D) -> f64 {
        (other - *self).norm()
    }

    /// Z component of the cross product of two vectors
    #[inline]
    pub fn cross(&self, other: Point2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    fn mul(self, k: f64) -> Point2D {
        Point2D::new(self.x * k, self.y * k)
    }
}

impl Neg for Point2D {
    type Output = Point2D;

    fn neg(self) -> Point2D {
        Point2D::new(-self.x, -self.y)
    }
}

/// Four ordered corners bounding a region.
///
/// The order encodes the traversal direction (clockwise or counter-clockwise),
/// which in turn decides which way a spiral over the region rotates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Quadrilateral {
    pub corners: [Point2D; 4],
}

impl Quadrilateral {
    pub fn new(corners: [Point2D; 4]) -> Self {
        Self { corners }
    }

    /// Side `i` runs from corner `i` to corner `(i + 1) % 4`
    pub fn side(&self, i: usize) -> Point2D {
        self.corners[(i + 1) % 4] - self.corners[i % 4]
    }

    /// Reject non-finite corners and coincident neighbours
    pub fn validate_sides(&self) -> Result<()> {
        for (i, c) in self.corners.iter().enumerate() {
            if !c.is_finite() {
                return Err(PlanError::InvalidParameter(format!(
                    "corner {} is not finite: ({}, {})",
                    i, c.x, c.y
                )));
            }
        }
        for i in 0..4 {
            if self.side(i).norm() == 0.0 {
                return Err(PlanError::InvalidParameter(format!(
                    "corners {} and {} coincide",
                    i,
                    (i + 1) % 4
                )));
            }
        }
        Ok(())
    }

    /// Check that no three of the four corners are collinear (or repeated).
    ///
    /// The test is relative to the lengths involved so it behaves the same for
    /// degree-sized geographic spans and thousand-pixel image spans.
    pub fn ensure_general_position(&self) -> Result<()> {
        const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];

        for (i, c) in self.corners.iter().enumerate() {
            if !c.is_finite() {
                return Err(PlanError::DegenerateGeometry(format!(
                    "point {} is not finite",
                    i
                )));
            }
        }

        for &(a, b, c) in &TRIPLES {
            let ab = self.corners[b] - self.corners[a];
            let ac = self.corners[c] - self.corners[a];
            let scale = ab.norm() * ac.norm();
            if scale == 0.0 || ab.cross(ac).abs() <= COLLINEAR_EPS * scale {
                return Err(PlanError::DegenerateGeometry(format!(
                    "points {}, {} and {} are collinear or coincident",
                    a, b, c
                )));
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> (Point2D, Point2D) {
        bounds_of(&self.corners).unwrap_or_default()
    }
}

impl From<[Point2D; 4]> for Quadrilateral {
    fn from(corners: [Point2D; 4]) -> Self {
        Self::new(corners)
    }
}

/// Axis-aligned bounds of a point set, `None` when empty
pub fn bounds_of(points: &[Point2D]) -> Option<(Point2D, Point2D)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(lo, hi), p| {
        (
            Point2D::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point2D::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}
