//! Perspective transformation between coordinate frames
//!
//! This module implements the planar perspective (homography) mapping that
//! connects two frames given four corresponding points in each, e.g. a local
//! metric grid and latitude/longitude, or latitude/longitude and image pixels.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use rayon::prelude::*;

use crate::error::{PlanError, Result};
use crate::geometry::{Point2D, Quadrilateral};

/// Below this magnitude the homogeneous coordinate is treated as zero
const PROJECTION_EPS: f64 = 1e-12;

/// A 3x3 homography acting on homogeneous coordinates, normalized so `h33 = 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Build from nine coefficients in row-major order
    pub fn from_row_major(h: [f64; 9]) -> Self {
        Self(Matrix3::from_row_slice(&h))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// nalgebra stores columns first, so the transpose's storage is row-major
    pub fn to_row_major(&self) -> [f64; 9] {
        let mut out = [0.0; 9];
        out.copy_from_slice(self.0.transpose().as_slice());
        out
    }

    /// Lift, multiply, then divide by the third coordinate
    #[inline]
    pub fn apply(&self, p: Point2D) -> Result<Point2D> {
        let v = self.0 * Vector3::new(p.x, p.y, 1.0);
        let w = v.z;
        if !w.is_finite() || w.abs() <= PROJECTION_EPS {
            return Err(PlanError::SingularProjection { x: p.x, y: p.y });
        }
        let mapped = Point2D::new(v.x / w, v.y / w);
        if !mapped.is_finite() {
            return Err(PlanError::SingularProjection { x: p.x, y: p.y });
        }
        Ok(mapped)
    }
}

/// Forward and reverse homographies between two frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    /// Maps the source frame into the destination frame
    forward: Homography,
    /// Maps the destination frame back into the source frame.
    /// Solved from the swapped correspondences, not by inverting `forward`.
    reverse: Homography,
}

impl PerspectiveTransform {
    /// Compute the perspective transform from 4 source points to 4 destination points
    pub fn compute(src: &Quadrilateral, dst: &Quadrilateral) -> Result<Self> {
        src.ensure_general_position()?;
        dst.ensure_general_position()?;

        let forward = compute_homography(src, dst)?;
        let reverse = compute_homography(dst, src)?;

        tracing::trace!(?forward, ?reverse, "computed perspective transform");

        Ok(Self { forward, reverse })
    }

    pub fn forward(&self) -> &Homography {
        &self.forward
    }

    pub fn reverse(&self) -> &Homography {
        &self.reverse
    }

    /// The same mapping with source and destination swapped
    pub fn inverted(&self) -> Self {
        Self {
            forward: self.reverse,
            reverse: self.forward,
        }
    }

    /// Transform a point from source to destination coordinates
    #[inline]
    pub fn transform_point(&self, p: Point2D) -> Result<Point2D> {
        self.forward.apply(p)
    }

    /// Transform a point from destination to source coordinates (inverse)
    #[inline]
    pub fn inverse_transform_point(&self, p: Point2D) -> Result<Point2D> {
        self.reverse.apply(p)
    }

    /// Map a batch of source points, preserving order
    pub fn transform_points(&self, points: &[Point2D]) -> Result<Vec<Point2D>> {
        apply_batch(&self.forward, points)
    }

    /// Map a batch of destination points back to the source frame
    pub fn inverse_transform_points(&self, points: &[Point2D]) -> Result<Vec<Point2D>> {
        apply_batch(&self.reverse, points)
    }
}

/// Derive `(H_forward, H_reverse)` from four `p -> q` correspondences
pub fn build_transform(p: [Point2D; 4], q: [Point2D; 4]) -> Result<(Homography, Homography)> {
    let t = PerspectiveTransform::compute(&Quadrilateral::new(p), &Quadrilateral::new(q))?;
    Ok((t.forward, t.reverse))
}

/// Apply either direction of a transform to a single point
#[inline]
pub fn apply_transform(h: &Homography, p: Point2D) -> Result<Point2D> {
    h.apply(p)
}

/// Points are independent, so the batch is mapped in parallel
pub fn apply_batch(h: &Homography, points: &[Point2D]) -> Result<Vec<Point2D>> {
    points.par_iter().map(|&p| h.apply(p)).collect()
}

/// Compute a 3x3 homography matrix from 4 point correspondences.
///
/// For each correspondence (x,y) -> (x',y') with h33 fixed to 1:
///   x*h11 + y*h12 + h13 - x'*x*h31 - x'*y*h32 = x'
///   x*h21 + y*h22 + h23 - y'*x*h31 - y'*y*h32 = y'
fn compute_homography(src: &Quadrilateral, dst: &Quadrilateral) -> Result<Homography> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (i, (s, d)) in src.corners.iter().zip(dst.corners.iter()).enumerate() {
        let (x, y) = (s.x, s.y);
        let (xp, yp) = (d.x, d.y);

        let row1 = i * 2;
        let row2 = i * 2 + 1;

        a[(row1, 0)] = x;
        a[(row1, 1)] = y;
        a[(row1, 2)] = 1.0;
        a[(row1, 6)] = -xp * x;
        a[(row1, 7)] = -xp * y;
        b[row1] = xp;

        a[(row2, 3)] = x;
        a[(row2, 4)] = y;
        a[(row2, 5)] = 1.0;
        a[(row2, 6)] = -yp * x;
        a[(row2, 7)] = -yp * y;
        b[row2] = yp;
    }

    let h = a.lu().solve(&b).ok_or_else(|| {
        PlanError::DegenerateGeometry("perspective system is singular".to_string())
    })?;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(PlanError::DegenerateGeometry(
            "perspective system has no finite solution".to_string(),
        ));
    }

    Ok(Homography::from_row_major([
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    ]))
}
