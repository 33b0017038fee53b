//! Inward square spiral coverage paths
//!
//! The spiral starts at the first corner of a region and walks two legs per
//! ring, alternating along the region's first side (`u`) and second side
//! (`v`). Every ring shortens its legs by one more `step_size`, so the path
//! contracts toward the middle of the region. Legs longer than
//! `step_size * threshold` are subdivided into `step_size` steps; the last
//! step before a corner is never longer than the leg that is left.
//!
//! The number of rings is the truncated mean of `dim0 / step_size` and
//! `dim1 / step_size`. This assumes a roughly square region; on elongated
//! regions the spiral stops short of the centre.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::geometry::{Point2D, Quadrilateral};

pub const DEFAULT_STEP_SIZE: f64 = 40.0;
pub const DEFAULT_THRESHOLD: f64 = 1.5;

/// Upper bound on the estimated path size before generation is refused
const MAX_WAYPOINTS: f64 = 10_000_000.0;

/// Spacing parameters for the spiral
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpiralParams {
    /// Lateral spacing between successive legs
    pub step_size: f64,
    /// Legs longer than `step_size * threshold` get intermediate waypoints
    pub threshold: f64,
}

impl Default for SpiralParams {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SpiralParams {
    pub fn new(step_size: f64, threshold: f64) -> Self {
        Self {
            step_size,
            threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(PlanError::InvalidParameter(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(PlanError::InvalidParameter(format!(
                "threshold must be positive, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Legs longer than this get intermediate waypoints
    pub fn subdivide_above(&self) -> f64 {
        self.step_size * self.threshold
    }

    /// Largest gap between consecutive waypoints. Below a threshold of 1
    /// every leg is cut into whole steps, so the gap is one `step_size`.
    pub fn max_spacing(&self) -> f64 {
        self.step_size * self.threshold.max(1.0)
    }
}

/// Which way a leg runs, relative to the region's first two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Heading {
    PlusU,
    PlusV,
    MinusU,
    MinusV,
}

impl Heading {
    /// Quarter turn: +u -> +v -> -u -> -v -> +u
    pub fn next(self) -> Self {
        match self {
            Heading::PlusU => Heading::PlusV,
            Heading::PlusV => Heading::MinusU,
            Heading::MinusU => Heading::MinusV,
            Heading::MinusV => Heading::PlusU,
        }
    }
}

/// Unit directions and lengths of the region's first two sides
#[derive(Debug, Clone, Copy)]
struct Axes {
    u: Point2D,
    v: Point2D,
    dim0: f64,
    dim1: f64,
}

impl Axes {
    /// Corner 3 does not contribute; the region is assumed to be a parallelogram
    fn from_region(region: &Quadrilateral) -> Self {
        let side0 = region.side(0);
        let side1 = region.side(1);
        let dim0 = side0.norm();
        let dim1 = side1.norm();
        Self {
            u: side0 * (1.0 / dim0),
            v: side1 * (1.0 / dim1),
            dim0,
            dim1,
        }
    }

    /// Unit vector and full side length for a heading
    fn along(&self, heading: Heading) -> (Point2D, f64) {
        match heading {
            Heading::PlusU => (self.u, self.dim0),
            Heading::PlusV => (self.v, self.dim1),
            Heading::MinusU => (-self.u, self.dim0),
            Heading::MinusV => (-self.v, self.dim1),
        }
    }

    fn ring_count(&self, step_size: f64) -> usize {
        let steps0 = (self.dim0 / step_size).abs();
        let steps1 = (self.dim1 / step_size).abs();
        ((steps0 + steps1) / 2.0) as usize
    }
}

/// One straight segment of the spiral between two direction changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub ring: usize,
    pub heading: Heading,
    pub start: Point2D,
    pub end: Point2D,
    /// Side length minus `ring * step_size`. Negative once an elongated
    /// region's short side is used up, in which case the leg runs backwards.
    pub length: f64,
}

impl Leg {
    fn plan(axes: &Axes, heading: Heading, ring: usize, start: Point2D, step_size: f64) -> Self {
        let (direction, side) = axes.along(heading);
        let length = side - step_size * ring as f64;
        Self {
            ring,
            heading,
            start,
            end: start + direction * length,
            length,
        }
    }

    /// Intermediate points `step_size` apart followed by the exact end point.
    /// A step never lands on or past the end point.
    fn waypoints(&self, params: &SpiralParams) -> Vec<Point2D> {
        let span = self.end - self.start;
        let distance = span.norm();
        if distance <= params.subdivide_above() {
            return vec![self.end];
        }

        let heading = span * (1.0 / distance);
        let mut out = Vec::with_capacity((distance / params.step_size) as usize + 1);
        let mut pos = self.start;
        let mut remaining = distance;
        while remaining > params.subdivide_above() && remaining > params.step_size {
            pos = pos + heading * params.step_size;
            out.push(pos);
            remaining = self.end.distance(pos);
        }
        out.push(self.end);
        out
    }
}

/// A generated spiral: the flat waypoint list plus the legs it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiralPath {
    pub waypoints: Vec<Point2D>,
    pub legs: Vec<Leg>,
    pub rings: usize,
}

/// Plan an inward spiral over `region`, starting at its first corner
pub fn plan_spiral(region: &Quadrilateral, params: &SpiralParams) -> Result<SpiralPath> {
    params.validate()?;
    region.validate_sides()?;

    let axes = Axes::from_region(region);
    let rings = axes.ring_count(params.step_size);

    let estimate = rings as f64 * (axes.dim0 + axes.dim1) / params.step_size;
    if estimate > MAX_WAYPOINTS {
        return Err(PlanError::InvalidParameter(format!(
            "step_size {} is too small for this region (about {:.0} waypoints)",
            params.step_size, estimate
        )));
    }

    let start = region.corners[0];
    let init = (start, Heading::PlusU, vec![start], Vec::with_capacity(rings * 2));

    let (_, _, waypoints, legs) = (0..rings)
        .flat_map(|ring| [ring, ring])
        .fold(init, |(pos, heading, mut waypoints, mut legs), ring| {
            let leg = Leg::plan(&axes, heading, ring, pos, params.step_size);
            waypoints.extend(leg.waypoints(params));
            legs.push(leg);
            (leg.end, heading.next(), waypoints, legs)
        });

    tracing::debug!(
        rings,
        legs = legs.len(),
        waypoints = waypoints.len(),
        "planned spiral"
    );

    Ok(SpiralPath {
        waypoints,
        legs,
        rings,
    })
}

/// Waypoints of an inward spiral over `region`
pub fn generate_spiral(region: &Quadrilateral, params: &SpiralParams) -> Result<Vec<Point2D>> {
    plan_spiral(region, params).map(|path| path.waypoints)
}
