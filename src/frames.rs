//! Coordinate frames and the transform chain connecting them
//!
//! Planning happens in three frames: a local planar grid (metres), geographic
//! latitude/longitude, and the pixel grid of the reference image. Two
//! perspective transforms link them in a chain:
//!
//! ```text
//!   Local  <-- local_geo -->  Geographic  <-- geo_pixel -->  Pixel
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::Result;
use crate::geometry::{Point2D, Quadrilateral};
use crate::transform::{apply_batch, Homography, PerspectiveTransform};

/// A coordinate frame, ordered along the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    Local,
    Geographic,
    Pixel,
}

impl Frame {
    pub const ALL: [Frame; 3] = [Frame::Local, Frame::Geographic, Frame::Pixel];

    pub fn name(&self) -> &'static str {
        match self {
            Frame::Local => "local",
            Frame::Geographic => "geographic",
            Frame::Pixel => "pixel",
        }
    }

    fn index(self) -> usize {
        match self {
            Frame::Local => 0,
            Frame::Geographic => 1,
            Frame::Pixel => 2,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Frame {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "xy" => Ok(Frame::Local),
            "geographic" | "geo" | "ll" => Ok(Frame::Geographic),
            "pixel" | "px" => Ok(Frame::Pixel),
            other => Err(format!(
                "unknown frame '{}', expected local, geographic or pixel",
                other
            )),
        }
    }
}

/// Two transforms chaining local, geographic and pixel frames
#[derive(Debug, Clone)]
pub struct FrameChain {
    /// `links[i]` maps frame `i` forward into frame `i + 1`
    links: [PerspectiveTransform; 2],
}

impl FrameChain {
    /// Build the chain from two sets of calibration correspondences.
    ///
    /// `local` and `geo_search` are the same four reference points expressed
    /// in the local and geographic frames; `geo_image` and `pixel` are the
    /// reference image's corners in geographic and pixel coordinates.
    pub fn new(
        local: &Quadrilateral,
        geo_search: &Quadrilateral,
        geo_image: &Quadrilateral,
        pixel: &Quadrilateral,
    ) -> Result<Self> {
        let local_geo = PerspectiveTransform::compute(local, geo_search)?;
        let geo_pixel = PerspectiveTransform::compute(geo_image, pixel)?;
        debug!("Built frame chain local <-> geographic <-> pixel");
        Ok(Self::from_transforms(local_geo, geo_pixel))
    }

    pub fn from_transforms(local_geo: PerspectiveTransform, geo_pixel: PerspectiveTransform) -> Self {
        Self {
            links: [local_geo, geo_pixel],
        }
    }

    pub fn local_geo(&self) -> &PerspectiveTransform {
        &self.links[0]
    }

    pub fn geo_pixel(&self) -> &PerspectiveTransform {
        &self.links[1]
    }

    /// Homographies to apply, in order, to go from one frame to another
    fn hops(&self, from: Frame, to: Frame) -> Vec<&Homography> {
        let (a, b) = (from.index(), to.index());
        if a <= b {
            self.links[a..b].iter().map(|t| t.forward()).collect()
        } else {
            self.links[b..a].iter().rev().map(|t| t.reverse()).collect()
        }
    }

    /// Map a single point between frames
    pub fn map(&self, point: Point2D, from: Frame, to: Frame) -> Result<Point2D> {
        self.hops(from, to)
            .into_iter()
            .try_fold(point, |p, h| h.apply(p))
    }

    /// Map a whole path between frames, preserving order
    pub fn map_path(&self, points: &[Point2D], from: Frame, to: Frame) -> Result<Vec<Point2D>> {
        let mut mapped = points.to_vec();
        for h in self.hops(from, to) {
            mapped = apply_batch(h, &mapped)?;
        }
        Ok(mapped)
    }
}
