//! spiralplan - inward spiral coverage paths mapped between coordinate frames
//!
//! The core is two independent pieces: [`transform`] derives forward and
//! reverse perspective mappings from four point correspondences, and
//! [`spiral`] walks an inward square spiral over a four-cornered region.
//! [`frames`], [`mission`] and [`render`] chain them together to project a
//! planned path from a local grid through latitude/longitude onto an image.

pub mod config;
pub mod error;
pub mod frames;
pub mod geometry;
pub mod mission;
pub mod render;
pub mod spiral;
pub mod transform;

pub use crate::error::{PlanError, Result};
pub use crate::frames::{Frame, FrameChain};
pub use crate::geometry::{Point2D, Quadrilateral};
pub use crate::spiral::{generate_spiral, plan_spiral, Heading, SpiralParams, SpiralPath};
pub use crate::transform::{apply_transform, build_transform, Homography, PerspectiveTransform};
