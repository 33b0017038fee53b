//! Error types for spiral planning and frame mapping

use thiserror::Error;

/// Failures raised by the planning core.
///
/// All of these are raised at the point of detection. None of them are
/// transient: the caller has to fix the input geometry before trying again.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    /// The point correspondences cannot determine a unique perspective transform
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The homogeneous denominator vanished, the point maps to infinity
    #[error("point ({x}, {y}) projects to infinity under this transform")]
    SingularProjection { x: f64, y: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;
