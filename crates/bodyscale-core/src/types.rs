//! Shared types for the bodyscale estimation pipeline.

use serde::{Deserialize, Serialize};

use crate::joint::JointName;
use crate::sampler::ForegroundClassifier;

/// Re-export `RgbaImage` so downstream crates can build masks without
/// depending on `image` directly.
pub use image::RgbaImage;

/// Re-exports of the `nalgebra` types that appear in the public API.
pub use nalgebra::{Isometry3, Matrix4, Point3};

/// A 2D point in view (screen) or mask pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (from left edge).
    pub x: f64,
    /// Vertical position (from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A size in view points (fractional values allowed).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either side is zero, negative, or not finite.
    #[must_use]
    pub fn is_degenerate(self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

impl From<Dimensions> for Size {
    fn from(d: Dimensions) -> Self {
        Self::new(f64::from(d.width), f64::from(d.height))
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Horizontal direction of a silhouette scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    /// Toward column 0.
    Leftward,
    /// Toward the right edge of the view.
    Rightward,
}

impl std::fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leftward => f.write_str("leftward"),
            Self::Rightward => f.write_str("rightward"),
        }
    }
}

/// The two joints whose known 3D separation calibrates the scale
/// proportion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceJoints {
    /// Lower reference joint (normally the skeleton root).
    pub base: JointName,
    /// Upper reference joint (normally the topmost spine joint).
    pub top: JointName,
}

impl Default for ReferenceJoints {
    fn default() -> Self {
        Self {
            base: JointName::Root,
            top: JointName::Spine7,
        }
    }
}

/// Configuration for a scale estimation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Joints to measure. Results are keyed by joint and reported in
    /// skeleton order (root, then spine and neck bottom to top) regardless
    /// of the order given here.
    pub joints: Vec<JointName>,

    /// Joints used to compute the scale proportion.
    pub reference: ReferenceJoints,

    /// Predicate deciding which mask pixels belong to the body.
    pub foreground: ForegroundClassifier,
}

impl EstimatorConfig {
    /// Default measured joints: the root followed by the spine, bottom to top.
    pub const DEFAULT_JOINTS: [JointName; 7] = [
        JointName::Root,
        JointName::Spine2,
        JointName::Spine3,
        JointName::Spine4,
        JointName::Spine5,
        JointName::Spine6,
        JointName::Spine7,
    ];

    /// Default foreground tolerance per colour channel.
    pub const DEFAULT_TOLERANCE: f64 = ForegroundClassifier::DEFAULT_TOLERANCE;

    /// Check the configuration for values that would make estimation
    /// meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidConfig`] if the foreground tolerance
    /// is outside `[0, 1]`, a target colour channel is outside `[0, 1]`,
    /// or both reference joints are the same joint.
    pub fn validate(&self) -> Result<(), EstimateError> {
        let tolerance = self.foreground.tolerance;
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(EstimateError::InvalidConfig(format!(
                "foreground tolerance must be within [0, 1], got {tolerance}"
            )));
        }
        if let Some(channel) = self
            .foreground
            .color
            .iter()
            .find(|c| !(0.0..=1.0).contains(*c))
        {
            return Err(EstimateError::InvalidConfig(format!(
                "foreground colour channels must be within [0, 1], got {channel}"
            )));
        }
        if self.reference.base == self.reference.top {
            return Err(EstimateError::InvalidConfig(format!(
                "reference joints must differ, both are {}",
                self.reference.base
            )));
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            joints: Self::DEFAULT_JOINTS.to_vec(),
            reference: ReferenceJoints::default(),
            foreground: ForegroundClassifier::default(),
        }
    }
}

/// Errors that can occur during scale estimation.
///
/// Per-joint failures are recorded inside the result instead of being
/// returned, so the enum is `Clone` and serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum EstimateError {
    /// A 3D point could not be projected (behind the camera).
    #[error("point cannot be projected into the view")]
    ProjectionUnavailable,

    /// A view point could not be unprojected onto the reference plane.
    #[error("point cannot be unprojected onto the reference plane")]
    UnprojectionUnavailable,

    /// A sample point lies outside the mask or view.
    #[error("sample point ({x:.1}, {y:.1}) is out of bounds")]
    OutOfBounds {
        /// Horizontal coordinate of the offending point.
        x: f64,
        /// Vertical coordinate of the offending point.
        y: f64,
    },

    /// A fully transparent pixel has no recoverable colour.
    #[error("pixel colour is indeterminate (zero alpha)")]
    IndeterminateColor,

    /// A reference joint could not be projected, so no scale exists.
    #[error("reference joint {joint} has no usable projection")]
    InsufficientReferenceJoints {
        /// The reference joint that failed.
        joint: JointName,
    },

    /// The scan reached the view edge without leaving the silhouette.
    #[error("no silhouette boundary found scanning {direction}")]
    BoundaryNotFound {
        /// Scan direction that found nothing.
        direction: ScanDirection,
    },

    /// The skeleton does not contain the requested joint.
    #[error("joint {joint} is not present in the skeleton")]
    JointMissing {
        /// The absent joint.
        joint: JointName,
    },

    /// Both reference joints project onto the same view point.
    #[error("reference joints project onto the same point")]
    DegenerateReference,

    /// The view or mask has a zero or non-finite side.
    #[error("viewport or mask has degenerate dimensions")]
    DegenerateViewport,

    /// Estimator configuration is invalid.
    #[error("invalid estimator configuration: {0}")]
    InvalidConfig(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the mask image.
    #[error("failed to decode mask image: {0}")]
    ImageDecode(String),

    /// No segmentation mask has been captured yet.
    #[error("no segmentation mask captured")]
    MissingMask,

    /// No body snapshot has been captured yet.
    #[error("no body snapshot captured")]
    MissingBody,
}

impl From<image::ImageError> for EstimateError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageDecode(e.to_string())
    }
}
