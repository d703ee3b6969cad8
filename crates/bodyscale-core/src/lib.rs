//! bodyscale-core: torso scale estimation (sans-IO).
//!
//! Estimates real-world torso widths by combining a tracked 3D skeleton
//! with a 2D person segmentation mask:
//! joint projection -> silhouette edge scanning -> scale conversion ->
//! unprojection cross-check.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and transforms and returns structured data. Reading files and
//! printing reports lives in the `bodyscale` CLI.

pub mod diagnostics;
pub mod estimator;
pub mod joint;
pub mod projection;
mod report;
pub mod sampler;
pub mod scanner;
pub mod session;
pub mod types;

pub use estimator::{
    EstimationResult, GroundedDistance, GroundedEstimate, JointEstimate, JointMeasurement,
    JointProjection, ProjectionSnapshot, ScaleEstimator, ScaleProportion, estimate,
};
pub use joint::{Joint, JointName, Skeleton, UnknownJoint};
pub use projection::{Intrinsics, PinholeCamera, Projector};
pub use sampler::{ForegroundClassifier, Rgba, Sample, SegmentationMask};
pub use scanner::{DisplayGeometry, EdgeScanner, ScanLine};
pub use session::MeasurementSession;
pub use types::{
    Dimensions, EstimateError, EstimatorConfig, Isometry3, Matrix4, Point, Point3,
    ReferenceJoints, RgbaImage, ScanDirection, Size,
};
