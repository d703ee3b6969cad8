//! Scale estimation: silhouette widths at each joint, converted to
//! real-world distances.
//!
//! A pass works on one frame-consistent snapshot:
//!
//! 1. Project every joint of interest into the view ([`ProjectionSnapshot`]).
//! 2. Calibrate a [`ScaleProportion`] from the two reference joints, whose
//!    3D separation is known from the skeleton.
//! 3. Scan the mask left and right of each joint to find the silhouette
//!    edges, and convert the edge-to-edge pixel distance through the scale.
//! 4. Unproject the root joint's edges onto the body anchor's plane for an
//!    independent, geometric measurement of the same width.
//!
//! Only reference-joint failures abort a pass. Anything that goes wrong
//! for another joint is recorded as [`JointEstimate::Incomplete`].

use std::collections::BTreeMap;

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

use crate::joint::{JointName, Skeleton, translation_of};
use crate::projection::Projector;
use crate::sampler::SegmentationMask;
use crate::scanner::EdgeScanner;
use crate::types::{EstimateError, EstimatorConfig, Point, ReferenceJoints, ScanDirection, Size};

/// A joint together with where it lands in the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointProjection {
    /// Which joint.
    pub joint: JointName,
    /// Model-space transform the projection was computed from.
    pub transform: Matrix4<f64>,
    /// Projected view point.
    pub point: Point,
}

/// Joint projections captured against one camera snapshot.
///
/// Replaced wholesale whenever the body anchor updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSnapshot {
    anchor: Matrix4<f64>,
    viewport: Size,
    projections: BTreeMap<JointName, Result<JointProjection, EstimateError>>,
}

impl ProjectionSnapshot {
    /// Project each of `joints` through `camera`.
    ///
    /// Joints absent from the skeleton are recorded as
    /// [`EstimateError::JointMissing`]; projection failures are recorded
    /// as returned by the camera.
    pub fn capture<P, I>(skeleton: &Skeleton, camera: &P, viewport: Size, joints: I) -> Self
    where
        P: Projector + ?Sized,
        I: IntoIterator<Item = JointName>,
    {
        let projections = joints
            .into_iter()
            .map(|joint| {
                let projection = skeleton
                    .joint(joint)
                    .zip(skeleton.world_position(joint))
                    .ok_or(EstimateError::JointMissing { joint })
                    .and_then(|(j, world)| {
                        let point = camera.project(&world, viewport)?;
                        Ok(JointProjection {
                            joint,
                            transform: j.transform,
                            point,
                        })
                    });
                (joint, projection)
            })
            .collect();

        Self {
            anchor: skeleton.anchor,
            viewport,
            projections,
        }
    }

    /// Body anchor world transform at capture time.
    #[must_use]
    pub const fn anchor(&self) -> &Matrix4<f64> {
        &self.anchor
    }

    /// Viewport the projections are expressed in.
    #[must_use]
    pub const fn viewport(&self) -> Size {
        self.viewport
    }

    /// The projection of `joint`.
    ///
    /// # Errors
    ///
    /// Returns the error recorded at capture time, or
    /// [`EstimateError::JointMissing`] if the joint was not captured.
    pub fn projection(&self, joint: JointName) -> Result<&JointProjection, EstimateError> {
        match self.projections.get(&joint) {
            Some(Ok(p)) => Ok(p),
            Some(Err(e)) => Err(e.clone()),
            None => Err(EstimateError::JointMissing { joint }),
        }
    }

    /// Successfully projected joints.
    pub fn projected(&self) -> impl Iterator<Item = &JointProjection> {
        self.projections.values().filter_map(|p| p.as_ref().ok())
    }
}

/// Ratio converting view distances into world distances, calibrated from
/// two joints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleProportion {
    /// Model-space distance between the reference joints.
    pub distance_3d: f64,
    /// View distance between the reference joints' projections.
    pub distance_2d: f64,
    /// `distance_3d / distance_2d`.
    pub ratio: f64,
}

impl ScaleProportion {
    /// Build a proportion from known 3D and 2D distances.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::DegenerateReference`] if `distance_2d` is
    /// not a positive finite number.
    pub fn new(distance_3d: f64, distance_2d: f64) -> Result<Self, EstimateError> {
        if !(distance_2d.is_finite() && distance_2d > 0.0) {
            return Err(EstimateError::DegenerateReference);
        }
        Ok(Self {
            distance_3d,
            distance_2d,
            ratio: distance_3d / distance_2d,
        })
    }

    /// Calibrate from the reference joints in `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InsufficientReferenceJoints`] if either
    /// reference joint has no projection, and
    /// [`EstimateError::DegenerateReference`] if both project onto the
    /// same point.
    pub fn calibrate(
        snapshot: &ProjectionSnapshot,
        reference: ReferenceJoints,
    ) -> Result<Self, EstimateError> {
        let lookup = |joint: JointName| {
            snapshot
                .projection(joint)
                .map_err(|_| EstimateError::InsufficientReferenceJoints { joint })
        };
        let base = lookup(reference.base)?;
        let top = lookup(reference.top)?;

        let distance_3d = (translation_of(&top.transform) - translation_of(&base.transform)).norm();
        let distance_2d = top.point.distance(base.point);
        Self::new(distance_3d, distance_2d)
    }

    /// Convert a view distance into a world distance.
    #[must_use]
    pub fn to_world(&self, distance_2d: f64) -> f64 {
        distance_2d * self.ratio
    }
}

/// Silhouette width at one joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointMeasurement {
    /// Left silhouette edge (view coordinates).
    pub left: Point,
    /// Right silhouette edge (view coordinates).
    pub right: Point,
    /// Edge-to-edge view distance.
    pub distance_2d: f64,
    /// `distance_2d` converted through the scale proportion.
    pub distance_3d: f64,
}

/// Outcome of measuring one joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointEstimate {
    /// Both edges were found.
    Complete(JointMeasurement),
    /// The joint could not be measured.
    Incomplete(EstimateError),
}

impl JointEstimate {
    /// The measurement, if complete.
    #[must_use]
    pub const fn measurement(&self) -> Option<&JointMeasurement> {
        match self {
            Self::Complete(m) => Some(m),
            Self::Incomplete(_) => None,
        }
    }
}

impl From<Result<JointMeasurement, EstimateError>> for JointEstimate {
    fn from(result: Result<JointMeasurement, EstimateError>) -> Self {
        match result {
            Ok(m) => Self::Complete(m),
            Err(e) => Self::Incomplete(e),
        }
    }
}

/// World-space width obtained by unprojecting two silhouette edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundedDistance {
    /// Unprojected left edge.
    pub left: Point3<f64>,
    /// Unprojected right edge.
    pub right: Point3<f64>,
    /// Distance between the two.
    pub distance: f64,
}

/// Outcome of the unprojection cross-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundedEstimate {
    /// Both edges were unprojected.
    Complete(GroundedDistance),
    /// The root joint's edges were unavailable or could not be unprojected.
    Incomplete(EstimateError),
}

/// Everything one estimation pass produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Calibration used for every 3D estimate in this result.
    pub scale: ScaleProportion,
    /// Joint projections the pass worked from.
    pub projections: BTreeMap<JointName, JointProjection>,
    /// Per-joint outcomes.
    pub joints: BTreeMap<JointName, JointEstimate>,
    /// Root joint width measured by unprojection.
    pub root_grounded: GroundedEstimate,
}

impl EstimationResult {
    /// Edge-to-edge view distance for every completely measured joint.
    #[must_use]
    pub fn core_points_distance(&self) -> BTreeMap<JointName, f64> {
        self.joints
            .iter()
            .filter_map(|(&joint, estimate)| estimate.measurement().map(|m| (joint, m.distance_2d)))
            .collect()
    }
}

/// Runs estimation passes with a fixed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleEstimator {
    config: EstimatorConfig,
}

impl ScaleEstimator {
    /// Create an estimator.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(config: EstimatorConfig) -> Result<Self, EstimateError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The estimator's configuration.
    #[must_use]
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Joints a snapshot must contain: the measured joints plus both
    /// reference joints.
    fn joints_of_interest(&self) -> Vec<JointName> {
        let reference = self.config.reference;
        let mut joints = self.config.joints.clone();
        joints.extend([JointName::Root, reference.base, reference.top]);
        joints.sort_unstable();
        joints.dedup();
        joints
    }

    /// Project every joint this estimator needs.
    pub fn capture<P: Projector + ?Sized>(
        &self,
        skeleton: &Skeleton,
        camera: &P,
        viewport: Size,
    ) -> ProjectionSnapshot {
        ProjectionSnapshot::capture(skeleton, camera, viewport, self.joints_of_interest())
    }

    /// Run one pass over `snapshot` and `mask`. `camera` is used only for
    /// the root unprojection cross-check.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InsufficientReferenceJoints`] or
    /// [`EstimateError::DegenerateReference`] when no scale can be
    /// calibrated, and [`EstimateError::DegenerateViewport`] when the
    /// viewport or mask is empty. Per-joint failures are not errors.
    pub fn estimate<P: Projector + ?Sized>(
        &self,
        snapshot: &ProjectionSnapshot,
        mask: &SegmentationMask,
        camera: &P,
    ) -> Result<EstimationResult, EstimateError> {
        let scale = ScaleProportion::calibrate(snapshot, self.config.reference).inspect_err(|e| {
            log::warn!("scale estimation aborted: {e}");
        })?;
        log::debug!(
            "scale proportion {:.6} ({:.3} world / {:.3} view)",
            scale.ratio,
            scale.distance_3d,
            scale.distance_2d,
        );

        let scanner = EdgeScanner::new(mask, snapshot.viewport(), &self.config.foreground)?;

        let mut joints = BTreeMap::new();
        for &joint in &self.config.joints {
            let estimate = measure_joint(&scanner, snapshot, joint, &scale);
            match &estimate {
                JointEstimate::Complete(m) => log::debug!(
                    "{joint}: 2D {:.3}, 3D {:.3}",
                    m.distance_2d,
                    m.distance_3d
                ),
                JointEstimate::Incomplete(e) => log::debug!("{joint}: incomplete ({e})"),
            }
            joints.insert(joint, estimate);
        }

        let root = joints
            .get(&JointName::Root)
            .cloned()
            .unwrap_or_else(|| measure_joint(&scanner, snapshot, JointName::Root, &scale));
        let root_grounded = match root {
            JointEstimate::Complete(m) => ground(camera, snapshot, &m),
            JointEstimate::Incomplete(e) => GroundedEstimate::Incomplete(e),
        };

        Ok(EstimationResult {
            scale,
            projections: snapshot.projected().map(|p| (p.joint, *p)).collect(),
            joints,
            root_grounded,
        })
    }
}

fn measure_joint(
    scanner: &EdgeScanner<'_>,
    snapshot: &ProjectionSnapshot,
    joint: JointName,
    scale: &ScaleProportion,
) -> JointEstimate {
    let edge = |origin: Point, direction: ScanDirection| -> Result<Point, EstimateError> {
        scanner
            .find_boundary(origin, direction)?
            .ok_or(EstimateError::BoundaryNotFound { direction })
    };

    let measurement = snapshot.projection(joint).and_then(|projection| {
        let right = edge(projection.point, ScanDirection::Rightward)?;
        let left = edge(projection.point, ScanDirection::Leftward)?;
        let distance_2d = right.distance(left);
        Ok(JointMeasurement {
            left,
            right,
            distance_2d,
            distance_3d: scale.to_world(distance_2d),
        })
    });
    measurement.into()
}

fn ground<P: Projector + ?Sized>(
    camera: &P,
    snapshot: &ProjectionSnapshot,
    measurement: &JointMeasurement,
) -> GroundedEstimate {
    let unproject = |p: Point| camera.unproject(p, snapshot.anchor(), snapshot.viewport());
    match (unproject(measurement.left), unproject(measurement.right)) {
        (Ok(left), Ok(right)) => {
            let distance = (right - left).norm();
            log::debug!("root (unprojection): 3D {distance:.3}");
            GroundedEstimate::Complete(GroundedDistance {
                left,
                right,
                distance,
            })
        }
        (Err(e), _) | (_, Err(e)) => GroundedEstimate::Incomplete(e),
    }
}

/// Run a complete pass: capture projections, then estimate.
///
/// # Errors
///
/// Returns [`EstimateError::InvalidConfig`] for an invalid `config`, and
/// otherwise the errors of [`ScaleEstimator::estimate`].
pub fn estimate<P: Projector + ?Sized>(
    skeleton: &Skeleton,
    mask: &SegmentationMask,
    camera: &P,
    viewport: Size,
    config: &EstimatorConfig,
) -> Result<EstimationResult, EstimateError> {
    let estimator = ScaleEstimator::new(config.clone())?;
    let snapshot = estimator.capture(skeleton, camera, viewport);
    estimator.estimate(&snapshot, mask, camera)
}
