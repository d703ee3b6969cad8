//! Measurement session: the latest mask and body snapshot between passes.
//!
//! Hosts feed the session as tracking data arrives and ask for an
//! estimate when the user wants one. Each update replaces the previous
//! value outright, so an estimate always sees one consistent mask and one
//! consistent projection snapshot.

use crate::estimator::{EstimationResult, ProjectionSnapshot, ScaleEstimator};
use crate::joint::Skeleton;
use crate::projection::Projector;
use crate::sampler::SegmentationMask;
use crate::types::{EstimateError, EstimatorConfig, Size};

/// Holds the most recent inputs and output of the estimation pipeline.
#[derive(Debug, Clone)]
pub struct MeasurementSession<P> {
    estimator: ScaleEstimator,
    mask: Option<SegmentationMask>,
    body: Option<(ProjectionSnapshot, P)>,
    last: Option<EstimationResult>,
}

impl<P: Projector> MeasurementSession<P> {
    /// Start an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(config: EstimatorConfig) -> Result<Self, EstimateError> {
        Ok(Self {
            estimator: ScaleEstimator::new(config)?,
            mask: None,
            body: None,
            last: None,
        })
    }

    /// Replace the segmentation mask.
    pub fn update_mask(&mut self, mask: SegmentationMask) {
        self.mask = Some(mask);
    }

    /// Replace the body snapshot, projecting the skeleton through the
    /// camera as it is now.
    pub fn update_body(&mut self, skeleton: &Skeleton, camera: P, viewport: Size) {
        let snapshot = self.estimator.capture(skeleton, &camera, viewport);
        log::debug!(
            "body snapshot updated: {} joints projected",
            snapshot.projected().count()
        );
        self.body = Some((snapshot, camera));
    }

    /// The latest mask, if any.
    #[must_use]
    pub const fn mask(&self) -> Option<&SegmentationMask> {
        self.mask.as_ref()
    }

    /// The latest projection snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&ProjectionSnapshot> {
        self.body.as_ref().map(|(snapshot, _)| snapshot)
    }

    /// Run a pass over the latest mask and body snapshot and keep the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::MissingMask`] or
    /// [`EstimateError::MissingBody`] when either input has not arrived,
    /// and otherwise the errors of [`ScaleEstimator::estimate`]. A failed
    /// pass leaves the previous result in place.
    pub fn estimate(&mut self) -> Result<&EstimationResult, EstimateError> {
        let mask = self.mask.as_ref().ok_or(EstimateError::MissingMask)?;
        let (snapshot, camera) = self.body.as_ref().ok_or(EstimateError::MissingBody)?;
        let result = self.estimator.estimate(snapshot, mask, camera)?;
        Ok(self.last.insert(result))
    }

    /// The result of the last successful pass.
    #[must_use]
    pub const fn last_result(&self) -> Option<&EstimationResult> {
        self.last.as_ref()
    }

    /// Forget the mask, the body snapshot, and the last result.
    pub fn reset(&mut self) {
        self.mask = None;
        self.body = None;
        self.last = None;
    }
}
