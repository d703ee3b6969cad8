//! Scan diagnostics: every sample along every scan line, classified.
//!
//! The estimator only reports the first background sample of each scan.
//! For tuning the foreground classifier it helps to see the whole line,
//! so hosts can draw body samples and background samples in different
//! colours over the camera image.

use serde::{Deserialize, Serialize};

use crate::estimator::ProjectionSnapshot;
use crate::joint::JointName;
use crate::sampler::SegmentationMask;
use crate::scanner::EdgeScanner;
use crate::types::{EstimateError, EstimatorConfig, Point, ScanDirection};

/// One sample along a scan line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSample {
    /// Sample position in view coordinates.
    pub point: Point,
    /// Whether the sample is a body pixel.
    pub body: bool,
}

/// All samples of one joint's scan in one direction, in scan order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTrace {
    /// Joint the scan starts from.
    pub joint: JointName,
    /// Which way the scan walks.
    pub direction: ScanDirection,
    /// Every sample from the joint's column to the view edge.
    pub samples: Vec<ClassifiedSample>,
}

impl ScanTrace {
    /// Number of body samples on the line.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.samples.iter().filter(|s| s.body).count()
    }
}

/// Classify every sample on both scan lines of each configured joint.
///
/// Joints without a projection, or whose projection lies outside the
/// view, are skipped.
///
/// # Errors
///
/// Returns [`EstimateError::DegenerateViewport`] if the snapshot's
/// viewport or the mask is empty.
pub fn trace_scan_lines(
    snapshot: &ProjectionSnapshot,
    mask: &SegmentationMask,
    config: &EstimatorConfig,
) -> Result<Vec<ScanTrace>, EstimateError> {
    let scanner = EdgeScanner::new(mask, snapshot.viewport(), &config.foreground)?;
    let geometry = *scanner.geometry();

    let mut traces = Vec::new();
    for &joint in &config.joints {
        let Ok(projection) = snapshot.projection(joint) else {
            log::debug!("{joint}: no projection, skipping trace");
            continue;
        };
        for direction in [ScanDirection::Rightward, ScanDirection::Leftward] {
            let traced: Result<Vec<ClassifiedSample>, EstimateError> = scanner
                .scan_line(projection.point, direction)
                .and_then(|line| {
                    line.map(|mask_point| -> Result<ClassifiedSample, EstimateError> {
                        Ok(ClassifiedSample {
                            point: geometry.mask_to_view(mask_point),
                            body: scanner.is_body_at(mask_point)?,
                        })
                    })
                    .collect()
                });
            match traced {
                Ok(samples) => traces.push(ScanTrace {
                    joint,
                    direction,
                    samples,
                }),
                Err(e) => log::debug!("{joint}: {direction} trace skipped ({e})"),
            }
        }
    }
    Ok(traces)
}
