//! Human-readable rendering of an [`EstimationResult`].

use crate::estimator::{EstimationResult, GroundedEstimate, JointEstimate};

impl EstimationResult {
    /// Render the result as a multi-line text report.
    ///
    /// All distances are printed with three decimals; 2D values are view
    /// points, 3D values are in skeleton units (metres for most trackers).
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push("Estimated distances:".to_string());
        lines.push(format!(
            "Core height -> 2D: {:.3}; 3D {:.3}",
            self.scale.distance_2d, self.scale.distance_3d,
        ));

        for (joint, estimate) in &self.joints {
            lines.push(match estimate {
                JointEstimate::Complete(m) => format!(
                    "{joint} -> 2D: {:.3}; 3D {:.3}",
                    m.distance_2d, m.distance_3d,
                ),
                JointEstimate::Incomplete(e) => format!("{joint} -> incomplete ({e})"),
            });
        }

        lines.push(match &self.root_grounded {
            GroundedEstimate::Complete(g) => {
                format!("root (unprojection) -> 3D {:.3}", g.distance)
            }
            GroundedEstimate::Incomplete(e) => format!("root (unprojection) -> incomplete ({e})"),
        });

        lines.join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use nalgebra::Point3;

    use crate::estimator::{GroundedDistance, JointMeasurement, ScaleProportion};
    use crate::joint::JointName;
    use crate::types::{EstimateError, Point, ScanDirection};

    use super::*;

    fn result() -> EstimationResult {
        let mut joints = BTreeMap::new();
        joints.insert(
            JointName::Root,
            JointEstimate::Complete(JointMeasurement {
                left: Point::new(80.0, 100.0),
                right: Point::new(120.0, 100.0),
                distance_2d: 40.0,
                distance_3d: 0.8,
            }),
        );
        joints.insert(
            JointName::Spine3,
            JointEstimate::Incomplete(EstimateError::BoundaryNotFound {
                direction: ScanDirection::Leftward,
            }),
        );
        EstimationResult {
            scale: ScaleProportion::new(1.0, 50.0).unwrap(),
            projections: BTreeMap::new(),
            joints,
            root_grounded: GroundedEstimate::Complete(GroundedDistance {
                left: Point3::new(-0.4, 0.0, -2.0),
                right: Point3::new(0.4, 0.0, -2.0),
                distance: 0.8,
            }),
        }
    }

    #[test]
    fn report_lists_every_joint_with_three_decimals() {
        let report = result().report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Estimated distances:",
                "Core height -> 2D: 50.000; 3D 1.000",
                "root -> 2D: 40.000; 3D 0.800",
                "spine_3_joint -> incomplete (no silhouette boundary found scanning leftward)",
                "root (unprojection) -> 3D 0.800",
            ]
        );
    }

    #[test]
    fn report_shows_incomplete_grounding() {
        let mut r = result();
        r.root_grounded = GroundedEstimate::Incomplete(EstimateError::UnprojectionUnavailable);
        assert!(r.report().ends_with(
            "root (unprojection) -> incomplete (point cannot be unprojected onto the reference plane)"
        ));
    }
}
