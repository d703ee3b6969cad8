//! Projection between 3D world space and 2D view space.
//!
//! The estimator only needs two capabilities from a camera: project a
//! world point into the view, and cast a view point back onto a plane.
//! [`Projector`] captures that seam so hosts can plug in whatever camera
//! model their tracking runtime provides. [`PinholeCamera`] is the
//! built-in implementation.

use nalgebra::{Isometry3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::joint::translation_of;
use crate::types::{EstimateError, Point, Size};

/// Points closer to the camera plane than this are not projectable.
const MIN_DEPTH: f64 = 1e-9;

/// Rays whose angle with the plane is below this are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Projection and unprojection against one camera snapshot.
pub trait Projector {
    /// Project a world-space point into view coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::ProjectionUnavailable`] when the point
    /// cannot be seen (e.g. it lies behind the camera).
    fn project(&self, point: &Point3<f64>, viewport: Size) -> Result<Point, EstimateError>;

    /// Cast the view ray through `point` onto the plane through the
    /// origin of `plane` whose normal is the transform's local Z axis.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::UnprojectionUnavailable`] when the ray is
    /// parallel to the plane or meets it behind the camera.
    fn unproject(
        &self,
        point: Point,
        plane: &Matrix4<f64>,
        viewport: Size,
    ) -> Result<Point3<f64>, EstimateError>;
}

/// Pinhole intrinsics in camera-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Horizontal focal length.
    pub fx: f64,
    /// Vertical focal length.
    pub fy: f64,
    /// Principal point, horizontal.
    pub cx: f64,
    /// Principal point, vertical.
    pub cy: f64,
}

impl Intrinsics {
    fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
    }
}

/// A pinhole camera whose image is displayed aspect-fill in the view.
///
/// Camera axes: +X right, +Y down, +Z forward (into the scene).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    /// Focal lengths and principal point.
    pub intrinsics: Intrinsics,
    /// Size of the camera image the intrinsics refer to.
    pub resolution: Size,
    /// Camera-to-world transform.
    pub pose: Isometry3<f64>,
}

impl PinholeCamera {
    /// Create a camera.
    #[must_use]
    pub const fn new(intrinsics: Intrinsics, resolution: Size, pose: Isometry3<f64>) -> Self {
        Self {
            intrinsics,
            resolution,
            pose,
        }
    }

    /// Uniform scale and centred crop offsets that map camera-image
    /// pixels onto the view, or `None` for degenerate geometry.
    fn aspect_fill(&self, viewport: Size) -> Option<(f64, f64, f64)> {
        if viewport.is_degenerate() || self.resolution.is_degenerate() || !self.intrinsics.is_valid()
        {
            return None;
        }
        let scale = (viewport.width / self.resolution.width)
            .max(viewport.height / self.resolution.height);
        let offset_x = self.resolution.width.mul_add(scale, -viewport.width) / 2.0;
        let offset_y = self.resolution.height.mul_add(scale, -viewport.height) / 2.0;
        Some((scale, offset_x, offset_y))
    }
}

impl Projector for PinholeCamera {
    fn project(&self, point: &Point3<f64>, viewport: Size) -> Result<Point, EstimateError> {
        let (scale, offset_x, offset_y) = self
            .aspect_fill(viewport)
            .ok_or(EstimateError::ProjectionUnavailable)?;

        let camera_point = self.pose.inverse_transform_point(point);
        if camera_point.z <= MIN_DEPTH {
            return Err(EstimateError::ProjectionUnavailable);
        }

        let k = &self.intrinsics;
        let u = k.fx.mul_add(camera_point.x / camera_point.z, k.cx);
        let v = k.fy.mul_add(camera_point.y / camera_point.z, k.cy);
        let view = Point::new(u.mul_add(scale, -offset_x), v.mul_add(scale, -offset_y));

        if view.x.is_finite() && view.y.is_finite() {
            Ok(view)
        } else {
            Err(EstimateError::ProjectionUnavailable)
        }
    }

    fn unproject(
        &self,
        point: Point,
        plane: &Matrix4<f64>,
        viewport: Size,
    ) -> Result<Point3<f64>, EstimateError> {
        let (scale, offset_x, offset_y) = self
            .aspect_fill(viewport)
            .ok_or(EstimateError::UnprojectionUnavailable)?;

        let k = &self.intrinsics;
        let u = (point.x + offset_x) / scale;
        let v = (point.y + offset_y) / scale;
        let ray = self.pose.rotation * Vector3::new((u - k.cx) / k.fx, (v - k.cy) / k.fy, 1.0);
        let eye = Point3::from(self.pose.translation.vector);

        let normal = Vector3::new(plane[(0, 2)], plane[(1, 2)], plane[(2, 2)])
            .try_normalize(PARALLEL_EPSILON)
            .ok_or(EstimateError::UnprojectionUnavailable)?;
        let denom = normal.dot(&ray);
        if denom.abs() < PARALLEL_EPSILON {
            return Err(EstimateError::UnprojectionUnavailable);
        }

        let t = normal.dot(&(translation_of(plane) - eye)) / denom;
        if !t.is_finite() || t <= 0.0 {
            return Err(EstimateError::UnprojectionUnavailable);
        }
        Ok(eye + ray * t)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nalgebra::{Translation3, UnitQuaternion};

    use super::*;

    /// Camera at the origin looking down world -Z with world +Y up.
    fn camera(resolution: Size) -> PinholeCamera {
        PinholeCamera::new(
            Intrinsics {
                fx: 100.0,
                fy: 100.0,
                cx: resolution.width / 2.0,
                cy: resolution.height / 2.0,
            },
            resolution,
            Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI),
            ),
        )
    }

    fn plane_at(z: f64) -> Matrix4<f64> {
        Translation3::new(0.0, 0.0, z).to_homogeneous()
    }

    #[test]
    fn point_on_axis_projects_to_principal_point() {
        let size = Size::new(200.0, 200.0);
        let p = camera(size)
            .project(&Point3::new(0.0, 0.0, -2.0), size)
            .unwrap();
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn world_up_projects_toward_top_of_view() {
        let size = Size::new(200.0, 200.0);
        let p = camera(size)
            .project(&Point3::new(0.0, 1.0, -2.0), size)
            .unwrap();
        assert!((p.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn point_behind_camera_is_unavailable() {
        let size = Size::new(200.0, 200.0);
        let result = camera(size).project(&Point3::new(0.0, 0.0, 2.0), size);
        assert_eq!(result, Err(EstimateError::ProjectionUnavailable));
    }

    #[test]
    fn degenerate_viewport_is_unavailable() {
        let size = Size::new(200.0, 200.0);
        let result = camera(size).project(&Point3::new(0.0, 0.0, -2.0), Size::new(0.0, 0.0));
        assert_eq!(result, Err(EstimateError::ProjectionUnavailable));
    }

    #[test]
    fn project_then_unproject_roundtrips() {
        let resolution = Size::new(640.0, 480.0);
        let viewport = Size::new(390.0, 844.0);
        let cam = camera(resolution);
        let original = Point3::new(0.3, -0.2, -1.7);
        let plane = plane_at(-1.7);

        let view = cam.project(&original, viewport).unwrap();
        let back = cam.unproject(view, &plane, viewport).unwrap();
        assert!(
            (back - original).norm() < 1e-9,
            "expected {original:?}, got {back:?}"
        );
    }

    #[test]
    fn aspect_fill_crops_wide_image_horizontally() {
        // 400x200 image in a 200x200 view: scale 1.0, 100px cropped each side.
        let resolution = Size::new(400.0, 200.0);
        let viewport = Size::new(200.0, 200.0);
        let p = camera(resolution)
            .project(&Point3::new(0.0, 0.0, -2.0), viewport)
            .unwrap();
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ray_parallel_to_plane_is_unavailable() {
        let size = Size::new(200.0, 200.0);
        // Plane normal along world X; the central ray runs along -Z.
        let plane = nalgebra::Rotation3::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2)
            .to_homogeneous();
        let result = camera(size).unproject(Point::new(100.0, 100.0), &plane, size);
        assert_eq!(result, Err(EstimateError::UnprojectionUnavailable));
    }

    #[test]
    fn plane_behind_camera_is_unavailable() {
        let size = Size::new(200.0, 200.0);
        let result = camera(size).unproject(Point::new(100.0, 100.0), &plane_at(3.0), size);
        assert_eq!(result, Err(EstimateError::UnprojectionUnavailable));
    }
}
