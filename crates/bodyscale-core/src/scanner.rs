//! Silhouette edge scanning along horizontal mask rows.
//!
//! A scan starts at a joint's projected view point and walks one view
//! column at a time toward an edge of the view, sampling the mask row at
//! the joint's height. The first sample that is not a body pixel is the
//! silhouette edge in that direction.
//!
//! Two coordinate spaces are involved:
//!
//! - **view** space, where joint projections and reported edges live;
//! - **mask** space, the segmentation image's pixel grid.
//!
//! View columns are stretched onto mask columns when generating samples.
//! Edges are mapped back through the mask's aspect-fill placement in the
//! view, which crops the overflowing axis equally on both sides.

use crate::sampler::{ForegroundClassifier, SegmentationMask};
use crate::types::{Dimensions, EstimateError, Point, ScanDirection, Size};

/// Placement of a segmentation mask within the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    view: Size,
    mask: Size,
    fill: Size,
    offset: Point,
}

impl DisplayGeometry {
    /// Compute the aspect-fill placement of a `mask`-sized image in `view`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::DegenerateViewport`] if either the view or
    /// the mask has a zero or non-finite side.
    pub fn new(view: Size, mask: Dimensions) -> Result<Self, EstimateError> {
        let mask = Size::from(mask);
        if view.is_degenerate() || mask.is_degenerate() {
            return Err(EstimateError::DegenerateViewport);
        }

        let scale = (view.width / mask.width).max(view.height / mask.height);
        let fill = Size::new(mask.width * scale, mask.height * scale);
        let offset = Point::new(
            (fill.width - view.width) / 2.0,
            (fill.height - view.height) / 2.0,
        );
        Ok(Self {
            view,
            mask,
            fill,
            offset,
        })
    }

    /// The view size.
    #[must_use]
    pub const fn view(&self) -> Size {
        self.view
    }

    /// The mask size after aspect-fill scaling into the view.
    #[must_use]
    pub const fn fill(&self) -> Size {
        self.fill
    }

    /// Map a view point onto the mask grid.
    #[must_use]
    pub fn view_to_mask(&self, p: Point) -> Point {
        Point::new(
            p.x * self.mask.width / self.view.width,
            p.y * self.mask.height / self.view.height,
        )
    }

    /// Map a mask point back into the view, undoing aspect-fill cropping.
    #[must_use]
    pub fn mask_to_view(&self, p: Point) -> Point {
        Point::new(
            p.x.mul_add(self.fill.width / self.mask.width, -self.offset.x),
            p.y.mul_add(self.fill.height / self.mask.height, -self.offset.y),
        )
    }
}

/// Lazy sequence of mask-space sample points along one row.
///
/// Yields one point per integer view column, starting at the origin's
/// column. Rightward lines run to the view width inclusive; leftward lines
/// run down to column 0.
#[derive(Debug, Clone)]
pub struct ScanLine {
    next: Option<u32>,
    last: u32,
    direction: ScanDirection,
    x_scale: f64,
    mask_width: f64,
    y: f64,
}

impl ScanLine {
    /// Build the scan line starting at view point `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::OutOfBounds`] if `origin` lies outside the
    /// view (the right edge itself is allowed, the bottom edge is not).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(
        geometry: &DisplayGeometry,
        origin: Point,
        direction: ScanDirection,
    ) -> Result<Self, EstimateError> {
        let view = geometry.view;
        if !(origin.x >= 0.0 && origin.x <= view.width && origin.y >= 0.0 && origin.y < view.height)
        {
            return Err(EstimateError::OutOfBounds {
                x: origin.x,
                y: origin.y,
            });
        }

        // Both values are finite and non-negative after the bounds check.
        let column = origin.x.floor() as u32;
        let last_column = view.width.floor() as u32;
        let last = match direction {
            ScanDirection::Rightward => last_column,
            ScanDirection::Leftward => 0,
        };

        Ok(Self {
            next: Some(column),
            last,
            direction,
            x_scale: geometry.mask.width / view.width,
            mask_width: geometry.mask.width,
            y: geometry.view_to_mask(origin).y,
        })
    }

    /// Scan direction.
    #[must_use]
    pub const fn direction(&self) -> ScanDirection {
        self.direction
    }

    fn point_at(&self, column: u32) -> Point {
        let x = f64::from(column) * self.x_scale;
        // The inclusive right edge lands one past the last mask column.
        let x = if x >= self.mask_width {
            self.mask_width - 1.0
        } else {
            x
        };
        Point::new(x, self.y)
    }
}

impl Iterator for ScanLine {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        let column = self.next?;
        self.next = match self.direction {
            ScanDirection::Rightward => (column < self.last).then_some(column + 1),
            ScanDirection::Leftward => column.checked_sub(1),
        };
        Some(self.point_at(column))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.next.map_or(0, |column| match self.direction {
            ScanDirection::Rightward => self.last.saturating_sub(column) as usize + 1,
            ScanDirection::Leftward => column as usize + 1,
        });
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScanLine {}

/// Finds silhouette edges in one mask.
#[derive(Debug, Clone, Copy)]
pub struct EdgeScanner<'a> {
    mask: &'a SegmentationMask,
    geometry: DisplayGeometry,
    classifier: &'a ForegroundClassifier,
}

impl<'a> EdgeScanner<'a> {
    /// Create a scanner for `mask` displayed in a `view`-sized viewport.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::DegenerateViewport`] for an empty view or
    /// mask.
    pub fn new(
        mask: &'a SegmentationMask,
        view: Size,
        classifier: &'a ForegroundClassifier,
    ) -> Result<Self, EstimateError> {
        Ok(Self {
            mask,
            geometry: DisplayGeometry::new(view, mask.dimensions())?,
            classifier,
        })
    }

    /// The mask's placement in the view.
    #[must_use]
    pub const fn geometry(&self) -> &DisplayGeometry {
        &self.geometry
    }

    /// The scan line from `origin` in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::OutOfBounds`] if `origin` lies outside the
    /// view.
    pub fn scan_line(&self, origin: Point, direction: ScanDirection) -> Result<ScanLine, EstimateError> {
        ScanLine::new(&self.geometry, origin, direction)
    }

    /// Returns `true` if the mask pixel at `mask_point` is a body pixel.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::OutOfBounds`] for points outside the mask.
    pub fn is_body_at(&self, mask_point: Point) -> Result<bool, EstimateError> {
        Ok(self.classifier.is_body(&self.mask.sample(mask_point)?))
    }

    /// Find the first non-body sample walking from `origin` in
    /// `direction`, in view coordinates.
    ///
    /// Returns `Ok(None)` when the whole scan line is body.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::OutOfBounds`] if `origin` lies outside the
    /// view.
    pub fn find_boundary(
        &self,
        origin: Point,
        direction: ScanDirection,
    ) -> Result<Option<Point>, EstimateError> {
        for mask_point in self.scan_line(origin, direction)? {
            if !self.is_body_at(mask_point)? {
                return Ok(Some(self.geometry.mask_to_view(mask_point)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::RgbaImage;

    use super::*;

    const WHITE: image::Rgba<u8> = image::Rgba([255, 255, 255, 255]);
    const BLACK: image::Rgba<u8> = image::Rgba([0, 0, 0, 255]);

    /// White rectangle covering columns `left..=right` on every row.
    fn band_mask(width: u32, height: u32, left: u32, right: u32) -> SegmentationMask {
        SegmentationMask::from_premultiplied(RgbaImage::from_fn(width, height, |x, _| {
            if (left..=right).contains(&x) { WHITE } else { BLACK }
        }))
    }

    fn square(side: f64) -> Size {
        Size::new(side, side)
    }

    #[test]
    fn rectangle_edges_are_exact_columns() {
        let mask = band_mask(200, 200, 81, 119);
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, square(200.0), &classifier).unwrap();
        let origin = Point::new(100.0, 100.0);

        let right = scanner
            .find_boundary(origin, ScanDirection::Rightward)
            .unwrap()
            .unwrap();
        let left = scanner
            .find_boundary(origin, ScanDirection::Leftward)
            .unwrap()
            .unwrap();
        assert_eq!(right, Point::new(120.0, 100.0));
        assert_eq!(left, Point::new(80.0, 100.0));
    }

    #[test]
    fn leftward_edge_is_nearest_the_joint() {
        // Two bands; the joint sits in the right-hand one. Scanning left
        // must stop at the gap next to the joint, not at the far band.
        let mask = SegmentationMask::from_premultiplied(RgbaImage::from_fn(200, 10, |x, _| {
            if (10..=30).contains(&x) || (60..=150).contains(&x) {
                WHITE
            } else {
                BLACK
            }
        }));
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, Size::new(200.0, 10.0), &classifier).unwrap();
        let left = scanner
            .find_boundary(Point::new(120.0, 5.0), ScanDirection::Leftward)
            .unwrap()
            .unwrap();
        assert!((left.x - 59.0).abs() < f64::EPSILON);
    }

    #[test]
    fn leftward_scan_starts_at_joint_left_of_midpoint() {
        // Joint at column 40 in a 200-wide view; the midpoint (100) is
        // background, which must not be reported as the edge.
        let mask = band_mask(200, 10, 20, 60);
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, Size::new(200.0, 10.0), &classifier).unwrap();
        let left = scanner
            .find_boundary(Point::new(40.0, 5.0), ScanDirection::Leftward)
            .unwrap()
            .unwrap();
        assert!((left.x - 19.0).abs() < f64::EPSILON);
    }

    #[test]
    fn silhouette_right_of_centre_keeps_its_width() {
        // Band at columns 120..=180 in a 200-wide view never covers the
        // midpoint; both edges must hug the band.
        let mask = band_mask(200, 10, 120, 180);
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, Size::new(200.0, 10.0), &classifier).unwrap();
        let origin = Point::new(150.0, 5.0);
        let left = scanner
            .find_boundary(origin, ScanDirection::Leftward)
            .unwrap()
            .unwrap();
        let right = scanner
            .find_boundary(origin, ScanDirection::Rightward)
            .unwrap()
            .unwrap();
        assert_eq!(left, Point::new(119.0, 5.0));
        assert_eq!(right, Point::new(181.0, 5.0));
        assert!((right.distance(left) - 62.0).abs() < f64::EPSILON);
    }

    #[test]
    fn full_body_row_has_no_boundary() {
        let mask = band_mask(50, 5, 0, 49);
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, Size::new(50.0, 5.0), &classifier).unwrap();
        let origin = Point::new(25.0, 2.0);
        assert_eq!(scanner.find_boundary(origin, ScanDirection::Rightward), Ok(None));
        assert_eq!(scanner.find_boundary(origin, ScanDirection::Leftward), Ok(None));
    }

    #[test]
    fn origin_outside_view_is_out_of_bounds() {
        let mask = band_mask(50, 5, 0, 49);
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, Size::new(50.0, 5.0), &classifier).unwrap();
        assert!(matches!(
            scanner.find_boundary(Point::new(-1.0, 2.0), ScanDirection::Rightward),
            Err(EstimateError::OutOfBounds { .. })
        ));
        assert!(matches!(
            scanner.find_boundary(Point::new(10.0, 5.0), ScanDirection::Leftward),
            Err(EstimateError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rightward_line_covers_joint_column_to_view_edge() {
        let geometry = DisplayGeometry::new(square(10.0), Dimensions { width: 10, height: 10 }).unwrap();
        let line = ScanLine::new(&geometry, Point::new(6.7, 3.0), ScanDirection::Rightward).unwrap();
        assert_eq!(line.len(), 5);
        let xs: Vec<f64> = line.map(|p| p.x).collect();
        // Column 10 is the inclusive view edge, clamped onto mask column 9.
        assert_eq!(xs, vec![6.0, 7.0, 8.0, 9.0, 9.0]);
    }

    #[test]
    fn leftward_line_walks_from_joint_column_to_zero() {
        let geometry = DisplayGeometry::new(square(10.0), Dimensions { width: 10, height: 10 }).unwrap();
        let line = ScanLine::new(&geometry, Point::new(8.4, 3.0), ScanDirection::Leftward).unwrap();
        assert_eq!(line.len(), 9);
        let xs: Vec<f64> = line.map(|p| p.x).collect();
        assert_eq!(xs, vec![8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn scan_line_scales_view_columns_into_mask() {
        // Mask at half the view resolution.
        let geometry = DisplayGeometry::new(square(20.0), Dimensions { width: 10, height: 10 }).unwrap();
        let mut line = ScanLine::new(&geometry, Point::new(4.0, 8.0), ScanDirection::Rightward).unwrap();
        assert_eq!(line.next(), Some(Point::new(2.0, 4.0)));
        assert_eq!(line.next(), Some(Point::new(2.5, 4.0)));
    }

    #[test]
    fn aspect_fill_offsets_wide_mask() {
        // 20x10 mask in a 10x10 view: filled to 20x10, 5 cropped per side.
        let geometry = DisplayGeometry::new(square(10.0), Dimensions { width: 20, height: 10 }).unwrap();
        assert_eq!(geometry.fill(), Size::new(20.0, 10.0));
        assert_eq!(geometry.mask_to_view(Point::new(10.0, 4.0)), Point::new(5.0, 4.0));
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert_eq!(
            DisplayGeometry::new(square(0.0), Dimensions { width: 10, height: 10 }),
            Err(EstimateError::DegenerateViewport)
        );
        assert_eq!(
            DisplayGeometry::new(square(10.0), Dimensions { width: 0, height: 10 }),
            Err(EstimateError::DegenerateViewport)
        );
    }

    #[test]
    fn transparent_pixels_count_as_background() {
        let mask = SegmentationMask::from_premultiplied(RgbaImage::from_fn(10, 1, |x, _| {
            if x < 6 {
                WHITE
            } else {
                image::Rgba([0, 0, 0, 0])
            }
        }));
        let classifier = ForegroundClassifier::default();
        let scanner = EdgeScanner::new(&mask, Size::new(10.0, 1.0), &classifier).unwrap();
        let right = scanner
            .find_boundary(Point::new(2.0, 0.0), ScanDirection::Rightward)
            .unwrap();
        assert_eq!(right, Some(Point::new(6.0, 0.0)));
    }
}
