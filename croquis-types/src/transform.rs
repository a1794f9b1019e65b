//! Linear transform between map coordinates and output pixels.

use crate::extent::Extent;
use crate::point::Point2d;
use crate::size::Size;

/// Projects map coordinates onto an output raster of a fixed pixel size.
///
/// The map Y axis points up while the pixel Y axis points down, so the
/// vertical component is inverted: the extent's top edge maps to pixel row 0
/// and its bottom edge to row `height`.
#[derive(Debug, Clone, Copy)]
pub struct PixelTransform {
    extent: Extent,
    size: Size<f64>,
}

impl PixelTransform {
    /// Creates a transform for the given extent and output size. Returns
    /// `None` for degenerate extents or zero output sizes, for which no
    /// meaningful projection exists.
    pub fn new(extent: Extent, size: Size<f64>) -> Option<Self> {
        if extent.is_degenerate() || size.is_zero() {
            return None;
        }
        Some(Self { extent, size })
    }

    /// The extent this transform projects from.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Map X coordinate to pixel column.
    pub fn x_to_pixel(&self, x: f64) -> f64 {
        (x - self.extent.x_min) / self.extent.width() * self.size.width()
    }

    /// Map Y coordinate to pixel row (inverted axis).
    pub fn y_to_pixel(&self, y: f64) -> f64 {
        (1.0 - (y - self.extent.y_min) / self.extent.height()) * self.size.height()
    }

    /// Map point to pixel coordinates.
    pub fn to_pixel(&self, point: &Point2d) -> Point2d {
        Point2d::new(self.x_to_pixel(point.x), self.y_to_pixel(point.y))
    }

    /// Pixel coordinates back to map coordinates.
    pub fn to_map(&self, pixel: &Point2d) -> Point2d {
        Point2d::new(
            self.extent.x_min + pixel.x / self.size.width() * self.extent.width(),
            self.extent.y_min + (1.0 - pixel.y / self.size.height()) * self.extent.height(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn transform() -> PixelTransform {
        PixelTransform::new(
            Extent::new(0.0, 0.0, 100.0, 50.0),
            Size::new(800.0, 600.0),
        )
        .expect("valid transform")
    }

    #[test]
    fn corners_project_to_pixel_corners() {
        let t = transform();
        let bottom_left = t.to_pixel(&Point2d::new(0.0, 0.0));
        assert_abs_diff_eq!(bottom_left, Point2d::new(0.0, 600.0));

        let top_right = t.to_pixel(&Point2d::new(100.0, 50.0));
        assert_abs_diff_eq!(top_right, Point2d::new(800.0, 0.0));
    }

    #[test]
    fn center_projects_to_center() {
        let t = transform();
        assert_abs_diff_eq!(
            t.to_pixel(&Point2d::new(50.0, 25.0)),
            Point2d::new(400.0, 300.0)
        );
    }

    #[test]
    fn round_trips_within_epsilon() {
        let t = transform();
        let original = Point2d::new(12.34, 43.21);
        let round_tripped = t.to_map(&t.to_pixel(&original));
        assert_abs_diff_eq!(round_tripped, original, epsilon = 1e-10);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(PixelTransform::new(Extent::EMPTY, Size::new(800.0, 600.0)).is_none());
        assert!(PixelTransform::new(
            Extent::new(0.0, 0.0, 0.0, 10.0),
            Size::new(800.0, 600.0)
        )
        .is_none());
        assert!(
            PixelTransform::new(Extent::new(0.0, 0.0, 10.0, 10.0), Size::new(0.0, 600.0)).is_none()
        );
    }
}
