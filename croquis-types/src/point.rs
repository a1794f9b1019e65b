//! Point types for map coordinates.

pub use nalgebra::Point2;

/// A point in map units.
pub type Point2d = Point2<f64>;

/// Euclidean distance between two points in map units.
pub fn distance(a: &Point2d, b: &Point2d) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}
