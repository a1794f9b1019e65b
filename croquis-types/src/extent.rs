//! Axis-aligned bounding rectangles in map units.

use serde::{Deserialize, Serialize};

use crate::point::Point2d;
use crate::size::Size;

/// Meters in one inch, used to convert a print scale into map units per pixel.
const METERS_PER_INCH: f64 = 0.0254;

/// An axis-aligned rectangle in map units.
///
/// A valid extent has `x_min <= x_max` and `y_min <= y_max`. The distinguished
/// [`Extent::EMPTY`] value inverts the bounds and acts as the identity element
/// of [`Extent::union`], so extents can be accumulated starting from it
/// without special-casing the first operand.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Left bound.
    pub x_min: f64,
    /// Bottom bound.
    pub y_min: f64,
    /// Right bound.
    pub x_max: f64,
    /// Top bound.
    pub y_max: f64,
}

impl Extent {
    /// The empty extent. Union seed; never produced by [`Extent::new`].
    pub const EMPTY: Extent = Extent {
        x_min: f64::MAX,
        y_min: f64::MAX,
        x_max: f64::MIN,
        y_max: f64::MIN,
    };

    /// The whole world in geographic coordinates. Fallback framing when
    /// nothing else resolves an extent.
    pub const WORLD: Extent = Extent {
        x_min: -180.0,
        y_min: -90.0,
        x_max: 180.0,
        y_max: 90.0,
    };

    /// Creates an extent, swapping bounds if they are given in reverse order.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    /// Returns true for the empty sentinel (inverted bounds).
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    /// Returns true if the extent covers no area (empty or degenerate).
    pub fn is_degenerate(&self) -> bool {
        self.is_empty() || self.width() == 0.0 || self.height() == 0.0
    }

    /// Width in map units.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height in map units.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Center point of the extent.
    pub fn center(&self) -> Point2d {
        Point2d::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Smallest extent containing both operands. If one operand is empty the
    /// other is returned unchanged.
    pub fn union(&self, other: Extent) -> Extent {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return *self;
        }

        Extent {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Grows each horizontal side by `fraction * width` and each vertical
    /// side by `fraction * height`. Used as the default 5% framing margin
    /// when a map is framed around its layers.
    pub fn expand_by_margin(&self, fraction: f64) -> Extent {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Extent {
            x_min: self.x_min - dx,
            y_min: self.y_min - dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Derives the extent shown at a given print scale.
    ///
    /// Map units per pixel are `scale * 0.0254 / dpi`, which assumes one map
    /// unit is one meter. That approximation is geodetically wrong for
    /// degree-based coordinate systems but is applied uniformly regardless of
    /// CRS; callers wanting correct framing in geographic coordinates must
    /// pass an explicit extent instead.
    pub fn for_scale(center: Point2d, scale: f64, output_size: Size<f64>, dpi: f64) -> Extent {
        let units_per_pixel = scale * METERS_PER_INCH / dpi;
        let half_width = output_size.width() * units_per_pixel / 2.0;
        let half_height = output_size.height() * units_per_pixel / 2.0;
        Extent {
            x_min: center.x - half_width,
            y_min: center.y - half_height,
            x_max: center.x + half_width,
            y_max: center.y + half_height,
        }
    }

    /// Bounding extent of a point set; [`Extent::EMPTY`] for an empty set.
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point2d>) -> Extent {
        points.fold(Extent::EMPTY, |acc, p| {
            acc.union(Extent::new(p.x, p.y, p.x, p.y))
        })
    }

    /// Returns true if the point lies inside the extent, borders included.
    pub fn contains(&self, point: &Point2d) -> bool {
        !self.is_empty()
            && self.x_min <= point.x
            && self.x_max >= point.x
            && self.y_min <= point.y
            && self.y_max >= point.y
    }
}

impl FromIterator<Extent> for Extent {
    fn from_iter<T: IntoIterator<Item = Extent>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Extent::EMPTY, |acc, next| acc.union(next))
    }
}
