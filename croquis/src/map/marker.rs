//! Survey point markers drawn on top of a rendered map.

use croquis_types::{Extent, Point2d};
use serde::{Deserialize, Serialize};

use crate::Color;

/// Shape of a point marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// Filled circle.
    Circle,
    /// Filled axis-aligned square.
    Square,
    /// Filled upward-pointing triangle.
    Triangle,
}

/// A styled point marker with an optional label.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMarker {
    /// Position in map units.
    pub position: Point2d,
    /// Label text drawn next to the marker, if labeling is enabled.
    pub label: Option<String>,
    /// Fill color.
    pub color: Color,
    /// Marker diameter in pixels.
    pub size: f32,
    /// Marker shape.
    pub style: MarkerStyle,
}

impl PointMarker {
    /// Creates a red circular marker of the default size.
    pub fn new(position: Point2d) -> Self {
        Self {
            position,
            label: None,
            color: Color::RED,
            size: 8.0,
            style: MarkerStyle::Circle,
        }
    }

    /// Sets the marker label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Markers outside the rendered extent are skipped, never an error.
    pub fn is_within(&self, extent: &Extent) -> bool {
        extent.contains(&self.position)
    }
}

/// How marker labels are drawn.
///
/// Labels are placed at a fixed pixel offset from the marker center; there is
/// no collision avoidance between neighboring labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerLabelConfig {
    /// Whether labels are drawn at all.
    pub enabled: bool,
    /// Horizontal offset from the marker center, in pixels.
    pub offset_x: f32,
    /// Vertical offset from the marker center, in pixels.
    pub offset_y: f32,
    /// Label font size in pixels.
    pub font_size: f32,
    /// Label color.
    pub color: Color,
}

impl Default for MarkerLabelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            offset_x: 6.0,
            offset_y: -6.0,
            font_size: 11.0,
            color: Color::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_includes_borders() {
        let extent = Extent::new(0.0, 0.0, 100.0, 50.0);
        assert!(PointMarker::new(Point2d::new(0.0, 0.0)).is_within(&extent));
        assert!(PointMarker::new(Point2d::new(100.0, 50.0)).is_within(&extent));
        assert!(!PointMarker::new(Point2d::new(100.1, 25.0)).is_within(&extent));
        assert!(!PointMarker::new(Point2d::new(50.0, -0.1)).is_within(&extent));
    }
}
