//! Coordinate grid overlay: line positions, styles and label placement.
//!
//! Grid geometry is a pure function of the extent, configuration and output
//! size. Lines sit on absolute multiples of the spacing rather than being
//! anchored to the visible window, so renders of overlapping extents show
//! continuous grid lines across image borders.

use croquis_types::{Extent, PixelTransform, Size};
use serde::{Deserialize, Serialize};

use crate::error::{CroquisError, Result};
use crate::Color;

/// Upper bound on grid lines per axis. A spacing that produces more than
/// this is rejected as a configuration error instead of freezing the render.
const MAX_LINES_PER_AXIS: usize = 10_000;

/// How grid intersections are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridStyle {
    /// Full-width and full-height lines.
    Lines,
    /// A dot at every line intersection.
    Dots,
    /// A small `+` glyph at every line intersection.
    Crosses,
}

/// Which grid lines receive coordinate labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridLabelPosition {
    /// Only the first and last grid line of each axis.
    Corners,
    /// Accepted for compatibility; labels the same lines as
    /// [`GridLabelPosition::Corners`].
    Edges,
    /// Every grid line.
    All,
}

/// Grid overlay configuration for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Whether the grid is drawn at all.
    pub enabled: bool,
    /// Drawing variant.
    pub style: GridStyle,
    /// Distance between grid lines in map units. Must be positive.
    pub spacing: f64,
    /// Line/dot/cross color.
    pub color: Color,
    /// Line width in pixels.
    pub line_width: f32,
    /// Whether coordinate labels are drawn.
    pub labels_enabled: bool,
    /// Which lines are labeled.
    pub label_position: GridLabelPosition,
    /// Label font size in pixels.
    pub label_font_size: f32,
    /// Labels along vertical lines (rotated 90 degrees).
    pub show_vertical_labels: bool,
    /// Labels along horizontal lines.
    pub show_horizontal_labels: bool,
    /// Arm length of the `+` glyph for [`GridStyle::Crosses`], in pixels.
    pub cross_arm: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            style: GridStyle::Lines,
            spacing: 1.0,
            color: Color::BLUE,
            line_width: 1.0,
            labels_enabled: false,
            label_position: GridLabelPosition::All,
            label_font_size: 10.0,
            show_vertical_labels: true,
            show_horizontal_labels: true,
            cross_arm: 6.0,
        }
    }
}

/// One grid line: its map coordinate, pixel position and label.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    /// Coordinate of the line in map units (a multiple of the spacing).
    pub value: f64,
    /// Pixel position along the perpendicular axis.
    pub pixel: f64,
    /// Label text if this line is labeled under the configured policy.
    pub label: Option<String>,
}

/// Computed grid geometry, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    /// Vertical lines, ascending by x.
    pub vertical: Vec<GridLine>,
    /// Horizontal lines, ascending by y.
    pub horizontal: Vec<GridLine>,
}

impl GridGeometry {
    /// Pixel positions of all line intersections (for dots and crosses).
    pub fn intersections(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.vertical.iter().flat_map(move |v| {
            self.horizontal.iter().map(move |h| (v.pixel, h.pixel))
        })
    }
}

/// Grid line coordinates within `[min, max]`, as ascending multiples of
/// `spacing`.
///
/// Values are computed as `k * spacing` with integer `k`, so two overlapping
/// extents produce bit-identical coordinates in their shared range.
pub fn grid_positions(min: f64, max: f64, spacing: f64) -> Vec<f64> {
    debug_assert!(spacing > 0.0);
    let mut positions = Vec::new();
    let mut k = (min / spacing).floor() as i64;
    loop {
        let value = k as f64 * spacing;
        if value > max {
            break;
        }
        // The floor-aligned start may fall below the window; clip it.
        if value >= min {
            positions.push(value);
        }
        k += 1;
    }
    positions
}

/// Computes the grid geometry for one render.
///
/// Fails only on invalid configuration (non-positive spacing, or a spacing so
/// small relative to the extent that the line count explodes).
pub fn compute_grid(
    extent: Extent,
    config: &GridConfig,
    output_size: Size<f64>,
) -> Result<GridGeometry> {
    if !(config.spacing > 0.0) {
        return Err(CroquisError::config(
            "grid.spacing",
            format!("{} is not positive", config.spacing),
        ));
    }
    let max_span = extent.width().max(extent.height());
    if max_span / config.spacing > MAX_LINES_PER_AXIS as f64 {
        return Err(CroquisError::config(
            "grid.spacing",
            format!(
                "spacing {} produces more than {MAX_LINES_PER_AXIS} lines over extent width {max_span}",
                config.spacing
            ),
        ));
    }

    let transform = PixelTransform::new(extent, output_size).ok_or_else(|| {
        CroquisError::DegenerateGeometry("grid requested over a zero-area extent".into())
    })?;

    let x_values = grid_positions(extent.x_min, extent.x_max, config.spacing);
    let y_values = grid_positions(extent.y_min, extent.y_max, config.spacing);

    let vertical = build_lines(&x_values, config, config.show_vertical_labels, |v| {
        transform.x_to_pixel(v)
    });
    let horizontal = build_lines(&y_values, config, config.show_horizontal_labels, |v| {
        transform.y_to_pixel(v)
    });

    Ok(GridGeometry { vertical, horizontal })
}

fn build_lines(
    values: &[f64],
    config: &GridConfig,
    axis_labels: bool,
    to_pixel: impl Fn(f64) -> f64,
) -> Vec<GridLine> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| GridLine {
            value,
            pixel: to_pixel(value),
            label: if config.labels_enabled && axis_labels && is_labeled(config.label_position, i, values.len())
            {
                Some(format_grid_label(value))
            } else {
                None
            },
        })
        .collect()
}

fn is_labeled(position: GridLabelPosition, index: usize, count: usize) -> bool {
    match position {
        // `Edges` is deliberately the same selection as `Corners`.
        GridLabelPosition::Corners | GridLabelPosition::Edges => {
            index == 0 || index + 1 == count
        }
        GridLabelPosition::All => true,
    }
}

/// Formats a grid coordinate label: two decimals with a degree suffix.
pub fn format_grid_label(value: f64) -> String {
    format!("{value:.2}°")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> GridConfig {
        GridConfig {
            enabled: true,
            spacing: 10.0,
            labels_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_the_request_contract() {
        let config = GridConfig::default();
        assert!(!config.enabled);
        assert!(!config.labels_enabled);
        assert_eq!(config.spacing, 1.0);
        assert_eq!(config.color, Color::BLUE);
    }

    #[test]
    fn positions_are_absolute_multiples() {
        assert_eq!(
            grid_positions(0.0, 100.0, 10.0),
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
        );
        // Start below the window is discarded, alignment stays absolute.
        assert_eq!(grid_positions(5.0, 25.0, 10.0), vec![10.0, 20.0]);
        assert_eq!(grid_positions(-25.0, -5.0, 10.0), vec![-20.0, -10.0]);
    }

    #[test]
    fn positions_are_idempotent_and_ascending() {
        let a = grid_positions(12.3, 987.6, 7.5);
        let b = grid_positions(12.3, 987.6, 7.5);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn overlapping_extents_agree_in_the_overlap() {
        let left = grid_positions(0.0, 60.0, 7.0);
        let right = grid_positions(30.0, 100.0, 7.0);
        let overlap_left: Vec<f64> = left.iter().copied().filter(|v| *v >= 30.0).collect();
        let overlap_right: Vec<f64> = right.iter().copied().filter(|v| *v <= 60.0).collect();
        assert_eq!(overlap_left, overlap_right);
    }

    #[test]
    fn eleven_by_six_lines_all_labeled() {
        let grid = compute_grid(
            Extent::new(0.0, 0.0, 100.0, 50.0),
            &enabled_config(),
            Size::new(800.0, 600.0),
        )
        .expect("valid grid");

        assert_eq!(grid.vertical.len(), 11);
        assert_eq!(grid.horizontal.len(), 6);
        assert!(grid.vertical.iter().all(|l| l.label.is_some()));
        assert!(grid.horizontal.iter().all(|l| l.label.is_some()));
        assert_eq!(grid.vertical[0].label.as_deref(), Some("0.00°"));
        assert_eq!(grid.vertical[10].label.as_deref(), Some("100.00°"));
        assert_eq!(grid.intersections().count(), 66);
    }

    #[test]
    fn corners_and_edges_label_first_and_last_only() {
        for position in [GridLabelPosition::Corners, GridLabelPosition::Edges] {
            let config = GridConfig {
                label_position: position,
                ..enabled_config()
            };
            let grid = compute_grid(
                Extent::new(0.0, 0.0, 100.0, 50.0),
                &config,
                Size::new(800.0, 600.0),
            )
            .expect("valid grid");

            let labeled: Vec<usize> = grid
                .vertical
                .iter()
                .enumerate()
                .filter(|(_, l)| l.label.is_some())
                .map(|(i, _)| i)
                .collect();
            assert_eq!(labeled, vec![0, 10]);
        }
    }

    #[test]
    fn axis_label_toggles_are_independent() {
        let config = GridConfig {
            show_vertical_labels: false,
            ..enabled_config()
        };
        let grid = compute_grid(
            Extent::new(0.0, 0.0, 100.0, 50.0),
            &config,
            Size::new(800.0, 600.0),
        )
        .expect("valid grid");
        assert!(grid.vertical.iter().all(|l| l.label.is_none()));
        assert!(grid.horizontal.iter().all(|l| l.label.is_some()));
    }

    #[test]
    fn pixel_positions_follow_the_transform() {
        let grid = compute_grid(
            Extent::new(0.0, 0.0, 100.0, 50.0),
            &enabled_config(),
            Size::new(800.0, 600.0),
        )
        .expect("valid grid");

        assert_eq!(grid.vertical[0].pixel, 0.0);
        assert_eq!(grid.vertical[10].pixel, 800.0);
        // Horizontal lines ascend by y, so y = 0 is the bottom pixel row.
        assert_eq!(grid.horizontal[0].pixel, 600.0);
        assert_eq!(grid.horizontal[5].pixel, 0.0);
    }

    #[test]
    fn invalid_spacing_is_a_configuration_error() {
        use assert_matches::assert_matches;
        let config = GridConfig {
            spacing: 0.0,
            ..enabled_config()
        };
        assert_matches!(
            compute_grid(
                Extent::new(0.0, 0.0, 100.0, 50.0),
                &config,
                Size::new(800.0, 600.0)
            ),
            Err(CroquisError::Configuration { .. })
        );

        let config = GridConfig {
            spacing: 1e-6,
            ..enabled_config()
        };
        assert_matches!(
            compute_grid(
                Extent::new(0.0, 0.0, 100.0, 50.0),
                &config,
                Size::new(800.0, 600.0)
            ),
            Err(CroquisError::Configuration { .. })
        );
    }
}
