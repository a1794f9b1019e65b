//! Print layout model.
//!
//! A [`PageDescriptor`] declares a page and its elements; the
//! [`Composer`](composer::Composer) turns it into a [`ComposedPage`] whose
//! placed elements are ready for the export backends. Composition is
//! fault-isolated: an element that cannot be placed is recorded in the
//! skipped list with a [`SkipReason`] instead of failing the page.

use std::path::PathBuf;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::layer::GeometryType;
use crate::map::grid::GridConfig;
use crate::map::MapSettings;
use crate::Color;

pub mod composer;

pub use composer::Composer;

/// Named page formats, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 210 x 297 mm.
    A4,
    /// 297 x 420 mm.
    A3,
    /// 215.9 x 279.4 mm.
    Letter,
    /// Explicit portrait dimensions in millimeters.
    Custom {
        /// Short side, mm.
        width: f64,
        /// Long side, mm.
        height: f64,
    },
}

impl PageSize {
    /// Page dimensions in millimeters for the given orientation.
    pub fn dims_mm(&self, orientation: Orientation) -> (f64, f64) {
        let (w, h) = match self {
            Self::A4 => (210.0, 297.0),
            Self::A3 => (297.0, 420.0),
            Self::Letter => (215.9, 279.4),
            Self::Custom { width, height } => (*width, *height),
        };
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Short side horizontal.
    #[default]
    Portrait,
    /// Long side horizontal.
    Landscape,
}

/// Placement of an element on the page, in millimeters from the top-left
/// corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    /// Left edge, mm.
    pub x: f64,
    /// Top edge, mm.
    pub y: f64,
    /// Width, mm.
    pub width: f64,
    /// Height, mm.
    pub height: f64,
}

impl ElementRect {
    /// Creates a rect from its top-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A map frame on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapElement {
    /// Element identifier, referenced by legends, scale bars and arrows.
    pub id: String,
    /// Placement on the page.
    pub rect: ElementRect,
    /// Explicit extent string, `"x_min,y_min,x_max,y_max"`.
    #[serde(default)]
    pub extent: Option<String>,
    /// Cartographic scale denominator, used when no extent is given.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Layers to draw; empty means all visible layers.
    #[serde(default)]
    pub layer_ids: Vec<String>,
    /// Coordinate grid drawn over the map.
    #[serde(default)]
    pub grid: Option<GridConfig>,
    /// Whether a north arrow is placed over this map.
    #[serde(default)]
    pub north_arrow: bool,
}

/// A legend listing layer names with style swatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendElement {
    /// Element identifier.
    pub id: String,
    /// Placement on the page.
    pub rect: ElementRect,
    /// Optional legend title.
    #[serde(default)]
    pub title: Option<String>,
    /// Map whose layer list the legend mirrors. When set it must resolve to
    /// a placed map; an unresolved link skips the legend.
    #[serde(default)]
    pub linked_map_id: Option<String>,
    /// Explicit layer list, used when no map link is given.
    #[serde(default)]
    pub layer_ids: Vec<String>,
}

/// A scale bar tied to a map frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleBarElement {
    /// Element identifier.
    pub id: String,
    /// Placement on the page.
    pub rect: ElementRect,
    /// Map the bar measures. Required; an unresolved link skips the bar.
    pub linked_map_id: String,
}

/// Horizontal text alignment within a label rect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAlignment {
    /// Text starts at the left edge.
    #[default]
    Left,
    /// Text is centered.
    Center,
    /// Text ends at the right edge.
    Right,
}

/// A text block. `[DATE]` and `[SESSION_ID]` placeholders are substituted
/// during composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelElement {
    /// Element identifier.
    pub id: String,
    /// Placement on the page.
    pub rect: ElementRect,
    /// Label text, possibly containing placeholders.
    pub text: String,
    /// Font size in points.
    #[serde(default = "default_label_font_size")]
    pub font_size: f64,
    /// Whether the text is drawn bold.
    #[serde(default)]
    pub bold: bool,
    /// Horizontal alignment.
    #[serde(default)]
    pub alignment: LabelAlignment,
}

fn default_label_font_size() -> f64 {
    10.0
}

/// An attribute table fed by a vector layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableElement {
    /// Element identifier.
    pub id: String,
    /// Placement on the page.
    pub rect: ElementRect,
    /// Source vector layer.
    pub layer_id: String,
    /// Attribute columns, in order. Empty means all attributes of the first
    /// feature, sorted by name.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Row limit; zero means no limit.
    #[serde(default)]
    pub max_rows: usize,
}

/// A static picture loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    /// Element identifier.
    pub id: String,
    /// Placement on the page.
    pub rect: ElementRect,
    /// Path to a decodable image file.
    pub path: PathBuf,
}

/// A complete page declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Document title, carried into the PDF metadata.
    #[serde(default)]
    pub title: String,
    /// Page format.
    #[serde(default)]
    pub page_size: PageSize,
    /// Page orientation.
    #[serde(default)]
    pub orientation: Orientation,
    /// Map frames.
    #[serde(default)]
    pub maps: Vec<MapElement>,
    /// Legends.
    #[serde(default)]
    pub legends: Vec<LegendElement>,
    /// Scale bars.
    #[serde(default)]
    pub scale_bars: Vec<ScaleBarElement>,
    /// Text blocks.
    #[serde(default)]
    pub labels: Vec<LabelElement>,
    /// Attribute tables.
    #[serde(default)]
    pub tables: Vec<TableElement>,
    /// Static pictures.
    #[serde(default)]
    pub images: Vec<ImageElement>,
}

/// Why an element was left off the composed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The element references a map id that was not placed.
    UnresolvedMapLink {
        /// The id that failed to resolve.
        map_id: String,
    },
    /// The element references a layer missing from the registry.
    MissingLayer {
        /// The layer id.
        layer_id: String,
    },
    /// A file asset could not be loaded.
    MissingAsset {
        /// What failed to load.
        detail: String,
    },
    /// The map frame failed to render.
    RenderFailed {
        /// The underlying error, stringified.
        detail: String,
    },
    /// The table source produced no rows.
    EmptyTable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedMapLink { map_id } => {
                write!(f, "linked map {map_id:?} is not placed")
            }
            Self::MissingLayer { layer_id } => write!(f, "layer {layer_id:?} is not registered"),
            Self::MissingAsset { detail } => write!(f, "asset unavailable: {detail}"),
            Self::RenderFailed { detail } => write!(f, "render failed: {detail}"),
            Self::EmptyTable => write!(f, "table source has no rows"),
        }
    }
}

/// An element that was skipped, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedElement {
    /// The element's id from the descriptor.
    pub id: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// One legend row.
#[derive(Debug, Clone)]
pub struct LegendEntry {
    /// Layer display name.
    pub label: String,
    /// Swatch fill color.
    pub fill: Color,
    /// Swatch outline color.
    pub stroke: Color,
    /// Geometry type, shaping the swatch; `None` for raster layers.
    pub geometry: Option<GeometryType>,
}

/// Content of a placed element.
#[derive(Debug, Clone)]
pub enum PlacedContent {
    /// A rendered map frame together with its resolved settings. The
    /// settings stay attached so scale bars can be derived from the extent.
    Map {
        /// Rendered pixels at the composition DPI.
        image: RgbaImage,
        /// The settings the frame was rendered with.
        settings: MapSettings,
    },
    /// A legend with resolved entries.
    Legend {
        /// Optional title.
        title: Option<String>,
        /// Rows, in layer order.
        entries: Vec<LegendEntry>,
    },
    /// A scale bar with its chosen round length.
    ScaleBar {
        /// Drawn bar length in millimeters.
        length_mm: f64,
        /// Human-readable distance, e.g. `"500 m"`.
        label: String,
    },
    /// A text block with placeholders substituted.
    Label {
        /// Final text.
        text: String,
        /// Font size in points.
        font_size: f64,
        /// Bold flag.
        bold: bool,
        /// Horizontal alignment.
        alignment: LabelAlignment,
    },
    /// A resolved attribute table.
    Table {
        /// Column headers.
        columns: Vec<String>,
        /// Row cells, one inner vec per row.
        rows: Vec<Vec<String>>,
    },
    /// A decoded picture.
    Image(RgbaImage),
    /// The north arrow asset.
    NorthArrow(RgbaImage),
}

/// An element with its final placement and resolved content.
#[derive(Debug, Clone)]
pub struct PlacedElement {
    /// The element's id from the descriptor.
    pub id: String,
    /// Final placement on the page, mm.
    pub rect: ElementRect,
    /// Resolved content.
    pub content: PlacedContent,
}

/// The result of composing a page.
#[derive(Debug, Clone)]
pub struct ComposedPage {
    /// Document title.
    pub title: String,
    /// Page width in millimeters.
    pub width_mm: f64,
    /// Page height in millimeters.
    pub height_mm: f64,
    /// Placed elements, in draw order.
    pub elements: Vec<PlacedElement>,
    /// Elements that could not be placed.
    pub skipped: Vec<SkippedElement>,
}

impl ComposedPage {
    /// Finds a placed element by id.
    pub fn element(&self, id: &str) -> Option<&PlacedElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_dims_follow_orientation() {
        assert_eq!(PageSize::A4.dims_mm(Orientation::Portrait), (210.0, 297.0));
        assert_eq!(PageSize::A4.dims_mm(Orientation::Landscape), (297.0, 210.0));
        assert_eq!(
            PageSize::Custom {
                width: 100.0,
                height: 50.0
            }
            .dims_mm(Orientation::Portrait),
            (100.0, 50.0)
        );
    }

    #[test]
    fn descriptor_deserializes_with_defaults() {
        let page: PageDescriptor = serde_json::from_str(
            r#"{
                "title": "Croquis",
                "maps": [{"id": "m1", "rect": {"x": 10, "y": 10, "width": 180, "height": 180}}]
            }"#,
        )
        .expect("valid descriptor");
        assert_eq!(page.page_size, PageSize::A4);
        assert_eq!(page.orientation, Orientation::Portrait);
        assert_eq!(page.maps.len(), 1);
        assert!(page.maps[0].extent.is_none());
        assert!(!page.maps[0].north_arrow);
    }

    #[test]
    fn skip_reason_serializes_tagged() {
        let reason = SkipReason::UnresolvedMapLink {
            map_id: "m9".into(),
        };
        let json = serde_json::to_value(&reason).expect("serializable");
        assert_eq!(json["kind"], "unresolved_map_link");
        assert_eq!(json["map_id"], "m9");
    }
}
