//! Request records exchanged with the outer service layer.
//!
//! These types mirror the JSON bodies of the render and document endpoints.
//! All optional fields carry defaults, so a minimal request like `{}` is
//! valid and renders an empty world map.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::error::{CroquisError, Result};
use crate::export::{DocumentExporter, ExportFormat};
use crate::layer::LayerRegistry;
use crate::layout::{
    Composer, ImageElement, LabelElement, LegendElement, MapElement, Orientation, PageDescriptor,
    PageSize, ScaleBarElement, SkippedElement, TableElement,
};
use crate::map::grid::GridConfig;
use crate::map::marker::{MarkerLabelConfig, MarkerStyle, PointMarker};
use crate::map::MapSettingsBuilder;
use crate::render::{encode, ImageFormat, MapRenderer, OverlayConfig, RenderedImage};
use crate::Color;
use croquis_types::Point2d;

/// A point marker as it appears in request JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// X coordinate in map units.
    pub x: f64,
    /// Y coordinate in map units.
    pub y: f64,
    /// Optional label text.
    #[serde(default)]
    pub label: Option<String>,
    /// Marker color, hex or keyword.
    #[serde(default)]
    pub color: Option<String>,
    /// Marker size in pixels.
    #[serde(default)]
    pub size: Option<f32>,
    /// Marker shape.
    #[serde(default)]
    pub style: Option<MarkerStyle>,
}

impl MarkerSpec {
    fn into_marker(self, index: usize) -> Result<PointMarker> {
        let mut marker = PointMarker::new(Point2d::new(self.x, self.y));
        if let Some(label) = self.label {
            marker = marker.with_label(label);
        }
        if let Some(color) = &self.color {
            marker.color = Color::try_parse(color).ok_or_else(|| {
                CroquisError::config(
                    "markers.color",
                    format!("{color:?} at index {index} is not a color"),
                )
            })?;
        }
        if let Some(size) = self.size {
            marker.size = size;
        }
        if let Some(style) = self.style {
            marker.style = style;
        }
        Ok(marker)
    }
}

/// Marker label options as they appear in request JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerLabelSpec {
    /// Disables all marker labels when false.
    pub enabled: Option<bool>,
    /// Horizontal pixel offset from the marker.
    pub offset_x: Option<f32>,
    /// Vertical pixel offset from the marker.
    pub offset_y: Option<f32>,
    /// Font size in pixels.
    pub font_size: Option<f32>,
}

impl MarkerLabelSpec {
    fn into_config(self) -> MarkerLabelConfig {
        let mut config = MarkerLabelConfig::default();
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(offset_x) = self.offset_x {
            config.offset_x = offset_x;
        }
        if let Some(offset_y) = self.offset_y {
            config.offset_y = offset_y;
        }
        if let Some(font_size) = self.font_size {
            config.font_size = font_size;
        }
        config
    }
}

/// Body of the direct map render endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderMapRequest {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output DPI, used by the scale resolution.
    pub dpi: f64,
    /// Output encoding.
    pub format: ImageFormat,
    /// Explicit extent string, `"x_min,y_min,x_max,y_max"`.
    pub extent: Option<String>,
    /// Cartographic scale denominator.
    pub scale: Option<f64>,
    /// Background color, hex or keyword.
    pub background: Option<String>,
    /// Layers to draw; empty means all visible layers.
    pub layers: Vec<String>,
    /// Grid overlay settings.
    pub grid: GridConfig,
    /// Point markers.
    pub markers: Vec<MarkerSpec>,
    /// Marker label options.
    pub marker_labels: MarkerLabelSpec,
}

impl Default for RenderMapRequest {
    fn default() -> Self {
        Self {
            width: MapSettingsBuilder::DEFAULT_WIDTH,
            height: MapSettingsBuilder::DEFAULT_HEIGHT,
            dpi: MapSettingsBuilder::DEFAULT_DPI,
            format: ImageFormat::Png,
            extent: None,
            scale: None,
            background: None,
            layers: Vec::new(),
            grid: GridConfig::default(),
            markers: Vec::new(),
            marker_labels: MarkerLabelSpec::default(),
        }
    }
}

/// Renders a map for a request, returning encoded image bytes.
pub fn render_map(
    registry: &dyn LayerRegistry,
    context: &RenderContext,
    request: RenderMapRequest,
) -> Result<RenderedImage> {
    let mut builder = MapSettingsBuilder::new()
        .size(request.width, request.height)
        .dpi(request.dpi)
        .layers(request.layers);
    if let Some(extent) = request.extent {
        builder = builder.extent_str(extent);
    }
    if let Some(scale) = request.scale {
        builder = builder.scale(scale);
    }
    if let Some(background) = &request.background {
        let color = Color::try_parse(background).ok_or_else(|| {
            CroquisError::config("background", format!("{background:?} is not a color"))
        })?;
        builder = builder.background(color);
    }
    let settings = builder.build(registry)?;

    let markers = request
        .markers
        .into_iter()
        .enumerate()
        .map(|(i, spec)| spec.into_marker(i))
        .collect::<Result<Vec<_>>>()?;
    let overlays = OverlayConfig {
        grid: request.grid,
        markers,
        marker_labels: request.marker_labels.into_config(),
    };

    let pixmap = MapRenderer::new(registry, context).render(&settings, &overlays)?;
    encode(&pixmap, request.format)
}

/// Document-level settings of a layout request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSpec {
    /// Document title.
    pub title: String,
    /// Page format.
    pub page_size: PageSize,
    /// Page orientation.
    pub orientation: Orientation,
}

/// Body of the document generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    /// Working session the document belongs to; substituted for
    /// `[SESSION_ID]` in labels and used in the output file name.
    pub session_id: String,
    /// Page-level settings.
    #[serde(default)]
    pub document: DocumentSpec,
    /// Output format.
    #[serde(default = "default_export_format")]
    pub format: ExportFormat,
    /// Map frames.
    #[serde(default)]
    pub maps: Vec<MapElement>,
    /// Legends.
    #[serde(default)]
    pub legends: Vec<LegendElement>,
    /// Scale bars.
    #[serde(default)]
    pub scales: Vec<ScaleBarElement>,
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

fn default_export_format() -> ExportFormat {
    ExportFormat::Pdf
}

/// Outcome of a document generation request.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Where the document was written.
    pub path: PathBuf,
    /// Number of elements placed on the page.
    pub placed: usize,
    /// Elements that were skipped, with reasons.
    pub skipped: Vec<SkippedElement>,
}

/// Composes and exports a document into `output_dir`.
///
/// The file is named after the session, e.g. `croquis_<session>.pdf`.
pub fn generate_document(
    registry: &dyn LayerRegistry,
    context: &RenderContext,
    request: DocumentRequest,
    output_dir: &Path,
) -> Result<DocumentSummary> {
    let page = PageDescriptor {
        title: request.document.title,
        page_size: request.document.page_size,
        orientation: request.document.orientation,
        maps: request.maps,
        legends: request.legends,
        scale_bars: request.scales,
        labels: request.labels,
        tables: request.tables,
        images: request.images,
    };

    let composed = Composer::new(registry, context).compose(&page, &request.session_id)?;
    let file_name = format!(
        "croquis_{}.{}",
        request.session_id,
        request.format.extension()
    );
    let result = DocumentExporter::new(context).export(
        &composed,
        request.format,
        &output_dir.join(file_name),
    )?;

    Ok(DocumentSummary {
        path: result.path,
        placed: composed.elements.len(),
        skipped: composed.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Feature, Geometry, LayerSource, MemoryRegistry, VectorLayer};
    use crate::layout::ElementRect;
    use croquis_types::Crs;

    fn registry_with_line() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        let line = Geometry::Line(vec![Point2d::new(0.0, 0.0), Point2d::new(50.0, 50.0)]);
        registry.add_layer(LayerSource::Vector(
            VectorLayer::new("route", "Route", Crs::default())
                .with_features(vec![Feature::new(line)]),
        ));
        registry
    }

    #[test]
    fn minimal_request_deserializes_with_defaults() {
        let request: RenderMapRequest = serde_json::from_str("{}").expect("valid request");
        assert_eq!(request.width, 800);
        assert_eq!(request.height, 600);
        assert_eq!(request.format, ImageFormat::Png);
        assert!(!request.grid.enabled);
    }

    #[test]
    fn render_map_returns_png_bytes() {
        let registry = registry_with_line();
        let request = RenderMapRequest {
            extent: Some("0,0,50,50".into()),
            ..Default::default()
        };
        let rendered =
            render_map(&registry, &RenderContext::new(), request).expect("render succeeds");
        assert_eq!(rendered.content_type, "image/png");
        let decoded = image::load_from_memory(&rendered.bytes).expect("valid png");
        assert_eq!(decoded.width(), 800);
    }

    #[test]
    fn omitted_background_renders_transparent_pixels() {
        let registry = registry_with_line();
        let request = RenderMapRequest {
            width: 8,
            height: 8,
            extent: Some("10,10,11,11".into()),
            ..Default::default()
        };
        let rendered =
            render_map(&registry, &RenderContext::new(), request).expect("render succeeds");
        let decoded = image::load_from_memory(&rendered.bytes)
            .expect("valid png")
            .to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn non_ascii_grid_color_does_not_panic() {
        let request: RenderMapRequest =
            serde_json::from_str(r##"{"grid": {"color": "#aé000"}}"##)
                .expect("request deserializes");
        assert_eq!(request.grid.color, Color::BLACK);
    }

    #[test]
    fn bad_background_color_is_a_configuration_error() {
        let registry = registry_with_line();
        let request = RenderMapRequest {
            background: Some("not-a-color".into()),
            ..Default::default()
        };
        let err = render_map(&registry, &RenderContext::new(), request).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn marker_spec_converts_with_overrides() {
        let spec = MarkerSpec {
            x: 3.0,
            y: 4.0,
            label: Some("B1".into()),
            color: Some("#00FF00".into()),
            size: Some(12.0),
            style: Some(MarkerStyle::Square),
        };
        let marker = spec.into_marker(0).expect("valid spec");
        assert_eq!(marker.position, Point2d::new(3.0, 4.0));
        assert_eq!(marker.style, MarkerStyle::Square);
        assert_eq!(marker.color, Color::rgba(0, 255, 0, 255));
    }

    #[test]
    fn generate_document_writes_a_pdf_and_reports_skips() {
        let registry = registry_with_line();
        let dir = tempfile::tempdir().expect("temp dir");
        let request = DocumentRequest {
            session_id: "s42".into(),
            document: DocumentSpec {
                title: "Croquis".into(),
                ..Default::default()
            },
            format: ExportFormat::Pdf,
            maps: vec![MapElement {
                id: "m1".into(),
                rect: ElementRect::new(10.0, 10.0, 100.0, 100.0),
                extent: Some("0,0,50,50".into()),
                scale: None,
                layer_ids: vec!["route".into()],
                grid: None,
                north_arrow: false,
            }],
            legends: Vec::new(),
            scales: vec![ScaleBarElement {
                id: "sb1".into(),
                rect: ElementRect::new(10.0, 120.0, 50.0, 8.0),
                linked_map_id: "ghost".into(),
            }],
            labels: Vec::new(),
            tables: Vec::new(),
            images: Vec::new(),
        };

        let summary = generate_document(&registry, &RenderContext::new(), request, dir.path())
            .expect("generation succeeds");
        assert_eq!(summary.placed, 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].id, "sb1");
        let bytes = std::fs::read(&summary.path).expect("file written");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(summary.path.file_name().unwrap().to_str().unwrap().starts_with("croquis_s42"));
    }
}
