//! Map rendering pipeline.
//!
//! [`MapRenderer`] turns resolved [`MapSettings`](crate::map::MapSettings)
//! plus layer data into a pixel image. Rendering is fully CPU-side: layer
//! geometry is projected into pixel space and rasterized bottom-to-top, then
//! grid and marker overlays are drawn on top of the layer stack.

use std::io::Cursor;

use image::RgbaImage;
use log::warn;
use serde::{Deserialize, Serialize};
use tiny_skia::{Pixmap, Transform};

use crate::context::RenderContext;
use crate::error::{CroquisError, Result};
use crate::layer::{Feature, Geometry, LayerRegistry, LayerSource, VectorStyle};
use crate::map::grid::{compute_grid, GridConfig, GridStyle};
use crate::map::marker::{MarkerLabelConfig, MarkerStyle, PointMarker};
use crate::map::MapSettings;
use croquis_types::{Extent, PixelTransform, Point2d};

pub mod canvas;
pub mod text;

pub use canvas::Canvas;
pub use text::TextEngine;

/// Overlays drawn on top of the layer stack.
#[derive(Debug, Default, Clone)]
pub struct OverlayConfig {
    /// Coordinate grid settings.
    pub grid: GridConfig,
    /// Point markers pinned to map coordinates.
    pub markers: Vec<PointMarker>,
    /// How marker labels are offset and styled.
    pub marker_labels: MarkerLabelConfig,
}

/// Raster output formats for direct map rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG with an alpha channel.
    Png,
    /// JPEG, flattened onto a white background.
    Jpeg,
}

impl ImageFormat {
    /// MIME type of the encoded output.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// An encoded raster image ready to be sent to a client or written to disk.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// MIME type matching the bytes.
    pub content_type: &'static str,
}

/// Renders maps from registry layers into pixmaps.
pub struct MapRenderer<'a> {
    registry: &'a dyn LayerRegistry,
    context: &'a RenderContext,
}

impl<'a> MapRenderer<'a> {
    /// Creates a renderer over the given layer registry and shared assets.
    pub fn new(registry: &'a dyn LayerRegistry, context: &'a RenderContext) -> Self {
        Self { registry, context }
    }

    /// Renders the map into a pixmap.
    ///
    /// Layers are drawn in registry order, bottom-to-top, followed by the
    /// grid and then the markers. Layers listed in the settings but missing
    /// from the registry are skipped with a warning.
    pub fn render(&self, settings: &MapSettings, overlays: &OverlayConfig) -> Result<Pixmap> {
        let size = settings.size();
        let mut canvas = Canvas::new(size.width(), size.height(), settings.background())?;

        let transform =
            PixelTransform::new(settings.extent(), size.cast_f64()).ok_or_else(|| {
                CroquisError::DegenerateGeometry(format!(
                    "cannot project onto a degenerate extent {:?}",
                    settings.extent()
                ))
            })?;

        for id in self.layer_order(settings)? {
            let layer = match self.registry.layer(&id) {
                Ok(layer) => layer,
                Err(CroquisError::NotFound(_)) => {
                    warn!("layer {id:?} is not registered; skipping");
                    continue;
                }
                Err(other) => return Err(other),
            };
            match layer.as_ref() {
                LayerSource::Vector(vector) => {
                    draw_vector_layer(&mut canvas, &transform, &vector.features, &vector.style)
                }
                LayerSource::Raster(raster) => {
                    draw_raster_layer(&mut canvas, &transform, &raster.image, raster.extent)
                }
            }
        }

        self.draw_grid(&mut canvas, settings, overlays)?;
        self.draw_markers(&mut canvas, settings.extent(), &transform, overlays);

        Ok(canvas.into_pixmap())
    }

    fn layer_order(&self, settings: &MapSettings) -> Result<Vec<String>> {
        if settings.layer_ids().is_empty() {
            Ok(self
                .registry
                .list_visible_layers()?
                .into_iter()
                .map(|layer| layer.id)
                .collect())
        } else {
            Ok(settings.layer_ids().to_vec())
        }
    }

    fn draw_grid(
        &self,
        canvas: &mut Canvas,
        settings: &MapSettings,
        overlays: &OverlayConfig,
    ) -> Result<()> {
        let config = &overlays.grid;
        if !config.enabled {
            return Ok(());
        }
        let geometry = compute_grid(settings.extent(), config, settings.size().cast_f64())?;
        let height = canvas.height() as f32;
        let width = canvas.width() as f32;

        match config.style {
            GridStyle::Lines => {
                for line in &geometry.vertical {
                    let x = line.pixel as f32;
                    canvas.draw_line((x, 0.0), (x, height), config.line_width, config.color);
                }
                for line in &geometry.horizontal {
                    let y = line.pixel as f32;
                    canvas.draw_line((0.0, y), (width, y), config.line_width, config.color);
                }
            }
            GridStyle::Dots => {
                for (x, y) in geometry.intersections() {
                    canvas.fill_circle(
                        x as f32,
                        y as f32,
                        config.line_width.max(1.0),
                        config.color,
                    );
                }
            }
            GridStyle::Crosses => {
                for (x, y) in geometry.intersections() {
                    canvas.draw_cross(
                        x as f32,
                        y as f32,
                        config.cross_arm,
                        config.line_width,
                        config.color,
                    );
                }
            }
        }

        if config.labels_enabled {
            let font_size = config.label_font_size;
            if config.show_vertical_labels {
                for line in &geometry.vertical {
                    if let Some(label) = &line.label {
                        // Rotated 90 degrees to run along the line.
                        canvas.draw_text(
                            self.context.text(),
                            label,
                            line.pixel as f32 + font_size * 0.4,
                            font_size * 0.5,
                            font_size,
                            config.color,
                            90.0,
                        );
                    }
                }
            }
            if config.show_horizontal_labels {
                for line in &geometry.horizontal {
                    if let Some(label) = &line.label {
                        canvas.draw_text(
                            self.context.text(),
                            label,
                            2.0,
                            line.pixel as f32 - 2.0,
                            font_size,
                            config.color,
                            0.0,
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn draw_markers(
        &self,
        canvas: &mut Canvas,
        extent: Extent,
        transform: &PixelTransform,
        overlays: &OverlayConfig,
    ) {
        for marker in &overlays.markers {
            if !marker.is_within(&extent) {
                warn!(
                    "marker at ({}, {}) is outside the map extent; skipping",
                    marker.position.x, marker.position.y
                );
                continue;
            }
            let (x, y) = pixel(transform, &marker.position);
            match marker.style {
                MarkerStyle::Circle => canvas.fill_circle(x, y, marker.size / 2.0, marker.color),
                MarkerStyle::Square => canvas.fill_square(x, y, marker.size, marker.color),
                MarkerStyle::Triangle => canvas.fill_triangle(x, y, marker.size, marker.color),
            }
            if overlays.marker_labels.enabled {
                if let Some(label) = &marker.label {
                    let labels = &overlays.marker_labels;
                    canvas.draw_text(
                        self.context.text(),
                        label,
                        x + labels.offset_x,
                        y + labels.offset_y,
                        labels.font_size,
                        labels.color,
                        0.0,
                    );
                }
            }
        }
    }
}

fn draw_vector_layer(
    canvas: &mut Canvas,
    transform: &PixelTransform,
    features: &[Feature],
    style: &VectorStyle,
) {
    for feature in features {
        match feature.geometry() {
            Geometry::Point(point) => {
                let (x, y) = pixel(transform, point);
                canvas.fill_circle(x, y, style.point_size / 2.0, style.stroke);
            }
            Geometry::Line(points) => {
                let projected = project(transform, points);
                canvas.stroke_polyline(&projected, style.stroke_width, style.stroke);
            }
            Geometry::Polygon(rings) => {
                let projected: Vec<_> =
                    rings.iter().map(|ring| project(transform, ring)).collect();
                canvas.fill_polygon(&projected, style.fill, style.stroke, style.stroke_width);
            }
        }
    }
}

fn draw_raster_layer(
    canvas: &mut Canvas,
    transform: &PixelTransform,
    image: &RgbaImage,
    extent: Extent,
) {
    if extent.is_degenerate() || image.width() == 0 || image.height() == 0 {
        warn!("raster layer has no drawable area; skipping");
        return;
    }
    let left = transform.x_to_pixel(extent.x_min) as f32;
    let right = transform.x_to_pixel(extent.x_max) as f32;
    let top = transform.y_to_pixel(extent.y_max) as f32;
    let bottom = transform.y_to_pixel(extent.y_min) as f32;

    let sx = (right - left) / image.width() as f32;
    let sy = (bottom - top) / image.height() as f32;
    canvas.draw_image(image, Transform::from_row(sx, 0.0, 0.0, sy, left, top));
}

fn pixel(transform: &PixelTransform, point: &Point2d) -> (f32, f32) {
    let projected = transform.to_pixel(point);
    (projected.x as f32, projected.y as f32)
}

fn project(transform: &PixelTransform, points: &[Point2d]) -> Vec<(f32, f32)> {
    points.iter().map(|p| pixel(transform, p)).collect()
}

/// Encodes a rendered pixmap into the requested format.
///
/// JPEG has no alpha channel, so JPEG output is always flattened onto an
/// opaque white background first.
pub fn encode(pixmap: &Pixmap, format: ImageFormat) -> Result<RenderedImage> {
    let image = canvas::pixmap_to_rgba_image(pixmap);
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Png => {
            image::DynamicImage::ImageRgba8(image)
                .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let flattened = flatten_onto_white(&image);
            image::DynamicImage::ImageRgb8(flattened).write_to(
                &mut Cursor::new(&mut bytes),
                image::ImageOutputFormat::Jpeg(90),
            )?;
        }
    }
    Ok(RenderedImage {
        bytes,
        content_type: format.content_type(),
    })
}

/// Alpha-blends an RGBA image over opaque white.
pub fn flatten_onto_white(image: &RgbaImage) -> image::RgbImage {
    let mut out = image::RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let alpha = a as u32;
        let blend = |channel: u8| ((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        dst.0 = [blend(r), blend(g), blend(b)];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{MemoryRegistry, VectorLayer};
    use crate::map::MapSettingsBuilder;
    use crate::Color;
    use croquis_types::Crs;

    fn context() -> RenderContext {
        RenderContext::new()
    }

    #[test]
    fn renders_transparent_background_without_layers() {
        let registry = MemoryRegistry::new();
        let settings = MapSettingsBuilder::new()
            .size(800, 600)
            .extent_str("0,0,10,10")
            .background(Color::TRANSPARENT)
            .build(&registry)
            .expect("valid settings");

        let context = context();
        let pixmap = MapRenderer::new(&registry, &context)
            .render(&settings, &OverlayConfig::default())
            .expect("render succeeds");
        assert_eq!(pixmap.width(), 800);
        assert_eq!(pixmap.height(), 600);
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn draws_a_polygon_feature() {
        let registry = MemoryRegistry::new();
        let square = Geometry::Polygon(vec![vec![
            Point2d::new(10.0, 10.0),
            Point2d::new(70.0, 10.0),
            Point2d::new(70.0, 50.0),
            Point2d::new(10.0, 50.0),
            Point2d::new(10.0, 10.0),
        ]]);
        registry.add_layer(LayerSource::Vector(
            VectorLayer::new("parcel", "Parcel", Crs::default())
                .with_features(vec![Feature::new(square)]),
        ));

        let settings = MapSettingsBuilder::new()
            .size(80, 60)
            .extent_str("0,0,80,60")
            .background(Color::TRANSPARENT)
            .build(&registry)
            .expect("valid settings");
        let context = context();
        let pixmap = MapRenderer::new(&registry, &context)
            .render(&settings, &OverlayConfig::default())
            .expect("render succeeds");

        // Center of the square is filled, corner of the map is untouched.
        let center = pixmap.pixel(40, 30).expect("in bounds");
        assert!(center.alpha() > 0);
        let corner = pixmap.pixel(1, 1).expect("in bounds");
        assert_eq!(corner.alpha(), 0);
    }

    #[test]
    fn missing_layer_id_is_skipped() {
        let registry = MemoryRegistry::new();
        let settings = MapSettingsBuilder::new()
            .size(40, 40)
            .extent_str("0,0,1,1")
            .layers(vec!["absent".into()])
            .build(&registry)
            .expect("valid settings");

        let context = context();
        let renderer = MapRenderer::new(&registry, &context);
        assert!(renderer.render(&settings, &OverlayConfig::default()).is_ok());
    }

    #[test]
    fn marker_outside_extent_is_not_drawn() {
        let registry = MemoryRegistry::new();
        let overlays = OverlayConfig {
            markers: vec![PointMarker::new(Point2d::new(500.0, 500.0))],
            ..Default::default()
        };
        let settings = MapSettingsBuilder::new()
            .size(40, 40)
            .extent_str("0,0,10,10")
            .background(Color::TRANSPARENT)
            .build(&registry)
            .expect("valid settings");
        let pixmap = MapRenderer::new(&registry, &context())
            .render(&settings, &overlays)
            .expect("render succeeds");
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn grid_lines_are_drawn() {
        let registry = MemoryRegistry::new();
        let overlays = OverlayConfig {
            grid: GridConfig {
                enabled: true,
                spacing: 5.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let settings = MapSettingsBuilder::new()
            .size(100, 100)
            .extent_str("0,0,10,10")
            .background(Color::TRANSPARENT)
            .build(&registry)
            .expect("valid settings");
        let pixmap = MapRenderer::new(&registry, &context())
            .render(&settings, &overlays)
            .expect("render succeeds");
        // The vertical line at x=5 runs down pixel column 50.
        assert!(pixmap.pixel(50, 25).expect("in bounds").alpha() > 0);
    }

    #[test]
    fn jpeg_encode_flattens_alpha() {
        let registry = MemoryRegistry::new();
        let settings = MapSettingsBuilder::new()
            .size(16, 16)
            .extent_str("0,0,1,1")
            .background(Color::TRANSPARENT)
            .build(&registry)
            .expect("valid settings");
        let pixmap = MapRenderer::new(&registry, &context())
            .render(&settings, &OverlayConfig::default())
            .expect("render succeeds");

        let jpeg = encode(&pixmap, ImageFormat::Jpeg).expect("encode succeeds");
        assert_eq!(jpeg.content_type, "image/jpeg");
        let decoded = image::load_from_memory(&jpeg.bytes).expect("valid jpeg");
        // Transparent pixels became white.
        assert!(decoded.to_rgb8().get_pixel(0, 0).0.iter().all(|&c| c > 240));
    }

    #[test]
    fn png_encode_preserves_alpha() {
        let registry = MemoryRegistry::new();
        let settings = MapSettingsBuilder::new()
            .size(16, 16)
            .extent_str("0,0,1,1")
            .background(Color::TRANSPARENT)
            .build(&registry)
            .expect("valid settings");
        let pixmap = MapRenderer::new(&registry, &context())
            .render(&settings, &OverlayConfig::default())
            .expect("render succeeds");

        let png = encode(&pixmap, ImageFormat::Png).expect("encode succeeds");
        let decoded = image::load_from_memory(&png.bytes).expect("valid png");
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 0);
    }
}
