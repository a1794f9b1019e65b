//! CPU drawing surface shared by the map renderer and the page rasterizer.

use image::RgbaImage;
use log::warn;
use tiny_skia::{
    FillRule, IntSize, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::error::{CroquisError, Result};
use crate::render::text::TextEngine;
use crate::Color;

/// A pixel canvas wrapping a tiny-skia pixmap.
///
/// All coordinates are pixels with the origin at the top-left corner. The
/// canvas itself knows nothing about map units; callers project through
/// `PixelTransform` before drawing.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// Creates a canvas filled with the given background. A transparent
    /// background produces an alpha-zero fill.
    pub fn new(width: u32, height: u32, background: Color) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            CroquisError::config(
                "width/height",
                format!("cannot allocate a {width}x{height} canvas"),
            )
        })?;
        pixmap.fill(to_skia_color(background));
        Ok(Self { pixmap })
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Consumes the canvas, returning the pixmap.
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Strokes a straight line between two pixel points.
    pub fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        if let Some(path) = pb.finish() {
            self.stroke(&path, width, color);
        }
    }

    /// Strokes an open polyline.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color) {
        if points.len() < 2 {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].0, points[0].1);
        for p in &points[1..] {
            pb.line_to(p.0, p.1);
        }
        if let Some(path) = pb.finish() {
            self.stroke(&path, width, color);
        }
    }

    /// Fills and outlines a polygon. The first ring is the outer boundary,
    /// the rest are holes.
    pub fn fill_polygon(
        &mut self,
        rings: &[Vec<(f32, f32)>],
        fill: Color,
        stroke: Color,
        stroke_width: f32,
    ) {
        let mut pb = PathBuilder::new();
        for ring in rings {
            if ring.len() < 3 {
                continue;
            }
            pb.move_to(ring[0].0, ring[0].1);
            for p in &ring[1..] {
                pb.line_to(p.0, p.1);
            }
            pb.close();
        }
        let Some(path) = pb.finish() else {
            return;
        };

        if !fill.is_transparent() {
            self.pixmap.fill_path(
                &path,
                &paint(fill),
                FillRule::EvenOdd,
                Transform::identity(),
                None,
            );
        }
        if !stroke.is_transparent() && stroke_width > 0.0 {
            self.stroke(&path, stroke_width, stroke);
        }
    }

    /// Fills an axis-aligned rectangle.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if let Some(rect) = tiny_skia::Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &paint(color), Transform::identity(), None);
        }
    }

    /// Strokes an axis-aligned rectangle outline.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Color) {
        let corners = [
            (x, y),
            (x + w, y),
            (x + w, y + h),
            (x, y + h),
            (x, y),
        ];
        self.stroke_polyline(&corners, width, color);
    }

    /// Fills a circle centered at the given pixel.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.pixmap.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    /// Fills a square centered at the given pixel.
    pub fn fill_square(&mut self, cx: f32, cy: f32, size: f32, color: Color) {
        let half = size / 2.0;
        self.fill_rect(cx - half, cy - half, size, size, color);
    }

    /// Fills an upward-pointing triangle centered at the given pixel.
    pub fn fill_triangle(&mut self, cx: f32, cy: f32, size: f32, color: Color) {
        let half = size / 2.0;
        self.fill_polygon(
            &[vec![
                (cx, cy - half),
                (cx + half, cy + half),
                (cx - half, cy + half),
            ]],
            color,
            Color::TRANSPARENT,
            0.0,
        );
    }

    /// Draws a `+` glyph centered at the given pixel.
    pub fn draw_cross(&mut self, cx: f32, cy: f32, arm: f32, width: f32, color: Color) {
        self.draw_line((cx - arm, cy), (cx + arm, cy), width, color);
        self.draw_line((cx, cy - arm), (cx, cy + arm), width, color);
    }

    /// Blits an RGBA image through an arbitrary transform.
    pub fn draw_image(&mut self, image: &RgbaImage, transform: Transform) {
        let Some(source) = rgba_image_to_pixmap(image) else {
            warn!("skipping draw of an empty image");
            return;
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &PixmapPaint::default(),
            transform,
            None,
        );
    }

    /// Draws text with its baseline starting at `(x, y)`, rotated by
    /// `rotation_deg` around the anchor. Without a text engine the call is a
    /// no-op with a logged warning, never a failure.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text(
        &mut self,
        engine: Option<&TextEngine>,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
        rotation_deg: f32,
    ) {
        let Some(engine) = engine else {
            warn!("no font loaded in the render context; skipping label {text:?}");
            return;
        };
        let Some(path) = engine.outline(text, font_size) else {
            return;
        };

        let mut transform = Transform::from_translate(x, y);
        if rotation_deg != 0.0 {
            transform = transform.post_concat(Transform::from_rotate_at(rotation_deg, x, y));
        }
        self.pixmap
            .fill_path(&path, &paint(color), FillRule::Winding, transform, None);
    }

    fn stroke(&mut self, path: &Path, width: f32, color: Color) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, &paint(color), &stroke, Transform::identity(), None);
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r(), color.g(), color.b(), color.a());
    paint.anti_alias = true;
    paint
}

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r(), color.g(), color.b(), color.a())
}

/// Converts an RGBA image into a premultiplied pixmap.
pub fn rgba_image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let premultiplied = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[
            premultiplied.red(),
            premultiplied.green(),
            premultiplied.blue(),
            premultiplied.alpha(),
        ]);
    }
    Pixmap::from_vec(data, size)
}

/// Converts a premultiplied pixmap back into a straight-alpha RGBA image.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (pixel, out) in pixmap.pixels().iter().zip(image.pixels_mut()) {
        let demultiplied = pixel.demultiply();
        out.0 = [
            demultiplied.red(),
            demultiplied.green(),
            demultiplied.blue(),
            demultiplied.alpha(),
        ];
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_canvas_fills_background() {
        let canvas = Canvas::new(4, 4, Color::TRANSPARENT).expect("valid size");
        let image = pixmap_to_rgba_image(&canvas.into_pixmap());
        assert!(image.pixels().all(|p| p.0[3] == 0));

        let canvas = Canvas::new(4, 4, Color::WHITE).expect("valid size");
        let image = pixmap_to_rgba_image(&canvas.into_pixmap());
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn zero_size_canvas_is_rejected() {
        assert!(Canvas::new(0, 10, Color::WHITE).is_err());
    }

    #[test]
    fn rect_fill_touches_only_the_rect() {
        let mut canvas = Canvas::new(10, 10, Color::TRANSPARENT).expect("valid size");
        canvas.fill_rect(2.0, 2.0, 4.0, 4.0, Color::RED);
        let image = pixmap_to_rgba_image(&canvas.into_pixmap());
        assert_eq!(image.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(9, 9).0[3], 0);
    }

    #[test]
    fn image_round_trips_through_pixmap() {
        let mut source = RgbaImage::new(2, 2);
        source.get_pixel_mut(0, 0).0 = [255, 0, 0, 255];
        source.get_pixel_mut(1, 1).0 = [0, 0, 255, 255];

        let pixmap = rgba_image_to_pixmap(&source).expect("non-empty image");
        let restored = pixmap_to_rgba_image(&pixmap);
        assert_eq!(source, restored);
    }
}
