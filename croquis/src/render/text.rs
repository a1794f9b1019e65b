//! Text shaping and glyph outlining for raster output.
//!
//! Glyphs are shaped with `rustybuzz` and outlined through `ttf-parser` into
//! a tiny-skia path that the canvas fills like any other shape. The engine
//! holds the raw font bytes; faces are cheap to re-create per call and keep
//! the renderer free of self-referential lifetimes.

use rustybuzz::ttf_parser::{GlyphId, OutlineBuilder};
use rustybuzz::{Face, UnicodeBuffer};
use tiny_skia::{Path, PathBuilder};

use crate::error::{CroquisError, Result};

/// Shapes and outlines text using a single loaded font face.
pub struct TextEngine {
    data: Vec<u8>,
}

impl TextEngine {
    /// Creates an engine from raw font bytes (TTF/OTF). Fails if the bytes
    /// do not parse as a font face.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if Face::from_slice(&data, 0).is_none() {
            return Err(CroquisError::config(
                "font",
                "data is not a parseable TTF/OTF face",
            ));
        }
        Ok(Self { data })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::from_slice(&self.data, 0)
    }

    /// Advance width of the shaped text in pixels.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let scale = font_size / face.units_per_em() as f32;
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        let shaped = rustybuzz::shape(&face, &[], buffer);
        shaped
            .glyph_positions()
            .iter()
            .map(|pos| pos.x_advance as f32 * scale)
            .sum()
    }

    /// Outlines the shaped text as one path.
    ///
    /// The path origin is the left end of the baseline; Y grows downward to
    /// match pixel space, so glyphs extend into negative Y. Returns `None`
    /// for text with no drawable outline (e.g. only spaces).
    pub fn outline(&self, text: &str, font_size: f32) -> Option<Path> {
        let face = self.face()?;
        let scale = font_size / face.units_per_em() as f32;

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        let shaped = rustybuzz::shape(&face, &[], buffer);

        let mut outliner = GlyphOutliner {
            builder: PathBuilder::new(),
            scale,
            dx: 0.0,
            dy: 0.0,
        };

        let mut pen_x = 0.0f32;
        for (info, pos) in shaped
            .glyph_infos()
            .iter()
            .zip(shaped.glyph_positions().iter())
        {
            outliner.dx = pen_x + pos.x_offset as f32 * scale;
            outliner.dy = -(pos.y_offset as f32) * scale;
            let _ = face.outline_glyph(GlyphId(info.glyph_id as u16), &mut outliner);
            pen_x += pos.x_advance as f32 * scale;
        }

        outliner.builder.finish()
    }
}

impl std::fmt::Debug for TextEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEngine")
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Bridges ttf-parser outlines into a tiny-skia path, flipping the Y axis
/// from font space (up) to pixel space (down).
struct GlyphOutliner {
    builder: PathBuilder,
    scale: f32,
    dx: f32,
    dy: f32,
}

impl GlyphOutliner {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.dx + x * self.scale, self.dy - y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutliner {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
