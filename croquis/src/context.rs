//! Shared rendering assets loaded once at startup.

use std::path::Path;

use image::RgbaImage;
use log::info;

use crate::error::{CroquisError, Result};
use crate::render::text::TextEngine;

/// Immutable assets shared by every render and compose call.
///
/// The context is built once during application startup and then passed by
/// reference wherever rendering happens. Both assets are optional: without a
/// font labels are skipped, without a north arrow image the arrow elements
/// are skipped, and in both cases the skip is logged rather than failing the
/// whole request.
#[derive(Debug, Default)]
pub struct RenderContext {
    text: Option<TextEngine>,
    north_arrow: Option<RgbaImage>,
}

impl RenderContext {
    /// Creates an empty context with no font and no north arrow asset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the label font from a TTF/OTF file.
    pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        self.text = Some(TextEngine::from_bytes(data).map_err(|err| {
            CroquisError::config("font", format!("{}: {err}", path.display()))
        })?);
        info!("loaded label font from {}", path.display());
        Ok(self)
    }

    /// Loads the label font from in-memory TTF/OTF data.
    pub fn with_font_bytes(mut self, data: Vec<u8>) -> Result<Self> {
        self.text = Some(
            TextEngine::from_bytes(data)
                .map_err(|err| CroquisError::config("font", err.to_string()))?,
        );
        Ok(self)
    }

    /// Loads the north arrow image used by layout compositions.
    pub fn with_north_arrow_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        info!("loaded north arrow asset from {}", path.display());
        self.north_arrow = Some(image);
        Ok(self)
    }

    /// Sets the north arrow image directly.
    pub fn with_north_arrow(mut self, image: RgbaImage) -> Self {
        self.north_arrow = Some(image);
        self
    }

    /// The text shaping engine, if a font was loaded.
    pub fn text(&self) -> Option<&TextEngine> {
        self.text.as_ref()
    }

    /// The north arrow asset, if one was loaded.
    pub fn north_arrow(&self) -> Option<&RgbaImage> {
        self.north_arrow.as_ref()
    }
}
