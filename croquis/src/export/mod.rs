//! Document export backends.
//!
//! A [`ComposedPage`](crate::layout::ComposedPage) can be written as a
//! vector PDF or rasterized to PNG/JPEG. Output files are written to a
//! temporary sibling first and renamed into place, so a failed export never
//! leaves a partial file readable at the target path.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::error::{CroquisError, Result};
use crate::layout::ComposedPage;
use crate::render::ImageFormat;

pub mod pdf;
pub mod raster;

/// Default DPI for raster page exports.
pub const DEFAULT_RASTER_DPI: f64 = 150.0;

/// Supported document output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Vector PDF.
    Pdf,
    /// Raster PNG.
    Png,
    /// Raster JPEG.
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
}

impl ExportFormat {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// A successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    /// Where the document was written.
    pub path: PathBuf,
    /// The format it was written in.
    pub format: ExportFormat,
}

/// Writes composed pages to disk in the requested format.
pub struct DocumentExporter<'a> {
    context: &'a RenderContext,
    raster_dpi: f64,
}

impl<'a> DocumentExporter<'a> {
    /// Creates an exporter with the default raster DPI.
    pub fn new(context: &'a RenderContext) -> Self {
        Self {
            context,
            raster_dpi: DEFAULT_RASTER_DPI,
        }
    }

    /// Overrides the DPI used for PNG/JPEG exports. PDF output is vector
    /// where possible and ignores this setting.
    pub fn with_raster_dpi(mut self, dpi: f64) -> Self {
        self.raster_dpi = dpi;
        self
    }

    /// Exports the page to `path`.
    pub fn export(
        &self,
        page: &ComposedPage,
        format: ExportFormat,
        path: &Path,
    ) -> Result<ExportResult> {
        let bytes = match format {
            ExportFormat::Pdf => pdf::render_pdf(page)?,
            ExportFormat::Png => {
                raster::render_page(page, self.context, self.raster_dpi, ImageFormat::Png)?.bytes
            }
            ExportFormat::Jpeg => {
                raster::render_page(page, self.context, self.raster_dpi, ImageFormat::Jpeg)?.bytes
            }
        };
        write_atomically(path, &bytes)?;
        Ok(ExportResult {
            path: path.to_path_buf(),
            format,
        })
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path)
        .map_err(|err| CroquisError::FsIo(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_both_jpeg_spellings() {
        let jpg: ExportFormat = serde_json::from_str("\"jpg\"").expect("parses");
        let jpeg: ExportFormat = serde_json::from_str("\"jpeg\"").expect("parses");
        assert_eq!(jpg, ExportFormat::Jpeg);
        assert_eq!(jpeg, ExportFormat::Jpeg);
        assert_eq!(jpg.extension(), "jpg");
    }

    #[test]
    fn atomic_write_replaces_the_target() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("out.bin");
        std::fs::write(&target, b"old").expect("seed file");

        write_atomically(&target, b"new contents").expect("write succeeds");
        assert_eq!(std::fs::read(&target).expect("readable"), b"new contents");
        // No stray temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 1);
    }
}
