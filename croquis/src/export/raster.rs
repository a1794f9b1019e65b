//! Raster page backend.
//!
//! Rasterizes a composed page onto a white canvas at a given DPI and encodes
//! it with the shared image pipeline, so JPEG pages get the same flattening
//! rule as direct map renders.

use tiny_skia::Transform;

use crate::context::RenderContext;
use crate::error::Result;
use crate::layout::{ComposedPage, ElementRect, LabelAlignment, PlacedContent};
use crate::render::{encode, Canvas, ImageFormat, RenderedImage};
use crate::Color;

/// Legend and table row height, mm.
const ROW_HEIGHT_MM: f64 = 7.0;

/// Legend swatch side, mm.
const SWATCH_MM: f64 = 5.0;

/// Rough average glyph width for estimating label extents, in em.
const AVG_GLYPH_WIDTH_EM: f64 = 0.5;

/// Rasterizes the page at `dpi` and encodes it in the given format.
pub fn render_page(
    page: &ComposedPage,
    context: &RenderContext,
    dpi: f64,
    format: ImageFormat,
) -> Result<RenderedImage> {
    let scale = dpi / 25.4;
    let px = |mm: f64| (mm * scale) as f32;
    let width = (page.width_mm * scale).round().max(1.0) as u32;
    let height = (page.height_mm * scale).round().max(1.0) as u32;
    let mut canvas = Canvas::new(width, height, Color::WHITE)?;

    for element in &page.elements {
        let rect = element.rect;
        match &element.content {
            PlacedContent::Map { image, .. } => blit(&mut canvas, image, rect, px),
            PlacedContent::Image(image) | PlacedContent::NorthArrow(image) => {
                blit(&mut canvas, image, rect, px)
            }
            PlacedContent::Legend { title, entries } => {
                let mut y = rect.y;
                if let Some(title) = title {
                    draw_text(&mut canvas, context, title, px(rect.x), px(y), pt_to_px(11.0, dpi));
                    y += ROW_HEIGHT_MM;
                }
                for entry in entries {
                    if y + ROW_HEIGHT_MM > rect.y + rect.height {
                        break;
                    }
                    canvas.fill_rect(
                        px(rect.x),
                        px(y + 1.0),
                        px(SWATCH_MM),
                        px(SWATCH_MM),
                        entry.fill,
                    );
                    canvas.stroke_rect(
                        px(rect.x),
                        px(y + 1.0),
                        px(SWATCH_MM),
                        px(SWATCH_MM),
                        1.0,
                        entry.stroke,
                    );
                    draw_text(
                        &mut canvas,
                        context,
                        &entry.label,
                        px(rect.x + SWATCH_MM + 2.0),
                        px(y),
                        pt_to_px(10.0, dpi),
                    );
                    y += ROW_HEIGHT_MM;
                }
            }
            PlacedContent::ScaleBar { length_mm, label } => {
                draw_text(&mut canvas, context, label, px(rect.x), px(rect.y), pt_to_px(9.0, dpi));
                let bar_y = rect.y + 9.0 * 0.352_778 + 1.5;
                canvas.fill_rect(px(rect.x), px(bar_y), px(*length_mm), px(2.0), Color::BLACK);
                canvas.fill_rect(
                    px(rect.x),
                    px(bar_y + 0.5),
                    px(length_mm / 2.0),
                    px(1.0),
                    Color::WHITE,
                );
            }
            PlacedContent::Label {
                text,
                font_size,
                bold,
                alignment,
            } => {
                let size_px = pt_to_px(*font_size, dpi);
                let text_width = match context.text() {
                    Some(engine) => engine.measure(text, size_px),
                    None => text.chars().count() as f32 * size_px * AVG_GLYPH_WIDTH_EM as f32,
                };
                let x = match alignment {
                    LabelAlignment::Left => px(rect.x),
                    LabelAlignment::Center => {
                        px(rect.x) + ((px(rect.width) - text_width) / 2.0).max(0.0)
                    }
                    LabelAlignment::Right => px(rect.x) + (px(rect.width) - text_width).max(0.0),
                };
                draw_text(&mut canvas, context, text, x, px(rect.y), size_px);
                // Builtin-style bold is approximated by restroking the text.
                if *bold {
                    draw_text(&mut canvas, context, text, x + 0.5, px(rect.y), size_px);
                }
            }
            PlacedContent::Table { columns, rows } => {
                if columns.is_empty() {
                    continue;
                }
                let column_width = rect.width / columns.len() as f64;
                let max_rows = ((rect.height / ROW_HEIGHT_MM) as usize).saturating_sub(1);
                for (row_index, row) in std::iter::once(columns.as_slice())
                    .chain(rows.iter().take(max_rows).map(Vec::as_slice))
                    .enumerate()
                {
                    let y = rect.y + row_index as f64 * ROW_HEIGHT_MM;
                    for (col_index, cell) in row.iter().enumerate() {
                        let x = rect.x + col_index as f64 * column_width;
                        canvas.stroke_rect(
                            px(x),
                            px(y),
                            px(column_width),
                            px(ROW_HEIGHT_MM),
                            1.0,
                            Color::BLACK,
                        );
                        draw_text(
                            &mut canvas,
                            context,
                            cell,
                            px(x + 1.5),
                            px(y + 1.0),
                            pt_to_px(9.0, dpi),
                        );
                    }
                }
            }
        }
    }

    encode(&canvas.into_pixmap(), format)
}

fn pt_to_px(pt: f64, dpi: f64) -> f32 {
    (pt / 72.0 * dpi) as f32
}

fn blit(canvas: &mut Canvas, image: &image::RgbaImage, rect: ElementRect, px: impl Fn(f64) -> f32) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let sx = px(rect.width) / image.width() as f32;
    let sy = px(rect.height) / image.height() as f32;
    canvas.draw_image(image, Transform::from_row(sx, 0.0, 0.0, sy, px(rect.x), px(rect.y)));
}

fn draw_text(
    canvas: &mut Canvas,
    context: &RenderContext,
    text: &str,
    x: f32,
    y_top: f32,
    size_px: f32,
) {
    // The canvas anchors text at the baseline.
    canvas.draw_text(context.text(), text, x, y_top + size_px, size_px, Color::BLACK, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PlacedElement;

    fn page_with(elements: Vec<PlacedElement>) -> ComposedPage {
        ComposedPage {
            title: String::new(),
            width_mm: 100.0,
            height_mm: 100.0,
            elements,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn page_rasterizes_at_requested_dpi() {
        let rendered = render_page(&page_with(Vec::new()), &RenderContext::new(), 127.0, ImageFormat::Png)
            .expect("renders");
        let decoded = image::load_from_memory(&rendered.bytes).expect("valid png");
        // 100 mm at 127 dpi is exactly 500 px.
        assert_eq!(decoded.width(), 500);
        assert_eq!(decoded.height(), 500);
    }

    #[test]
    fn picture_lands_inside_its_rect() {
        let picture = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let elements = vec![PlacedElement {
            id: "pic".into(),
            rect: ElementRect::new(10.0, 10.0, 20.0, 20.0),
            content: PlacedContent::Image(picture),
        }];
        let rendered = render_page(&page_with(elements), &RenderContext::new(), 25.4, ImageFormat::Png)
            .expect("renders");
        let decoded = image::load_from_memory(&rendered.bytes).expect("valid png").to_rgba8();
        // 25.4 dpi = 1 px per mm; the rect covers 10..30 on both axes.
        assert_eq!(decoded.get_pixel(20, 20).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(5, 5).0, [255, 255, 255, 255]);
    }
}
