//! Vector PDF backend.
//!
//! Shapes, text and table grids are emitted as PDF vector content; map
//! frames and pictures are embedded as RGB image XObjects. PDF has no
//! straight-alpha RGB images, so embedded rasters are flattened onto white.

use std::io::BufWriter;

use image::RgbaImage;
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef,
    Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon, PolygonMode as PaintMode, Px, WindingOrder,
};

use crate::error::{CroquisError, Result};
use crate::layout::{ComposedPage, ElementRect, LabelAlignment, PlacedContent};
use crate::render::flatten_onto_white;
use crate::Color;

/// One PDF point in millimeters.
const PT_TO_MM: f64 = 0.352_778;

/// Rough average glyph width for Helvetica, in em.
const AVG_GLYPH_WIDTH_EM: f64 = 0.5;

/// Legend and table row height, mm.
const ROW_HEIGHT_MM: f64 = 7.0;

/// Legend swatch side, mm.
const SWATCH_MM: f64 = 5.0;

/// Layout math runs in f64 millimeters; the PDF layer takes f32 units.
fn mm(value: f64) -> Mm {
    Mm(value as f32)
}

/// Renders a composed page into PDF bytes.
pub fn render_pdf(page: &ComposedPage) -> Result<Vec<u8>> {
    let title = if page.title.is_empty() {
        "Croquis"
    } else {
        &page.title
    };
    let doc = PdfDocument::empty(title);
    let (page_index, layer_index) = doc.add_page(mm(page.width_mm), mm(page.height_mm), "Layer 1");
    let layer = doc.get_page(page_index).get_layer(layer_index);

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).ok(),
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).ok(),
    };
    let painter = Painter {
        layer,
        fonts,
        page_height_mm: page.height_mm,
    };

    for element in &page.elements {
        match &element.content {
            PlacedContent::Map { image, .. } => painter.draw_image(element.rect, image),
            PlacedContent::Image(image) | PlacedContent::NorthArrow(image) => {
                painter.draw_image(element.rect, image)
            }
            PlacedContent::Legend { title, entries } => {
                let mut y = element.rect.y;
                if let Some(title) = title {
                    painter.draw_text(title, element.rect.x, y, 11.0, true, Color::BLACK);
                    y += ROW_HEIGHT_MM;
                }
                for entry in entries {
                    if y + ROW_HEIGHT_MM > element.rect.y + element.rect.height {
                        break;
                    }
                    painter.draw_rect(
                        ElementRect::new(element.rect.x, y + 1.0, SWATCH_MM, SWATCH_MM),
                        Some(entry.fill),
                        Some(entry.stroke),
                    );
                    painter.draw_text(
                        &entry.label,
                        element.rect.x + SWATCH_MM + 2.0,
                        y,
                        10.0,
                        false,
                        Color::BLACK,
                    );
                    y += ROW_HEIGHT_MM;
                }
            }
            PlacedContent::ScaleBar { length_mm, label } => {
                painter.draw_text(label, element.rect.x, element.rect.y, 9.0, false, Color::BLACK);
                let bar_y = element.rect.y + 9.0 * PT_TO_MM + 1.5;
                painter.draw_rect(
                    ElementRect::new(element.rect.x, bar_y, *length_mm, 2.0),
                    Some(Color::BLACK),
                    Some(Color::BLACK),
                );
                // Half-length divider drawn in white over the bar.
                painter.draw_rect(
                    ElementRect::new(element.rect.x, bar_y + 0.5, length_mm / 2.0, 1.0),
                    Some(Color::WHITE),
                    None,
                );
            }
            PlacedContent::Label {
                text,
                font_size,
                bold,
                alignment,
            } => {
                let estimated_mm =
                    text.chars().count() as f64 * font_size * PT_TO_MM * AVG_GLYPH_WIDTH_EM;
                let x = match alignment {
                    LabelAlignment::Left => element.rect.x,
                    LabelAlignment::Center => {
                        element.rect.x + ((element.rect.width - estimated_mm) / 2.0).max(0.0)
                    }
                    LabelAlignment::Right => {
                        element.rect.x + (element.rect.width - estimated_mm).max(0.0)
                    }
                };
                painter.draw_text(text, x, element.rect.y, *font_size, *bold, Color::BLACK);
            }
            PlacedContent::Table { columns, rows } => {
                painter.draw_table(element.rect, columns, rows)
            }
        }
    }

    let mut bytes = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))
        .map_err(|err| CroquisError::Export(err.to_string()))?;
    Ok(bytes)
}

struct Fonts {
    regular: Option<IndirectFontRef>,
    bold: Option<IndirectFontRef>,
}

struct Painter {
    layer: PdfLayerReference,
    fonts: Fonts,
    page_height_mm: f64,
}

impl Painter {
    /// Converts a top-left based y coordinate to the PDF bottom-left origin.
    fn pdf_y(&self, y_top_mm: f64, height_mm: f64) -> f64 {
        self.page_height_mm - y_top_mm - height_mm
    }

    fn draw_image(&self, rect: ElementRect, image: &RgbaImage) {
        if image.width() == 0 || image.height() == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let flattened = flatten_onto_white(image);
        let xobject = ImageXObject {
            width: Px(flattened.width() as usize),
            height: Px(flattened.height() as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: flattened.into_raw(),
            image_filter: None,
            clipping_bbox: None,
        };

        // Pick the DPI that makes the image's natural width equal the rect
        // width, then correct the height with a scale factor.
        let dpi = image.width() as f64 * 25.4 / rect.width;
        let natural_height_mm = image.height() as f64 * 25.4 / dpi;
        Image::from(xobject).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(mm(rect.x)),
                translate_y: Some(mm(self.pdf_y(rect.y, rect.height))),
                scale_y: Some((rect.height / natural_height_mm) as f32),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
    }

    fn draw_rect(&self, rect: ElementRect, fill: Option<Color>, stroke: Option<Color>) {
        let y = self.pdf_y(rect.y, rect.height);
        let points = vec![
            (Point::new(mm(rect.x), mm(y)), false),
            (Point::new(mm(rect.x + rect.width), mm(y)), false),
            (
                Point::new(mm(rect.x + rect.width), mm(y + rect.height)),
                false,
            ),
            (Point::new(mm(rect.x), mm(y + rect.height)), false),
        ];
        if let Some(fill) = fill {
            self.layer.set_fill_color(pdf_color(fill));
        }
        if let Some(stroke) = stroke {
            self.layer.set_outline_color(pdf_color(stroke));
        }
        match (fill.is_some(), stroke.is_some()) {
            (true, _) => self.layer.add_polygon(Polygon {
                rings: vec![points],
                mode: if stroke.is_some() {
                    PaintMode::FillStroke
                } else {
                    PaintMode::Fill
                },
                winding_order: WindingOrder::NonZero,
            }),
            (false, true) => self.layer.add_line(Line {
                points,
                is_closed: true,
            }),
            (false, false) => {}
        }
    }

    fn draw_text(&self, text: &str, x_mm: f64, y_top_mm: f64, size_pt: f64, bold: bool, color: Color) {
        let font = if bold {
            self.fonts.bold.as_ref().or(self.fonts.regular.as_ref())
        } else {
            self.fonts.regular.as_ref()
        };
        let Some(font) = font else {
            return;
        };
        // Baseline sits one glyph height below the rect top.
        let baseline_y = self.pdf_y(y_top_mm, size_pt * PT_TO_MM);
        self.layer.begin_text_section();
        self.layer.set_fill_color(pdf_color(color));
        self.layer.set_font(font, size_pt as f32);
        self.layer.set_text_cursor(mm(x_mm), mm(baseline_y));
        self.layer.write_text(text, font);
        self.layer.end_text_section();
    }

    fn draw_table(&self, rect: ElementRect, columns: &[String], rows: &[Vec<String>]) {
        if columns.is_empty() {
            return;
        }
        let column_width = rect.width / columns.len() as f64;
        let max_rows = ((rect.height / ROW_HEIGHT_MM) as usize).saturating_sub(1);
        let shown = rows.len().min(max_rows);

        self.draw_table_row(rect, 0, column_width, columns);
        for (index, row) in rows.iter().take(shown).enumerate() {
            self.draw_table_row(rect, index + 1, column_width, row);
        }
    }

    fn draw_table_row(&self, rect: ElementRect, row_index: usize, column_width: f64, row: &[String]) {
        let y = rect.y + row_index as f64 * ROW_HEIGHT_MM;
        for (col_index, cell) in row.iter().enumerate() {
            let x = rect.x + col_index as f64 * column_width;
            self.draw_rect(
                ElementRect::new(x, y, column_width, ROW_HEIGHT_MM),
                None,
                Some(Color::BLACK),
            );
            self.draw_text(cell, x + 1.5, y + 1.0, 9.0, row_index == 0, Color::BLACK);
        }
    }
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(printpdf::Rgb::new(
        color.r() as f32 / 255.0,
        color.g() as f32 / 255.0,
        color.b() as f32 / 255.0,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PlacedElement, SkippedElement};

    fn page_with(elements: Vec<PlacedElement>) -> ComposedPage {
        ComposedPage {
            title: "Croquis de repérage".into(),
            width_mm: 210.0,
            height_mm: 297.0,
            elements,
            skipped: Vec::<SkippedElement>::new(),
        }
    }

    #[test]
    fn empty_page_is_still_a_pdf() {
        let bytes = render_pdf(&page_with(Vec::new())).expect("renders");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn page_with_label_and_image_renders() {
        let elements = vec![
            PlacedElement {
                id: "hdr".into(),
                rect: ElementRect::new(10.0, 5.0, 190.0, 10.0),
                content: PlacedContent::Label {
                    text: "République du Cameroun".into(),
                    font_size: 12.0,
                    bold: true,
                    alignment: LabelAlignment::Center,
                },
            },
            PlacedElement {
                id: "pic".into(),
                rect: ElementRect::new(10.0, 20.0, 50.0, 50.0),
                content: PlacedContent::Image(RgbaImage::from_pixel(
                    8,
                    8,
                    image::Rgba([200, 10, 10, 255]),
                )),
            },
        ];
        let bytes = render_pdf(&page_with(elements)).expect("renders");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn table_renders_header_and_rows() {
        let elements = vec![PlacedElement {
            id: "t1".into(),
            rect: ElementRect::new(10.0, 100.0, 100.0, 60.0),
            content: PlacedContent::Table {
                columns: vec!["Bornes".into(), "Distance".into()],
                rows: vec![
                    vec!["B1".into(), "42.50".into()],
                    vec!["B2".into(), "36.00".into()],
                ],
            },
        }];
        assert!(render_pdf(&page_with(elements)).is_ok());
    }
}
