//! Turns a page descriptor into placed elements.

use std::collections::HashMap;

use chrono::Local;
use log::warn;

use crate::context::RenderContext;
use crate::error::{CroquisError, Result};
use crate::layer::{LayerRegistry, LayerSource};
use crate::map::MapSettingsBuilder;
use crate::render::canvas::pixmap_to_rgba_image;
use crate::render::{MapRenderer, OverlayConfig};
use crate::Color;

use super::{
    ComposedPage, ElementRect, LegendElement, LegendEntry, MapElement, PageDescriptor,
    PlacedContent, PlacedElement, ScaleBarElement, SkipReason, SkippedElement, TableElement,
};

/// DPI used to rasterize map frames during composition.
const LAYOUT_MAP_DPI: f64 = 300.0;

/// Default north arrow side length, mm.
const NORTH_ARROW_SIZE_MM: f64 = 15.0;

/// Inset between a north arrow and its map frame edge, mm.
const NORTH_ARROW_INSET_MM: f64 = 3.0;

/// Fraction of a scale bar rect the bar itself may occupy.
const SCALE_BAR_FILL: f64 = 0.8;

fn mm_to_px(mm: f64, dpi: f64) -> u32 {
    (mm / 25.4 * dpi).round().max(1.0) as u32
}

/// Composes page descriptors against a layer registry.
///
/// Elements are processed category by category in a fixed order: maps,
/// legends, scale bars, labels, tables, images, north arrows. Elements that
/// reference maps (legends, scale bars, arrows) therefore always see the
/// full set of placed maps.
pub struct Composer<'a> {
    registry: &'a dyn LayerRegistry,
    context: &'a RenderContext,
}

impl<'a> Composer<'a> {
    /// Creates a composer over the given registry and shared assets.
    pub fn new(registry: &'a dyn LayerRegistry, context: &'a RenderContext) -> Self {
        Self { registry, context }
    }

    /// Composes the page. Per-element failures are collected in the returned
    /// page's skipped list; only an invalid page itself is an error.
    pub fn compose(&self, page: &PageDescriptor, session_id: &str) -> Result<ComposedPage> {
        let (width_mm, height_mm) = page.page_size.dims_mm(page.orientation);
        if !(width_mm > 0.0 && height_mm > 0.0) {
            return Err(CroquisError::config(
                "page_size",
                format!("{width_mm} x {height_mm} mm is not a drawable page"),
            ));
        }

        let mut composed = ComposedPage {
            title: page.title.clone(),
            width_mm,
            height_mm,
            elements: Vec::new(),
            skipped: Vec::new(),
        };
        let mut map_index: HashMap<String, usize> = HashMap::new();

        for map in &page.maps {
            match self.place_map(map) {
                Ok(placed) => {
                    map_index.insert(map.id.clone(), composed.elements.len());
                    composed.elements.push(placed);
                }
                Err(reason) => skip(&mut composed, &map.id, reason),
            }
        }
        for legend in &page.legends {
            match self.place_legend(legend, &composed, &map_index) {
                Ok(placed) => composed.elements.push(placed),
                Err(reason) => skip(&mut composed, &legend.id, reason),
            }
        }
        for bar in &page.scale_bars {
            match place_scale_bar(bar, &composed, &map_index) {
                Ok(placed) => composed.elements.push(placed),
                Err(reason) => skip(&mut composed, &bar.id, reason),
            }
        }
        for label in &page.labels {
            composed.elements.push(PlacedElement {
                id: label.id.clone(),
                rect: label.rect,
                content: PlacedContent::Label {
                    text: substitute_placeholders(&label.text, session_id),
                    font_size: label.font_size,
                    bold: label.bold,
                    alignment: label.alignment,
                },
            });
        }
        for table in &page.tables {
            match self.place_table(table) {
                Ok(placed) => composed.elements.push(placed),
                Err(reason) => skip(&mut composed, &table.id, reason),
            }
        }
        for picture in &page.images {
            match image::open(&picture.path) {
                Ok(decoded) => composed.elements.push(PlacedElement {
                    id: picture.id.clone(),
                    rect: picture.rect,
                    content: PlacedContent::Image(decoded.to_rgba8()),
                }),
                Err(err) => skip(
                    &mut composed,
                    &picture.id,
                    SkipReason::MissingAsset {
                        detail: format!("{}: {err}", picture.path.display()),
                    },
                ),
            }
        }
        for map in page.maps.iter().filter(|m| m.north_arrow) {
            if !map_index.contains_key(&map.id) {
                continue; // the map itself was skipped
            }
            let arrow_id = format!("{}_north_arrow", map.id);
            match self.context.north_arrow() {
                Some(asset) => composed.elements.push(PlacedElement {
                    id: arrow_id,
                    rect: north_arrow_rect(map.rect),
                    content: PlacedContent::NorthArrow(asset.clone()),
                }),
                None => skip(
                    &mut composed,
                    &arrow_id,
                    SkipReason::MissingAsset {
                        detail: "no north arrow image loaded".into(),
                    },
                ),
            }
        }

        Ok(composed)
    }

    fn place_map(&self, map: &MapElement) -> std::result::Result<PlacedElement, SkipReason> {
        let mut builder = MapSettingsBuilder::new()
            .size(
                mm_to_px(map.rect.width, LAYOUT_MAP_DPI),
                mm_to_px(map.rect.height, LAYOUT_MAP_DPI),
            )
            .dpi(LAYOUT_MAP_DPI)
            .background(Color::WHITE)
            .layers(map.layer_ids.clone());
        if let Some(extent) = &map.extent {
            builder = builder.extent_str(extent.clone());
        }
        if let Some(scale) = map.scale {
            builder = builder.scale(scale);
        }
        let settings = builder.build(self.registry).map_err(|err| {
            SkipReason::RenderFailed {
                detail: err.to_string(),
            }
        })?;

        let overlays = OverlayConfig {
            grid: map.grid.clone().unwrap_or_default(),
            ..Default::default()
        };
        let pixmap = MapRenderer::new(self.registry, self.context)
            .render(&settings, &overlays)
            .map_err(|err| SkipReason::RenderFailed {
                detail: err.to_string(),
            })?;

        Ok(PlacedElement {
            id: map.id.clone(),
            rect: map.rect,
            content: PlacedContent::Map {
                image: pixmap_to_rgba_image(&pixmap),
                settings,
            },
        })
    }

    fn place_legend(
        &self,
        legend: &LegendElement,
        composed: &ComposedPage,
        map_index: &HashMap<String, usize>,
    ) -> std::result::Result<PlacedElement, SkipReason> {
        let layer_ids: Vec<String> = match &legend.linked_map_id {
            Some(map_id) => {
                let index = map_index
                    .get(map_id)
                    .ok_or_else(|| SkipReason::UnresolvedMapLink {
                        map_id: map_id.clone(),
                    })?;
                let PlacedContent::Map { settings, .. } = &composed.elements[*index].content
                else {
                    return Err(SkipReason::UnresolvedMapLink {
                        map_id: map_id.clone(),
                    });
                };
                if settings.layer_ids().is_empty() {
                    self.visible_layer_ids()?
                } else {
                    settings.layer_ids().to_vec()
                }
            }
            None if legend.layer_ids.is_empty() => self.visible_layer_ids()?,
            None => legend.layer_ids.clone(),
        };

        let mut entries = Vec::new();
        for id in &layer_ids {
            let layer = match self.registry.layer(id) {
                Ok(layer) => layer,
                Err(err) => {
                    warn!("legend {:?}: {err}; dropping entry {id:?}", legend.id);
                    continue;
                }
            };
            entries.push(match layer.as_ref() {
                LayerSource::Vector(vector) => LegendEntry {
                    label: vector.name.clone(),
                    fill: vector.style.fill,
                    stroke: vector.style.stroke,
                    geometry: vector.geometry_type(),
                },
                LayerSource::Raster(raster) => LegendEntry {
                    label: raster.name.clone(),
                    fill: Color::GRAY,
                    stroke: Color::GRAY,
                    geometry: None,
                },
            });
        }

        Ok(PlacedElement {
            id: legend.id.clone(),
            rect: legend.rect,
            content: PlacedContent::Legend {
                title: legend.title.clone(),
                entries,
            },
        })
    }

    fn place_table(&self, table: &TableElement) -> std::result::Result<PlacedElement, SkipReason> {
        let layer = self
            .registry
            .layer(&table.layer_id)
            .map_err(|_| SkipReason::MissingLayer {
                layer_id: table.layer_id.clone(),
            })?;
        let LayerSource::Vector(vector) = layer.as_ref() else {
            return Err(SkipReason::MissingLayer {
                layer_id: table.layer_id.clone(),
            });
        };
        if vector.features.is_empty() {
            return Err(SkipReason::EmptyTable);
        }

        let columns: Vec<String> = if table.columns.is_empty() {
            vector.features[0]
                .attribute_names()
                .map(str::to_owned)
                .collect()
        } else {
            table.columns.clone()
        };

        let limit = if table.max_rows == 0 {
            vector.features.len()
        } else {
            table.max_rows
        };
        let rows: Vec<Vec<String>> = vector
            .features
            .iter()
            .take(limit)
            .map(|feature| columns.iter().map(|c| feature.attribute_text(c)).collect())
            .collect();

        Ok(PlacedElement {
            id: table.id.clone(),
            rect: table.rect,
            content: PlacedContent::Table { columns, rows },
        })
    }

    fn visible_layer_ids(&self) -> std::result::Result<Vec<String>, SkipReason> {
        self.registry
            .list_visible_layers()
            .map(|layers| layers.into_iter().map(|l| l.id).collect())
            .map_err(|err| SkipReason::RenderFailed {
                detail: err.to_string(),
            })
    }
}

fn skip(composed: &mut ComposedPage, id: &str, reason: SkipReason) {
    warn!("skipping layout element {id:?}: {reason}");
    composed.skipped.push(SkippedElement {
        id: id.to_owned(),
        reason,
    });
}

fn place_scale_bar(
    bar: &ScaleBarElement,
    composed: &ComposedPage,
    map_index: &HashMap<String, usize>,
) -> std::result::Result<PlacedElement, SkipReason> {
    let index = map_index
        .get(&bar.linked_map_id)
        .ok_or_else(|| SkipReason::UnresolvedMapLink {
            map_id: bar.linked_map_id.clone(),
        })?;
    let placed_map = &composed.elements[*index];
    let PlacedContent::Map { settings, .. } = &placed_map.content else {
        return Err(SkipReason::UnresolvedMapLink {
            map_id: bar.linked_map_id.clone(),
        });
    };

    let units_per_mm = settings.extent().width() / placed_map.rect.width;
    let target_units = bar.rect.width * SCALE_BAR_FILL * units_per_mm;
    let nice_units = round_down_1_2_5(target_units);
    if !(nice_units > 0.0) {
        return Err(SkipReason::RenderFailed {
            detail: "scale bar rect is too small for any round distance".into(),
        });
    }

    Ok(PlacedElement {
        id: bar.id.clone(),
        rect: bar.rect,
        content: PlacedContent::ScaleBar {
            length_mm: nice_units / units_per_mm,
            label: format_distance(nice_units),
        },
    })
}

/// Largest value of the form `{1, 2, 5} * 10^n` not exceeding `target`.
fn round_down_1_2_5(target: f64) -> f64 {
    if !(target > 0.0) || !target.is_finite() {
        return 0.0;
    }
    let magnitude = 10_f64.powf(target.log10().floor());
    for mantissa in [5.0, 2.0, 1.0] {
        if mantissa * magnitude <= target {
            return mantissa * magnitude;
        }
    }
    magnitude
}

/// Formats a distance in map units, assuming meters.
fn format_distance(units: f64) -> String {
    if units >= 1000.0 {
        format!("{} km", units / 1000.0)
    } else if units >= 1.0 {
        format!("{units} m")
    } else {
        format!("{:.2} m", units)
    }
}

fn substitute_placeholders(text: &str, session_id: &str) -> String {
    text.replace("[DATE]", &Local::now().format("%d/%m/%Y").to_string())
        .replace("[SESSION_ID]", session_id)
}

fn north_arrow_rect(map_rect: ElementRect) -> ElementRect {
    ElementRect::new(
        map_rect.x + map_rect.width - NORTH_ARROW_SIZE_MM - NORTH_ARROW_INSET_MM,
        map_rect.y + NORTH_ARROW_INSET_MM,
        NORTH_ARROW_SIZE_MM,
        NORTH_ARROW_SIZE_MM,
    )
}
