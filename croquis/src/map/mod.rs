//! Map settings: the immutable, fully resolved parameters of one render.

use croquis_types::{Crs, Extent, Size};
use log::warn;

use crate::error::{CroquisError, Result};
use crate::layer::LayerRegistry;
use crate::Color;

pub mod grid;
pub mod marker;

pub use grid::{GridConfig, GridGeometry, GridLabelPosition, GridStyle};
pub use marker::{MarkerLabelConfig, MarkerStyle, PointMarker};

/// Fraction of the layer extent added on each side when a map is framed
/// around its layers without an explicit extent or scale.
pub const DEFAULT_FRAMING_MARGIN: f64 = 0.05;

/// Resolved parameters for one map rasterization.
///
/// Built once per render by [`MapSettingsBuilder`], consumed by the renderer
/// and dropped. Nothing mutates settings after they are built.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    size: Size<u32>,
    dpi: f64,
    crs: Crs,
    extent: Extent,
    background: Color,
    layer_ids: Vec<String>,
}

impl MapSettings {
    /// Output size in pixels.
    pub fn size(&self) -> Size<u32> {
        self.size
    }

    /// Output resolution in dots per inch.
    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// CRS of the rendered extent.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Extent shown by the render.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Background fill. A fully transparent color means an alpha-zero fill.
    pub fn background(&self) -> Color {
        self.background
    }

    /// Layers to draw, bottom to top.
    pub fn layer_ids(&self) -> &[String] {
        &self.layer_ids
    }
}

/// Builds [`MapSettings`] from the optional fields of a render request.
///
/// The extent is resolved in priority order: explicit extent string, scale
/// centered on the visible layers, visible layer extents with a 5% margin,
/// and finally the world extent. A malformed extent string is ignored with a
/// warning and falls through to the next rule rather than failing the
/// request; the builder only errors when the registry cannot be read or a
/// mandatory field (size, dpi, spacing) is invalid.
#[derive(Debug, Clone, Default)]
pub struct MapSettingsBuilder {
    width: u32,
    height: u32,
    dpi: Option<f64>,
    crs: Option<Crs>,
    extent_str: Option<String>,
    scale: Option<f64>,
    background: Option<Color>,
    layer_ids: Option<Vec<String>>,
}

impl MapSettingsBuilder {
    /// Default output width in pixels.
    pub const DEFAULT_WIDTH: u32 = 800;
    /// Default output height in pixels.
    pub const DEFAULT_HEIGHT: u32 = 600;
    /// Default output resolution.
    pub const DEFAULT_DPI: f64 = 96.0;

    /// Creates a builder with the default output size.
    pub fn new() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            ..Default::default()
        }
    }

    /// Output size in pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Output resolution in dots per inch.
    pub fn dpi(mut self, dpi: f64) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// CRS of the request coordinates.
    pub fn crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Explicit extent as four comma-separated numbers,
    /// `"xmin,ymin,xmax,ymax"`.
    pub fn extent_str(mut self, extent: impl Into<String>) -> Self {
        self.extent_str = Some(extent.into());
        self
    }

    /// Print scale denominator (`5000` for 1:5000).
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Background fill color.
    pub fn background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }

    /// Restricts the render to the given layers, bottom to top. An empty
    /// list means the same as not calling this at all: the registry's
    /// visible layers are drawn.
    pub fn layers(mut self, layer_ids: Vec<String>) -> Self {
        self.layer_ids = Some(layer_ids);
        self
    }

    /// Resolves the settings against the registry.
    pub fn build(mut self, registry: &dyn LayerRegistry) -> Result<MapSettings> {
        if self.width == 0 || self.height == 0 {
            return Err(CroquisError::config(
                "width/height",
                format!("output size {}x{} has no area", self.width, self.height),
            ));
        }
        let dpi = self.dpi.unwrap_or(Self::DEFAULT_DPI);
        if dpi <= 0.0 {
            return Err(CroquisError::config("dpi", format!("{dpi} is not positive")));
        }

        let layer_ids = match self.layer_ids.take() {
            Some(ids) if !ids.is_empty() => ids,
            _ => registry
                .list_visible_layers()?
                .into_iter()
                .map(|l| l.id)
                .collect(),
        };

        let size = Size::new(self.width, self.height);
        let extent = self.resolve_extent(registry, &layer_ids, size, dpi)?;
        if extent.is_degenerate() {
            return Err(CroquisError::DegenerateGeometry(format!(
                "resolved extent {extent:?} has no area"
            )));
        }

        Ok(MapSettings {
            size,
            dpi,
            crs: self.crs.unwrap_or_default(),
            extent,
            background: self.background.unwrap_or(Color::TRANSPARENT),
            layer_ids,
        })
    }

    fn resolve_extent(
        &self,
        registry: &dyn LayerRegistry,
        layer_ids: &[String],
        size: Size<u32>,
        dpi: f64,
    ) -> Result<Extent> {
        if let Some(extent_str) = &self.extent_str {
            match parse_extent(extent_str) {
                Some(extent) => return Ok(extent),
                // Historical leniency: a malformed extent string never fails
                // the request, it falls through to the scale/layers rules.
                None => warn!("ignoring malformed extent string {extent_str:?}"),
            }
        }

        let layers_extent = self.union_of_layer_extents(registry, layer_ids)?;

        if let Some(scale) = self.scale {
            if scale > 0.0 && !layers_extent.is_empty() {
                return Ok(Extent::for_scale(
                    layers_extent.center(),
                    scale,
                    size.cast_f64(),
                    dpi,
                ));
            }
            warn!("cannot apply scale {scale} without visible layers to center on");
        }

        if !layers_extent.is_empty() {
            return Ok(layers_extent.expand_by_margin(DEFAULT_FRAMING_MARGIN));
        }

        Ok(Extent::WORLD)
    }

    fn union_of_layer_extents(
        &self,
        registry: &dyn LayerRegistry,
        layer_ids: &[String],
    ) -> Result<Extent> {
        let mut union = Extent::EMPTY;
        for id in layer_ids {
            match registry.layer_extent(id) {
                Ok(extent) => union = union.union(extent),
                Err(CroquisError::NotFound(_)) => {
                    warn!("skipping unknown layer `{id}` while resolving extent")
                }
                Err(other) => return Err(other),
            }
        }
        Ok(union)
    }
}

/// Parses `"xmin,ymin,xmax,ymax"`. Returns `None` for anything that is not
/// four finite comma-separated numbers.
fn parse_extent(value: &str) -> Option<Extent> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<_>>()?;
    if parts.len() != 4 || parts.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Extent::new(parts[0], parts[1], parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Feature, Geometry, LayerSource, MemoryRegistry, VectorLayer};
    use assert_matches::assert_matches;
    use croquis_types::Point2d;

    fn registry_with_square() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.add_layer(LayerSource::Vector(
            VectorLayer::new("terrain", "Terrain", Crs::default()).with_features([Feature::new(
                Geometry::Polygon(vec![vec![
                    Point2d::new(0.0, 0.0),
                    Point2d::new(100.0, 0.0),
                    Point2d::new(100.0, 50.0),
                    Point2d::new(0.0, 50.0),
                ]]),
            )]),
        ));
        registry
    }

    #[test]
    fn explicit_extent_wins() {
        let registry = registry_with_square();
        let settings = MapSettingsBuilder::new()
            .extent_str("10, 20, 30, 40")
            .scale(5000.0)
            .build(&registry)
            .expect("valid request");
        assert_eq!(settings.extent(), Extent::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn malformed_extent_falls_through_to_layers() {
        let registry = registry_with_square();
        let settings = MapSettingsBuilder::new()
            .extent_str("10,20,thirty,40")
            .build(&registry)
            .expect("valid request");
        // Layer union with the 5% framing margin.
        assert_eq!(settings.extent(), Extent::new(-5.0, -2.5, 105.0, 52.5));
    }

    #[test]
    fn scale_centers_on_layer_union() {
        let registry = registry_with_square();
        let settings = MapSettingsBuilder::new()
            .scale(5000.0)
            .dpi(96.0)
            .build(&registry)
            .expect("valid request");

        let expected = Extent::for_scale(
            Point2d::new(50.0, 25.0),
            5000.0,
            Size::new(800.0, 600.0),
            96.0,
        );
        assert_eq!(settings.extent(), expected);
    }

    #[test]
    fn empty_layer_list_frames_the_visible_layers() {
        let registry = registry_with_square();
        let settings = MapSettingsBuilder::new()
            .layers(Vec::new())
            .build(&registry)
            .expect("valid request");
        assert_eq!(settings.extent(), Extent::new(-5.0, -2.5, 105.0, 52.5));
        assert_eq!(settings.layer_ids(), ["terrain"]);
    }

    #[test]
    fn omitted_background_is_transparent() {
        let registry = registry_with_square();
        let settings = MapSettingsBuilder::new()
            .build(&registry)
            .expect("valid request");
        assert_eq!(settings.background(), Color::TRANSPARENT);
    }

    #[test]
    fn empty_registry_falls_back_to_world() {
        let registry = MemoryRegistry::new();
        let settings = MapSettingsBuilder::new()
            .build(&registry)
            .expect("valid request");
        assert_eq!(settings.extent(), Extent::WORLD);
        assert!(settings.layer_ids().is_empty());
    }

    #[test]
    fn scale_without_layers_falls_back_to_world() {
        let registry = MemoryRegistry::new();
        let settings = MapSettingsBuilder::new()
            .scale(5000.0)
            .build(&registry)
            .expect("valid request");
        assert_eq!(settings.extent(), Extent::WORLD);
    }

    #[test]
    fn zero_size_is_rejected() {
        let registry = registry_with_square();
        assert_matches!(
            MapSettingsBuilder::new().size(0, 600).build(&registry),
            Err(CroquisError::Configuration { .. })
        );
    }

    #[test]
    fn zero_area_extent_is_rejected() {
        let registry = registry_with_square();
        assert_matches!(
            MapSettingsBuilder::new()
                .extent_str("10,20,10,40")
                .build(&registry),
            Err(CroquisError::DegenerateGeometry(_))
        );
    }

    #[test]
    fn unknown_requested_layer_is_skipped_for_extent() {
        let registry = registry_with_square();
        let settings = MapSettingsBuilder::new()
            .layers(vec!["terrain".into(), "missing".into()])
            .build(&registry)
            .expect("valid request");
        assert_eq!(settings.extent(), Extent::new(-5.0, -2.5, 105.0, 52.5));
        assert_eq!(settings.layer_ids().len(), 2);
    }

    #[test]
    fn parse_extent_rejects_garbage() {
        assert!(parse_extent("1,2,3").is_none());
        assert!(parse_extent("1,2,3,4,5").is_none());
        assert!(parse_extent("a,b,c,d").is_none());
        assert!(parse_extent("1,2,3,inf").is_none());
        assert_eq!(
            parse_extent(" 0,0 , 100, 100"),
            Some(Extent::new(0.0, 0.0, 100.0, 100.0))
        );
    }
}
