//! Layer model: vector and raster data sources and the registry that owns
//! them.
//!
//! Layers are externally owned: the registry outlives any single render, and
//! a render only ever reads from it. The engine never mutates layer data.

use croquis_types::{Crs, Extent};
use image::RgbaImage;
use serde::Serialize;

use crate::Color;

pub mod feature;
mod registry;

pub use feature::{Feature, Geometry, GeometryType};
pub use registry::{LayerRef, LayerRegistry, MemoryRegistry};

/// How vector features of a layer are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorStyle {
    /// Outline color for lines and polygon boundaries.
    pub stroke: Color,
    /// Outline width in pixels.
    pub stroke_width: f32,
    /// Fill color for polygons.
    pub fill: Color,
    /// Diameter of point features in pixels.
    pub point_size: f32,
}

impl Default for VectorStyle {
    fn default() -> Self {
        Self {
            stroke: Color::rgba(35, 35, 35, 255),
            stroke_width: 1.5,
            fill: Color::rgba(255, 158, 23, 96),
            point_size: 6.0,
        }
    }
}

/// A vector layer: an ordered set of features with a single style.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    /// Layer identifier, unique within a registry.
    pub id: String,
    /// Human-readable name, used in legends.
    pub name: String,
    /// CRS of the feature coordinates.
    pub crs: Crs,
    /// Draw style for all features of the layer.
    pub style: VectorStyle,
    /// Features in draw order.
    pub features: Vec<Feature>,
}

impl VectorLayer {
    /// Creates an empty vector layer with the default style.
    pub fn new(id: impl Into<String>, name: impl Into<String>, crs: Crs) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            crs,
            style: VectorStyle::default(),
            features: Vec::new(),
        }
    }

    /// Replaces the layer style.
    pub fn with_style(mut self, style: VectorStyle) -> Self {
        self.style = style;
        self
    }

    /// Adds features to the layer.
    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features.extend(features);
        self
    }

    /// Bounding extent of all features; empty for a layer without features.
    pub fn extent(&self) -> Extent {
        self.features.iter().map(|f| f.geometry().extent()).collect()
    }

    /// Dominant geometry type, taken from the first feature.
    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.features.first().map(|f| f.geometry().geometry_type())
    }
}

/// A raster layer: a decoded georeferenced image.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    /// Layer identifier, unique within a registry.
    pub id: String,
    /// Human-readable name, used in legends.
    pub name: String,
    /// CRS of the georeferencing extent.
    pub crs: Crs,
    /// Decoded RGBA pixels.
    pub image: RgbaImage,
    /// Geographic footprint of the image.
    pub extent: Extent,
}

/// A data source held by a [`LayerRegistry`].
#[derive(Debug, Clone)]
pub enum LayerSource {
    /// Vector features.
    Vector(VectorLayer),
    /// Georeferenced raster image.
    Raster(RasterLayer),
}

impl LayerSource {
    /// Layer identifier.
    pub fn id(&self) -> &str {
        match self {
            LayerSource::Vector(v) => &v.id,
            LayerSource::Raster(r) => &r.id,
        }
    }

    /// Human-readable layer name.
    pub fn name(&self) -> &str {
        match self {
            LayerSource::Vector(v) => &v.name,
            LayerSource::Raster(r) => &r.name,
        }
    }

    /// Native extent of the layer data.
    pub fn extent(&self) -> Extent {
        match self {
            LayerSource::Vector(v) => v.extent(),
            LayerSource::Raster(r) => r.extent,
        }
    }

    /// CRS of the layer data.
    pub fn crs(&self) -> &Crs {
        match self {
            LayerSource::Vector(v) => &v.crs,
            LayerSource::Raster(r) => &r.crs,
        }
    }

    /// Serializable summary of the layer for the request layer.
    pub fn info(&self) -> LayerInfo {
        let extent = self.extent();
        let extent = if extent.is_empty() {
            None
        } else {
            // Rounded to 6 decimals keeps the summary stable across float noise.
            Some(Extent::new(
                round6(extent.x_min),
                round6(extent.y_min),
                round6(extent.x_max),
                round6(extent.y_max),
            ))
        };

        match self {
            LayerSource::Vector(v) => LayerInfo {
                id: v.id.clone(),
                name: v.name.clone(),
                layer_type: "vector",
                geometry_type: v.geometry_type(),
                crs: v.crs.code().to_string(),
                extent,
                feature_count: Some(v.features.len()),
                width: None,
                height: None,
            },
            LayerSource::Raster(r) => LayerInfo {
                id: r.id.clone(),
                name: r.name.clone(),
                layer_type: "raster",
                geometry_type: None,
                crs: r.crs.code().to_string(),
                extent,
                feature_count: None,
                width: Some(r.image.width()),
                height: Some(r.image.height()),
            },
        }
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Serializable layer summary exposed to the request layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerInfo {
    /// Layer identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// `"vector"` or `"raster"`.
    pub layer_type: &'static str,
    /// Geometry kind for vector layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<GeometryType>,
    /// CRS authority code.
    pub crs: String,
    /// Native extent, rounded to 6 decimals; absent for empty layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,
    /// Feature count for vector layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<usize>,
    /// Pixel width for raster layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height for raster layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Serializable project summary exposed to the request layer: every
/// registered layer plus the aggregate extent.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    /// Number of registered layers, visible or not.
    pub layer_count: usize,
    /// CRS authority code shared by the layers, or the default when the
    /// project is empty.
    pub crs: String,
    /// Union of all layer extents; absent when every layer is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,
    /// Per-layer summaries in draw order.
    pub layers: Vec<LayerInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use croquis_types::Point2d;

    #[test]
    fn vector_layer_extent_is_union_of_features() {
        let layer = VectorLayer::new("l1", "Terrain", Crs::default()).with_features([
            Feature::new(Geometry::Point(Point2d::new(1.0, 1.0))),
            Feature::new(Geometry::Point(Point2d::new(5.0, -3.0))),
        ]);
        assert_eq!(layer.extent(), Extent::new(1.0, -3.0, 5.0, 1.0));
    }

    #[test]
    fn empty_layer_has_empty_extent_and_no_info_extent() {
        let layer = VectorLayer::new("l1", "Terrain", Crs::default());
        assert!(layer.extent().is_empty());

        let info = LayerSource::Vector(layer).info();
        assert_eq!(info.layer_type, "vector");
        assert!(info.extent.is_none());
        assert_eq!(info.feature_count, Some(0));
    }

    #[test]
    fn info_rounds_extent() {
        let layer = VectorLayer::new("l1", "Terrain", Crs::default()).with_features([
            Feature::new(Geometry::Point(Point2d::new(1.123456789, 2.0))),
        ]);
        let info = LayerSource::Vector(layer).info();
        let extent = info.extent.expect("non-empty extent");
        assert_eq!(extent.x_min, 1.123457);
    }
}
