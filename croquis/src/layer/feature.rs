//! Vector features: geometry plus free-form attributes.

use std::collections::BTreeMap;

use croquis_types::{Extent, Point2d};
use serde::{Deserialize, Serialize};

/// Geometry of a single vector feature, in the layer's CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single point.
    Point(Point2d),
    /// An open polyline.
    Line(Vec<Point2d>),
    /// A polygon. The first ring is the outer boundary, the rest are holes.
    Polygon(Vec<Vec<Point2d>>),
}

impl Geometry {
    /// Bounding extent of the geometry.
    pub fn extent(&self) -> Extent {
        match self {
            Geometry::Point(p) => Extent::new(p.x, p.y, p.x, p.y),
            Geometry::Line(points) => Extent::from_points(points.iter()),
            Geometry::Polygon(rings) => rings
                .iter()
                .map(|ring| Extent::from_points(ring.iter()))
                .collect(),
        }
    }

    /// Classifies the geometry for layer summaries.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::Line(_) => GeometryType::Line,
            Geometry::Polygon(_) => GeometryType::Polygon,
        }
    }
}

/// Geometry kind of a vector layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    /// Point features.
    Point,
    /// Polyline features.
    Line,
    /// Polygon features.
    Polygon,
}

/// A vector feature: one geometry with named attributes.
///
/// Attributes are open-ended JSON values so the table composer and the CRUD
/// layer can exchange arbitrary columns without a schema in the engine.
#[derive(Debug, Clone)]
pub struct Feature {
    geometry: Geometry,
    attributes: BTreeMap<String, serde_json::Value>,
}

impl Feature {
    /// Creates a feature with no attributes.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute value to the feature.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The feature's geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Attribute value by name, if present.
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// All attribute names, in stable order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|k| k.as_str())
    }

    /// Renders an attribute as display text. Missing values render empty,
    /// strings render without quotes.
    pub fn attribute_text(&self, name: &str) -> String {
        match self.attributes.get(name) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}
