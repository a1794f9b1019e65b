//! Parcel construction from loose survey points.
//!
//! Surveyors deliver boundary markers as an unordered list of coordinates.
//! [`Parcel::from_points`] turns them into a closed, clockwise ring starting
//! at the northernmost marker, names the markers `B1..Bn`, and derives the
//! side lengths and the surface area. [`Parcel::to_layers`] materializes the
//! result as registry layers, which also feed layout table elements.

use serde_json::json;

use crate::error::{CroquisError, Result};
use crate::layer::{Feature, Geometry, VectorLayer, VectorStyle};
use crate::Color;
use croquis_types::point::distance;
use croquis_types::{Crs, Point2d};

/// One named boundary marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelVertex {
    /// Marker name, `B1..Bn` in ring order.
    pub name: String,
    /// Marker position.
    pub position: Point2d,
    /// Distance to the next marker along the ring, rounded to centimeters.
    pub distance_to_next: f64,
}

/// A closed parcel boundary with derived measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    vertices: Vec<ParcelVertex>,
    area: f64,
}

impl Parcel {
    /// Builds a parcel from survey points.
    ///
    /// Duplicate points are dropped, keeping first occurrences. After
    /// deduplication at least three distinct points must remain. The ring is
    /// oriented clockwise and rotated to start at the northernmost marker
    /// (ties broken by the westernmost).
    pub fn from_points(points: &[Point2d]) -> Result<Self> {
        let mut ring: Vec<Point2d> = Vec::with_capacity(points.len());
        for point in points {
            if !ring.contains(point) {
                ring.push(*point);
            }
        }
        if ring.len() < 3 {
            return Err(CroquisError::DegenerateGeometry(format!(
                "a parcel needs at least 3 distinct points, got {}",
                ring.len()
            )));
        }

        if !is_clockwise(&ring) {
            ring.reverse();
        }
        let start = northernmost(&ring);
        ring.rotate_left(start);

        let count = ring.len();
        let vertices = ring
            .iter()
            .enumerate()
            .map(|(i, position)| ParcelVertex {
                name: format!("B{}", i + 1),
                position: *position,
                distance_to_next: round2(distance(position, &ring[(i + 1) % count])),
            })
            .collect();

        Ok(Self {
            vertices,
            area: round2(shoelace_area(&ring)),
        })
    }

    /// Markers in ring order.
    pub fn vertices(&self) -> &[ParcelVertex] {
        &self.vertices
    }

    /// Surface area in square map units, rounded to 2 decimals.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// The boundary ring, closed (last point repeats the first).
    pub fn ring(&self) -> Vec<Point2d> {
        let mut ring: Vec<Point2d> = self.vertices.iter().map(|v| v.position).collect();
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        ring
    }

    /// Builds the polygon and marker layers for the parcel.
    ///
    /// The polygon layer carries a `Superficie` attribute; each marker
    /// feature carries `Bornes`, `X`, `Y` (rounded to whole units) and
    /// `Distance`, which is the column set layout tables expect.
    pub fn to_layers(&self, crs: Crs) -> (VectorLayer, VectorLayer) {
        let polygon_style = VectorStyle {
            stroke: Color::rgba(200, 30, 30, 255),
            stroke_width: 2.0,
            fill: Color::rgba(240, 220, 130, 120),
            ..Default::default()
        };
        let polygon = VectorLayer::new("terrain", "Terrain", crs.clone())
            .with_style(polygon_style)
            .with_features(vec![Feature::new(Geometry::Polygon(vec![self.ring()]))
                .with_attribute("Superficie", json!(self.area))]);

        let marker_style = VectorStyle {
            stroke: Color::rgba(40, 40, 40, 255),
            point_size: 6.0,
            ..Default::default()
        };
        let markers = VectorLayer::new("bornes", "Bornes", crs)
            .with_style(marker_style)
            .with_features(self.vertices.iter().map(|vertex| {
                Feature::new(Geometry::Point(vertex.position))
                    .with_attribute("Bornes", json!(vertex.name))
                    .with_attribute("X", json!(vertex.position.x.round() as i64))
                    .with_attribute("Y", json!(vertex.position.y.round() as i64))
                    .with_attribute("Distance", json!(vertex.distance_to_next))
            }));

        (polygon, markers)
    }
}

/// True when the ring winds clockwise in a y-up coordinate system.
fn is_clockwise(ring: &[Point2d]) -> bool {
    signed_edge_sum(ring) > 0.0
}

fn signed_edge_sum(ring: &[Point2d]) -> f64 {
    let count = ring.len();
    (0..count)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % count];
            (b.x - a.x) * (b.y + a.y)
        })
        .sum()
}

fn shoelace_area(ring: &[Point2d]) -> f64 {
    let count = ring.len();
    let twice: f64 = (0..count)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % count];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}

fn northernmost(ring: &[Point2d]) -> usize {
    let mut best = 0;
    for (i, point) in ring.iter().enumerate() {
        let current = ring[best];
        if point.y > current.y || (point.y == current.y && point.x < current.x) {
            best = i;
        }
    }
    best
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
