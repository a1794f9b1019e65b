use std::sync::Arc;

use croquis_types::{Crs, Extent};
use parking_lot::RwLock;

use super::{LayerInfo, LayerSource, ProjectInfo};
use crate::error::{CroquisError, Result};

/// Reference to a registered layer, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    /// Layer identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

/// Read-only view of the layers available to a render.
///
/// The registry is owned by the session/CRUD layer and outlives every render
/// operation. During a render it is only read, so concurrent renders over the
/// same registry are safe.
pub trait LayerRegistry: Send + Sync {
    /// Visible layers in draw order, bottom first.
    fn list_visible_layers(&self) -> Result<Vec<LayerRef>>;

    /// Resolves a layer by id.
    fn layer(&self, id: &str) -> Result<Arc<LayerSource>>;

    /// Native extent of a layer.
    fn layer_extent(&self, id: &str) -> Result<Extent> {
        Ok(self.layer(id)?.extent())
    }

    /// CRS of a layer.
    fn layer_crs(&self, id: &str) -> Result<Crs> {
        Ok(self.layer(id)?.crs().clone())
    }
}

struct Entry {
    layer: Arc<LayerSource>,
    visible: bool,
}

/// In-memory [`LayerRegistry`] keeping layers in insertion (draw) order.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer on top of the existing ones. Replaces a previously
    /// registered layer with the same id, keeping its position.
    pub fn add_layer(&self, layer: LayerSource) {
        let layer = Arc::new(layer);
        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.layer.id() == layer.id()) {
            existing.layer = layer;
        } else {
            entries.push(Entry {
                layer,
                visible: true,
            });
        }
    }

    /// Removes a layer. Returns false if the id was not registered.
    pub fn remove_layer(&self, id: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.layer.id() != id);
        entries.len() != before
    }

    /// Shows or hides a layer without removing it.
    pub fn set_visible(&self, id: &str, visible: bool) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.layer.id() == id)
            .ok_or_else(|| CroquisError::NotFound(format!("layer `{id}`")))?;
        entry.visible = visible;
        Ok(())
    }

    /// Summaries of all registered layers, visible or not.
    pub fn layer_infos(&self) -> Vec<LayerInfo> {
        self.entries
            .read()
            .iter()
            .map(|e| e.layer.info())
            .collect()
    }

    /// Project-level summary: layer count, shared CRS and the union of all
    /// layer extents, with the per-layer records of [`Self::layer_infos`].
    pub fn project_info(&self) -> ProjectInfo {
        let entries = self.entries.read();
        let extent = entries
            .iter()
            .fold(Extent::EMPTY, |union, e| union.union(e.layer.extent()));
        let crs = entries
            .first()
            .map(|e| e.layer.crs().code().to_string())
            .unwrap_or_else(|| Crs::default().code().to_string());
        ProjectInfo {
            layer_count: entries.len(),
            crs,
            extent: if extent.is_empty() { None } else { Some(extent) },
            layers: entries.iter().map(|e| e.layer.info()).collect(),
        }
    }
}

impl LayerRegistry for MemoryRegistry {
    fn list_visible_layers(&self) -> Result<Vec<LayerRef>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.visible)
            .map(|e| LayerRef {
                id: e.layer.id().to_string(),
                name: e.layer.name().to_string(),
            })
            .collect())
    }

    fn layer(&self, id: &str) -> Result<Arc<LayerSource>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.layer.id() == id)
            .map(|e| e.layer.clone())
            .ok_or_else(|| CroquisError::NotFound(format!("layer `{id}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Feature, Geometry, VectorLayer};
    use assert_matches::assert_matches;
    use croquis_types::Point2d;

    fn point_layer(id: &str, x: f64, y: f64) -> LayerSource {
        LayerSource::Vector(
            VectorLayer::new(id, id.to_uppercase(), Crs::default())
                .with_features([Feature::new(Geometry::Point(Point2d::new(x, y)))]),
        )
    }

    #[test]
    fn layers_keep_insertion_order() {
        let registry = MemoryRegistry::new();
        registry.add_layer(point_layer("base", 0.0, 0.0));
        registry.add_layer(point_layer("parcels", 1.0, 1.0));

        let visible = registry.list_visible_layers().expect("registry readable");
        assert_eq!(visible[0].id, "base");
        assert_eq!(visible[1].id, "parcels");
    }

    #[test]
    fn hidden_layers_are_not_listed_but_still_resolvable() {
        let registry = MemoryRegistry::new();
        registry.add_layer(point_layer("base", 0.0, 0.0));
        registry.set_visible("base", false).expect("layer exists");

        assert!(registry
            .list_visible_layers()
            .expect("registry readable")
            .is_empty());
        assert!(registry.layer("base").is_ok());
    }

    #[test]
    fn missing_layer_is_not_found() {
        let registry = MemoryRegistry::new();
        assert_matches!(registry.layer("nope"), Err(CroquisError::NotFound(_)));
        assert_matches!(
            registry.set_visible("nope", true),
            Err(CroquisError::NotFound(_))
        );
    }

    #[test]
    fn project_info_aggregates_the_layers() {
        let registry = MemoryRegistry::new();
        registry.add_layer(point_layer("base", 0.0, 0.0));
        registry.add_layer(point_layer("parcels", 10.0, 5.0));
        registry.set_visible("parcels", false).expect("layer exists");

        let info = registry.project_info();
        assert_eq!(info.layer_count, 2);
        assert_eq!(info.extent, Some(Extent::new(0.0, 0.0, 10.0, 5.0)));
        assert_eq!(info.layers.len(), 2);
        assert_eq!(info.crs, Crs::default().code());

        let empty = MemoryRegistry::new().project_info();
        assert_eq!(empty.layer_count, 0);
        assert!(empty.extent.is_none());
    }

    #[test]
    fn replacing_a_layer_keeps_position() {
        let registry = MemoryRegistry::new();
        registry.add_layer(point_layer("base", 0.0, 0.0));
        registry.add_layer(point_layer("parcels", 1.0, 1.0));
        registry.add_layer(point_layer("base", 5.0, 5.0));

        let visible = registry.list_visible_layers().expect("registry readable");
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].id, "base");

        let extent = registry.layer_extent("base").expect("layer exists");
        assert_eq!(extent, Extent::new(5.0, 5.0, 5.0, 5.0));
    }
}
