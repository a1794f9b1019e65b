//! Croquis is a headless map rendering and print layout engine for cadastral
//! sketches. It rasterizes vector and raster layers into map images, draws
//! coordinate grids and survey markers on top, composes print pages out of
//! declarative layout elements (maps, legends, scale bars, labels, tables,
//! images, north arrows) and exports them to PDF or raster documents.
//!
//! # Quick start
//!
//! Rendering a map image from a request record:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use croquis::layer::MemoryRegistry;
//! use croquis::request::{render_map, RenderMapRequest};
//! use croquis::RenderContext;
//!
//! let registry = Arc::new(MemoryRegistry::new());
//! let context = RenderContext::new();
//!
//! let request: RenderMapRequest = serde_json::from_str(
//!     r#"{ "width": 800, "height": 600, "extent": "0,0,100,100", "format": "png" }"#,
//! )?;
//! let rendered = render_map(registry.as_ref(), &context, request)?;
//! assert_eq!(rendered.content_type, "image/png");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Main components
//!
//! * The [`layer`] module holds the data model: vector features, raster
//!   images and the [`LayerRegistry`](layer::LayerRegistry) that owns them.
//!   The registry is an external collaborator: it outlives any render and is
//!   only read during one.
//! * The [`map`] module resolves a request into immutable
//!   [`MapSettings`](map::MapSettings) and describes the grid and marker
//!   overlays.
//! * The [`render`] module turns settings plus overlays into pixels.
//! * The [`layout`] module composes print pages and the [`export`] module
//!   serializes them to PDF, PNG or JPEG.
//!
//! All configuration values are constructed per request and dropped after
//! rendering; nothing in the engine holds hidden mutable state. The one
//! long-lived object besides the registry is [`RenderContext`], which owns
//! the loaded font and decorative assets and is built once at startup.

mod color;
pub mod context;
pub mod error;
pub mod export;
pub mod layer;
pub mod layout;
pub mod map;
pub mod parcel;
pub mod render;
pub mod request;

pub use color::Color;
pub use context::RenderContext;
pub use error::CroquisError;

// Reexport croquis_types
pub use croquis_types;
