//! Geometry and coordinate primitives used by the `croquis` rendering engine.
//!
//! Everything in this crate is a plain value type: extents, sizes, points and
//! the map-to-pixel transform. All of it is independent of any rendering
//! backend, so the higher-level crates can be tested against these types
//! without touching a canvas.

pub mod crs;
pub mod extent;
pub mod point;
pub mod size;
pub mod transform;

pub use crs::Crs;
pub use extent::Extent;
pub use point::Point2d;
pub use size::Size;
pub use transform::PixelTransform;
