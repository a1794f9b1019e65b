//! Coordinate reference system identifiers.

use serde::{Deserialize, Serialize};

/// A coordinate reference system, identified by its authority code.
///
/// The engine does not reproject between systems; the CRS is carried through
/// so that the request layer and data sources can agree on the units of the
/// coordinates they exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Crs {
    code: String,
}

impl Crs {
    /// Geographic WGS84 coordinates (`EPSG:4326`).
    pub const WGS84: &'static str = "EPSG:4326";
    /// Web Mercator (`EPSG:3857`).
    pub const WEB_MERCATOR: &'static str = "EPSG:3857";

    /// Creates a CRS from an authority code such as `EPSG:32630`.
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// The authority code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns true for degree-based systems, where the meter-based scale
    /// conversion in `Extent::for_scale` is only an approximation.
    pub fn is_geographic(&self) -> bool {
        self.code.eq_ignore_ascii_case(Self::WGS84)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::new(Self::WGS84)
    }
}

impl From<String> for Crs {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.code
    }
}
