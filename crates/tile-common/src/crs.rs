//! Coordinate Reference System registry.
//!
//! Projection math lives outside this pipeline. What the tile code needs from
//! a CRS is small: its identifier, the order of its first two axes and how
//! many meters one map unit spans.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TileError;

/// Meters per degree on the WGS84 sphere used for resolution math.
pub const METERS_PER_DEGREE: f64 = 2.0 * std::f64::consts::PI * 6_378_137.0 / 360.0;

/// Well-known CRS codes understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// OGC CRS84 (lon/lat in degrees)
    Crs84,
    /// Web Mercator (meters)
    Epsg3857,
    /// NAD83 Geographic
    Epsg4269,
    /// Albers Equal Area (CONUS)
    Epsg5070,
    /// Polar Stereographic North
    Epsg3413,
    /// Polar Stereographic South
    Epsg3031,
}

/// Orientation of the first two axes of a CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    /// East, north (x, y)
    EastNorth,
    /// North, east (y, x)
    NorthEast,
}

impl CrsCode {
    /// Look up a CRS by EPSG number.
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(CrsCode::Epsg4326),
            3857 | 900913 | 3785 => Some(CrsCode::Epsg3857),
            4269 => Some(CrsCode::Epsg4269),
            5070 => Some(CrsCode::Epsg5070),
            3413 => Some(CrsCode::Epsg3413),
            3031 => Some(CrsCode::Epsg3031),
            _ => None,
        }
    }

    /// Parse a CRS identifier as found in service metadata.
    ///
    /// Accepts formats like:
    /// - "EPSG:3857"
    /// - "urn:ogc:def:crs:EPSG::4326"
    /// - "http://www.opengis.net/def/crs/EPSG/0/3857"
    /// - "http://www.opengis.net/def/crs/OGC/1.3/CRS84" and "CRS:84"
    pub fn from_identifier(identifier: &str) -> Result<Self, TileError> {
        let normalized = identifier.trim().to_uppercase();

        if normalized.ends_with("CRS84") || normalized == "CRS:84" {
            return Ok(CrsCode::Crs84);
        }

        if !normalized.contains("EPSG") {
            return Err(TileError::UnsupportedCrs(identifier.to_string()));
        }

        normalized
            .rsplit(|c| c == ':' || c == '/')
            .find(|part| !part.is_empty())
            .and_then(|code| code.parse::<u32>().ok())
            .and_then(CrsCode::from_epsg)
            .ok_or_else(|| TileError::UnsupportedCrs(identifier.to_string()))
    }

    /// EPSG number, `None` for OGC CRS84.
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CrsCode::Epsg4326 => Some(4326),
            CrsCode::Crs84 => None,
            CrsCode::Epsg3857 => Some(3857),
            CrsCode::Epsg4269 => Some(4269),
            CrsCode::Epsg5070 => Some(5070),
            CrsCode::Epsg3413 => Some(3413),
            CrsCode::Epsg3031 => Some(3031),
        }
    }

    /// Axis order as declared by the authority.
    pub fn axis_orientation(&self) -> AxisOrientation {
        match self {
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => AxisOrientation::NorthEast,
            _ => AxisOrientation::EastNorth,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(
            self,
            CrsCode::Epsg4326 | CrsCode::Epsg4269 | CrsCode::Crs84
        )
    }

    /// Meters spanned by one map unit.
    pub fn meters_per_unit(&self) -> f64 {
        if self.is_geographic() {
            METERS_PER_DEGREE
        } else {
            1.0
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg_code() {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "OGC:CRS84"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifier_forms() {
        assert_eq!(
            CrsCode::from_identifier("EPSG:3857").unwrap(),
            CrsCode::Epsg3857
        );
        assert_eq!(
            CrsCode::from_identifier("urn:ogc:def:crs:EPSG::4326").unwrap(),
            CrsCode::Epsg4326
        );
        assert_eq!(
            CrsCode::from_identifier("http://www.opengis.net/def/crs/EPSG/0/3857").unwrap(),
            CrsCode::Epsg3857
        );
        assert_eq!(
            CrsCode::from_identifier("http://www.opengis.net/def/crs/OGC/1.3/CRS84").unwrap(),
            CrsCode::Crs84
        );
        assert!(CrsCode::from_identifier("EPSG:99999").is_err());
        assert!(CrsCode::from_identifier("IAU:49900").is_err());
    }

    #[test]
    fn test_axis_orientation() {
        assert_eq!(
            CrsCode::Epsg4326.axis_orientation(),
            AxisOrientation::NorthEast
        );
        assert_eq!(CrsCode::Crs84.axis_orientation(), AxisOrientation::EastNorth);
        assert_eq!(
            CrsCode::Epsg3857.axis_orientation(),
            AxisOrientation::EastNorth
        );
    }

    #[test]
    fn test_meters_per_unit() {
        assert_eq!(CrsCode::Epsg3857.meters_per_unit(), 1.0);
        assert!((CrsCode::Epsg4326.meters_per_unit() - 111_319.490_793_273_57).abs() < 1e-6);
    }

    #[test]
    fn test_display() {
        assert_eq!(CrsCode::Epsg3857.to_string(), "EPSG:3857");
        assert_eq!(CrsCode::Crs84.to_string(), "OGC:CRS84");
    }
}
