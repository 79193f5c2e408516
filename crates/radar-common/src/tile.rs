//! XYZ tile coordinates under the Web Mercator tiling scheme.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Highest zoom level served. Radar mosaics carry no detail beyond this.
pub const MAX_ZOOM: u32 = 14;

/// Tile edge length in pixels.
pub const TILE_SIZE: usize = 256;

/// A tile coordinate (z/x/y) in the standard XYZ scheme: 2^z tiles per
/// axis at zoom z, row 0 at the north edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Check that the coordinate addresses a real tile: z in [0, MAX_ZOOM]
    /// and x/y within the 2^z grid.
    pub fn is_valid(&self) -> bool {
        if self.z > MAX_ZOOM {
            return false;
        }
        let n = 1u32 << self.z;
        self.x < n && self.y < n
    }

    /// Geographic (WGS84) bounds of this tile under Web Mercator.
    pub fn bounds(&self) -> BoundingBox {
        let n = (1u32 << self.z) as f64;

        let west = self.x as f64 / n * 360.0 - 180.0;
        let east = (self.x + 1) as f64 / n * 360.0 - 180.0;

        let north = (std::f64::consts::PI * (1.0 - 2.0 * self.y as f64 / n))
            .sinh()
            .atan()
            .to_degrees();
        let south = (std::f64::consts::PI * (1.0 - 2.0 * (self.y + 1) as f64 / n))
            .sinh()
            .atan()
            .to_degrees();

        BoundingBox::new(west, south, east, north)
    }
}

/// Convert lat/lon to the tile containing it at the given zoom.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> TileCoord {
    let n = (1u32 << zoom) as f64;

    let x = ((lon + 180.0) / 360.0 * n).floor() as u32;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor() as u32;

    TileCoord { z: zoom, x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_bounds() {
        // z = 15 exceeds the served range
        assert!(!TileCoord::new(15, 0, 0).is_valid());
        // 2^5 = 32 is an exclusive upper bound
        assert!(!TileCoord::new(5, 32, 0).is_valid());
        assert!(!TileCoord::new(5, 0, 32).is_valid());
        assert!(TileCoord::new(5, 10, 10).is_valid());
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(TileCoord::new(14, 16383, 16383).is_valid());
    }

    #[test]
    fn test_zoom_zero_covers_world() {
        let bbox = TileCoord::new(0, 0, 0).bounds();
        assert!((bbox.west - (-180.0)).abs() < 1e-9);
        assert!((bbox.east - 180.0).abs() < 1e-9);
        // Web Mercator clips latitude at ~85.05
        assert!((bbox.north - 85.0511287798066).abs() < 1e-6);
        assert!((bbox.south + 85.0511287798066).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_roundtrip() {
        let coord = latlon_to_tile(40.7128, -74.0060, 10); // NYC
        let bbox = coord.bounds();
        assert!(bbox.contains_point(-74.0060, 40.7128));
    }

    #[test]
    fn test_adjacent_tiles_share_edges() {
        let a = TileCoord::new(6, 14, 24).bounds();
        let b = TileCoord::new(6, 15, 24).bounds();
        let c = TileCoord::new(6, 14, 25).bounds();
        assert!((a.east - b.west).abs() < 1e-12);
        assert!((a.south - c.north).abs() < 1e-12);
    }
}
