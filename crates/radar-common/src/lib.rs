//! Common types shared across the radar-tiles workspace.

pub mod bbox;
pub mod tile;

pub use bbox::BoundingBox;
pub use tile::{latlon_to_tile, TileCoord, MAX_ZOOM, TILE_SIZE};
