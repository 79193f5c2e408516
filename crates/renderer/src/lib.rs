//! Tile rendering for published radar rasters.
//!
//! The render path: slice/reproject the raster into the tile's Web
//! Mercator footprint, quantize dBZ values into the 256-entry color
//! lookup table, and encode the result as an indexed PNG. Every failure
//! is an explicit [`RenderError`]; callers decide the fallback (usually
//! the cached [`empty_tile`]).

pub mod colormap;
pub mod extract;
pub mod png;

use std::path::Path;

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

use radar_common::{TileCoord, TILE_SIZE};
use raster::{read_raster, RasterDataset, RasterError};

use colormap::{dbz_to_index, ColorTable};

/// Errors from the tile rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The tile footprint does not intersect the raster bounds.
    #[error("tile footprint does not intersect the raster bounds")]
    OutsideBounds,

    #[error("failed to read raster: {0}")]
    Raster(#[from] RasterError),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// The process-wide color lookup table, built once.
static COLOR_TABLE: Lazy<ColorTable> = Lazy::new(ColorTable::build);

/// The shared fully-transparent 256x256 tile, encoded once per process.
static EMPTY_TILE: Lazy<Vec<u8>> = Lazy::new(|| {
    let indices = vec![0u8; TILE_SIZE * TILE_SIZE];
    // Index 0 resolves to transparent in the radar palette.
    png::encode_indexed(TILE_SIZE, TILE_SIZE, COLOR_TABLE.palette(), &indices)
        .expect("empty tile encoding cannot fail")
});

/// The cached empty (fully transparent) tile.
pub fn empty_tile() -> &'static [u8] {
    &EMPTY_TILE
}

/// Render one tile from an in-memory dataset.
pub fn render_tile(dataset: &RasterDataset, coord: &TileCoord) -> Result<Vec<u8>, RenderError> {
    let samples = extract::extract_tile(dataset, coord)?;

    let indices: Vec<u8> = samples.iter().map(|&v| dbz_to_index(v)).collect();

    png::encode_indexed(TILE_SIZE, TILE_SIZE, COLOR_TABLE.palette(), &indices)
        .map_err(RenderError::Encode)
}

/// Render one tile from the published raster artifact at `path`.
pub fn render_tile_at(path: &Path, coord: &TileCoord) -> Result<Vec<u8>, RenderError> {
    let dataset = read_raster(path)?;
    debug!(
        z = coord.z,
        x = coord.x,
        y = coord.y,
        width = dataset.width,
        height = dataset.height,
        "Rendering tile"
    );
    render_tile(&dataset, coord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_common::{latlon_to_tile, BoundingBox};
    use raster::NODATA;

    fn conus_dataset(value: f32) -> RasterDataset {
        RasterDataset {
            width: 140,
            height: 70,
            data: vec![value; 140 * 70],
            bounds: BoundingBox::new(-130.0, 20.0, -60.0, 55.0),
            nodata: NODATA,
        }
    }

    #[test]
    fn test_empty_tile_is_cached() {
        let a = empty_tile();
        let b = empty_tile();
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(&a[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_all_nodata_tile_matches_empty_tile() {
        // A tile rendered from pure nodata quantizes every pixel to
        // index 0, byte-identical to the cached empty tile.
        let ds = conus_dataset(NODATA);
        let coord = latlon_to_tile(38.0, -95.0, 6);
        let png = render_tile(&ds, &coord).unwrap();
        assert_eq!(png, empty_tile());
    }

    #[test]
    fn test_rendered_tile_differs_for_echo() {
        let ds = conus_dataset(45.0);
        let coord = latlon_to_tile(38.0, -95.0, 6);
        let png = render_tile(&ds, &coord).unwrap();
        assert_ne!(png, empty_tile());
    }

    #[test]
    fn test_outside_bounds_is_explicit() {
        let ds = conus_dataset(45.0);
        let coord = latlon_to_tile(48.0, 10.0, 6); // Europe
        assert!(matches!(
            render_tile(&ds, &coord),
            Err(RenderError::OutsideBounds)
        ));
    }

    #[test]
    fn test_render_from_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_radar.rst");
        raster::publish_atomic(&conus_dataset(30.0), &path).unwrap();

        let coord = latlon_to_tile(38.0, -95.0, 6);
        let png = render_tile_at(&path, &coord).unwrap();
        assert_ne!(png, empty_tile());

        // Missing artifact surfaces as a raster error for the caller to
        // map to the empty tile.
        let missing = dir.path().join("absent.rst");
        assert!(matches!(
            render_tile_at(&missing, &coord),
            Err(RenderError::Raster(_))
        ));
    }
}
