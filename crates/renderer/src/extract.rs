//! Tile extraction: reproject a slice of the published raster into a
//! tile's Web Mercator footprint.
//!
//! Longitude is linear across a tile; latitude is not — each output row
//! sits at a uniform Mercator Y, so rows are mapped through the inverse
//! Mercator function before sampling. Sampling is bilinear; output pixels
//! outside the data (or adjacent to nodata) are NaN, which renders
//! transparent.

use radar_common::{TileCoord, TILE_SIZE};
use raster::RasterDataset;

use crate::RenderError;

const EARTH_RADIUS_M: f64 = 6378137.0;

/// Convert latitude to Web Mercator Y (meters).
pub fn lat_to_mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.to_radians();
    ((std::f64::consts::PI / 4.0) + (lat_rad / 2.0)).tan().ln() * EARTH_RADIUS_M
}

/// Convert Web Mercator Y (meters) back to latitude.
pub fn mercator_y_to_lat(y: f64) -> f64 {
    let y_normalized = y / EARTH_RADIUS_M;
    (2.0 * y_normalized.exp().atan() - std::f64::consts::PI / 2.0).to_degrees()
}

/// Extract the tile's footprint from the dataset as a TILE_SIZE x
/// TILE_SIZE f32 grid.
///
/// Returns `OutsideBounds` when the footprint does not intersect the
/// raster at all.
pub fn extract_tile(dataset: &RasterDataset, coord: &TileCoord) -> Result<Vec<f32>, RenderError> {
    let tile_bbox = coord.bounds();

    if !tile_bbox.intersects(&dataset.bounds) {
        return Err(RenderError::OutsideBounds);
    }

    let bounds = dataset.bounds;
    let lon_range = bounds.width();
    let lat_range = bounds.height();

    let max_merc_y = lat_to_mercator_y(tile_bbox.north);
    let min_merc_y = lat_to_mercator_y(tile_bbox.south);

    let mut output = vec![f32::NAN; TILE_SIZE * TILE_SIZE];

    for out_y in 0..TILE_SIZE {
        // Row centers are uniform in Mercator Y; convert to latitude.
        let y_ratio = (out_y as f64 + 0.5) / TILE_SIZE as f64;
        let merc_y = max_merc_y - y_ratio * (max_merc_y - min_merc_y);
        let lat = mercator_y_to_lat(merc_y);

        if lat < bounds.south || lat > bounds.north {
            continue;
        }

        let grid_y = (bounds.north - lat) / lat_range * dataset.height as f64;

        for out_x in 0..TILE_SIZE {
            let x_ratio = (out_x as f64 + 0.5) / TILE_SIZE as f64;
            let lon = tile_bbox.west + x_ratio * tile_bbox.width();

            if lon < bounds.west || lon > bounds.east {
                continue;
            }

            let grid_x = (lon - bounds.west) / lon_range * dataset.width as f64;

            if let Some(value) = sample_bilinear(dataset, grid_x, grid_y) {
                output[out_y * TILE_SIZE + out_x] = value;
            }
        }
    }

    Ok(output)
}

/// Bilinear sample at continuous grid coordinates. Returns `None` when
/// any of the four surrounding points is missing (NaN or nodata), so
/// coverage edges stay clean instead of interpolating against sentinels.
fn sample_bilinear(dataset: &RasterDataset, grid_x: f64, grid_y: f64) -> Option<f32> {
    // Grid coordinates are continuous over cells; shift to sample at
    // cell centers.
    let gx = (grid_x - 0.5).clamp(0.0, (dataset.width - 1) as f64);
    let gy = (grid_y - 0.5).clamp(0.0, (dataset.height - 1) as f64);

    let x1 = gx.floor() as usize;
    let y1 = gy.floor() as usize;
    let x2 = (x1 + 1).min(dataset.width - 1);
    let y2 = (y1 + 1).min(dataset.height - 1);

    let dx = (gx - x1 as f64) as f32;
    let dy = (gy - y1 as f64) as f32;

    let v11 = dataset.get(x1, y1)?;
    let v21 = dataset.get(x2, y1)?;
    let v12 = dataset.get(x1, y2)?;
    let v22 = dataset.get(x2, y2)?;

    let invalid =
        |v: f32| v.is_nan() || v == dataset.nodata;
    if invalid(v11) || invalid(v21) || invalid(v12) || invalid(v22) {
        return None;
    }

    let v1 = v11 * (1.0 - dx) + v21 * dx;
    let v2 = v12 * (1.0 - dx) + v22 * dx;
    Some(v1 * (1.0 - dy) + v2 * dy)
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
    fn test_mercator_roundtrip() {
        for lat in [-60.0, -10.0, 0.0, 33.3, 45.0, 70.0] {
            let back = mercator_y_to_lat(lat_to_mercator_y(lat));
            assert!((back - lat).abs() < 1e-9, "lat {} came back as {}", lat, back);
        }
    }

    #[test]
    fn test_tile_inside_data_is_fully_sampled() {
        let ds = conus_dataset(30.0);
        // A tile well inside CONUS.
        let coord = latlon_to_tile(38.0, -95.0, 6);
        let samples = extract_tile(&ds, &coord).unwrap();

        assert_eq!(samples.len(), TILE_SIZE * TILE_SIZE);
        assert!(samples.iter().all(|v| (v - 30.0).abs() < 1e-3));
    }

    #[test]
    fn test_tile_outside_data_errors() {
        let ds = conus_dataset(30.0);
        // A tile over Europe.
        let coord = latlon_to_tile(48.0, 10.0, 6);
        assert!(matches!(
            extract_tile(&ds, &coord),
            Err(RenderError::OutsideBounds)
        ));
    }

    #[test]
    fn test_partially_overlapping_tile_has_nan_margin() {
        let ds = conus_dataset(30.0);
        // Zoom 5 tiles are ~11 degrees wide; one centered just past the
        // west edge of the data straddles the boundary.
        let coord = latlon_to_tile(38.0, -130.5, 5);
        let samples = extract_tile(&ds, &coord).unwrap();

        let valid = samples.iter().filter(|v| !v.is_nan()).count();
        let nan = samples.iter().filter(|v| v.is_nan()).count();
        assert!(valid > 0, "some pixels must fall inside the data");
        assert!(nan > 0, "pixels past the data edge must be NaN");
    }

    #[test]
    fn test_nodata_regions_sample_as_nan() {
        let mut ds = conus_dataset(30.0);
        // Blank out the eastern half.
        for row in 0..ds.height {
            for col in ds.width / 2..ds.width {
                ds.data[row * ds.width + col] = NODATA;
            }
        }

        let west_tile = latlon_to_tile(38.0, -120.0, 6);
        let east_tile = latlon_to_tile(38.0, -70.0, 6);

        let west = extract_tile(&ds, &west_tile).unwrap();
        assert!(west.iter().all(|v| !v.is_nan()));

        let east = extract_tile(&ds, &east_tile).unwrap();
        assert!(east.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_gradient_preserved_north_south() {
        // Values increase from north to south row by row.
        let mut ds = conus_dataset(0.0);
        for row in 0..ds.height {
            for col in 0..ds.width {
                ds.data[row * ds.width + col] = row as f32;
            }
        }

        let coord = latlon_to_tile(38.0, -95.0, 6);
        let samples = extract_tile(&ds, &coord).unwrap();

        // The top (northern) output row must sample smaller values than
        // the bottom (southern) row.
        let top_avg: f32 = samples[..TILE_SIZE].iter().sum::<f32>() / TILE_SIZE as f32;
        let bottom_avg: f32 =
            samples[(TILE_SIZE - 1) * TILE_SIZE..].iter().sum::<f32>() / TILE_SIZE as f32;
        assert!(top_avg < bottom_avg);
    }
}
