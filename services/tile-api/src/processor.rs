//! Grid processing: decode a raw grid file, normalize it into a raster
//! dataset and publish it atomically.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use mosaic_grib2::{decode_mosaic, Grib2Error};
use raster::{publish_atomic, RasterDataset, RasterError};

/// Errors from one processing attempt. Caught at the watcher boundary;
/// a failure means "no update this cycle" and the previously published
/// raster stays authoritative.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to read grid file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode grid: {0}")]
    Decode(#[from] Grib2Error),

    #[error("failed to build or publish raster: {0}")]
    Raster(#[from] RasterError),
}

/// Process one raw grid file into the published raster artifact.
pub fn process(grid_path: &Path, latest_raster_path: &Path) -> Result<RasterDataset, ProcessError> {
    let bytes = std::fs::read(grid_path)?;
    let grid = decode_mosaic(&bytes)?;
    let dataset = RasterDataset::from_grid(grid.values, &grid.latitudes, &grid.longitudes)?;

    publish_atomic(&dataset, latest_raster_path)?;

    info!(
        source = %grid_path.display(),
        width = dataset.width,
        height = dataset.height,
        west = dataset.bounds.west,
        south = dataset.bounds.south,
        east = dataset.bounds.east,
        north = dataset.bounds.north,
        "Published raster"
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_grid_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = process(
            &dir.path().join("absent.grib2"),
            &dir.path().join("latest_radar.rst"),
        );
        assert!(matches!(result, Err(ProcessError::Io(_))));
    }

    #[test]
    fn test_corrupt_grid_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let grid_path = dir.path().join("reflectivity_20260807_120000.grib2");
        std::fs::write(&grid_path, b"definitely not a grib2 message").unwrap();

        let raster_path = dir.path().join("latest_radar.rst");
        let result = process(&grid_path, &raster_path);

        assert!(matches!(result, Err(ProcessError::Decode(_))));
        // A failed attempt must not leave a raster behind.
        assert!(!raster_path.exists());
    }

    #[test]
    fn test_failure_leaves_previous_raster_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let raster_path = dir.path().join("latest_radar.rst");

        // Publish a known-good raster first.
        let dataset = RasterDataset::from_grid(
            vec![20.0; 9],
            &[50.0, 49.0, 48.0],
            &[-100.0, -99.0, -98.0],
        )
        .unwrap();
        publish_atomic(&dataset, &raster_path).unwrap();

        let grid_path = dir.path().join("reflectivity_20260807_120200.grib2");
        std::fs::write(&grid_path, b"corrupt").unwrap();
        assert!(process(&grid_path, &raster_path).is_err());

        let kept = raster::read_raster(&raster_path).unwrap();
        assert_eq!(kept.data[0], 20.0);
    }
}
