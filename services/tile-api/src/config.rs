//! Runtime configuration for the tile server.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use radar_common::BoundingBox;

/// Default remote mosaic: the latest MRMS reflectivity-at-lowest-altitude
/// composite, published as a gzipped GRIB2 file.
pub const DEFAULT_SOURCE_URL: &str =
    "https://mrms.ncep.noaa.gov/2D/ReflectivityAtLowestAltitude/MRMS_ReflectivityAtLowestAltitude.latest.grib2.gz";

/// Filename of the published raster artifact inside the data directory.
pub const LATEST_RASTER_FILENAME: &str = "latest_radar.rst";

/// Resolved service configuration, built once at startup and shared by
/// every task and handler.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote mosaic URL.
    pub source_url: String,
    /// Directory holding retained grid files and the published raster.
    pub data_dir: PathBuf,
    /// Base poll interval; backoff resets to this on success.
    pub poll_interval: Duration,
    /// Raw grid files retained on disk.
    pub max_grid_files: usize,
    /// Timeout applied to remote requests.
    pub request_timeout: Duration,
    /// Static geographic extent of the mosaic, reported by the metadata
    /// endpoint.
    pub bounds: BoundingBox,
}

impl Config {
    /// Path of the single published raster artifact.
    pub fn latest_raster_path(&self) -> PathBuf {
        self.data_dir.join(LATEST_RASTER_FILENAME)
    }

    /// Path for a raw grid file. The capture time goes into the filename
    /// so lexical and temporal ordering coincide.
    pub fn grid_file_path(&self, captured_at: &DateTime<Utc>) -> PathBuf {
        self.data_dir.join(format!(
            "reflectivity_{}.grib2",
            captured_at.format("%Y%m%d_%H%M%S")
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            poll_interval: Duration::from_secs(120),
            max_grid_files: 5,
            request_timeout: Duration::from_secs(60),
            // CONUS mosaic coverage.
            bounds: BoundingBox::new(-130.0, 20.0, -60.0, 55.0),
        }
    }
}
