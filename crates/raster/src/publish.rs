//! Atomic publication of the latest raster artifact.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::artifact::encode_raster;
use crate::dataset::RasterDataset;
use crate::error::{RasterError, Result};

/// Publish a dataset to `path` atomically.
///
/// The artifact is written to a temporary file in the same directory and
/// renamed over the destination, so a concurrent reader opening `path`
/// sees either the previous complete artifact or the new one, never a
/// partial write. If anything fails after the temporary file is created,
/// it is removed and the previously published artifact is left untouched.
pub fn publish_atomic(dataset: &RasterDataset, path: &Path) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        RasterError::InvalidArtifact(format!("publish path {} has no parent", path.display()))
    })?;

    let bytes = encode_raster(dataset)?;

    // NamedTempFile removes the file on drop, which covers every error
    // path below until persist() takes ownership.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| RasterError::Io(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Published raster artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::read_raster;
    use crate::dataset::NODATA;
    use radar_common::BoundingBox;

    fn constant_dataset(value: f32) -> RasterDataset {
        RasterDataset {
            width: 64,
            height: 48,
            data: vec![value; 64 * 48],
            bounds: BoundingBox::new(-130.0, 20.0, -60.0, 55.0),
            nodata: NODATA,
        }
    }

    #[test]
    fn test_publish_creates_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_radar.rst");

        publish_atomic(&constant_dataset(12.5), &path).unwrap();

        let back = read_raster(&path).unwrap();
        assert_eq!(back.data[0], 12.5);
    }

    #[test]
    fn test_publish_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_radar.rst");

        publish_atomic(&constant_dataset(1.0), &path).unwrap();
        publish_atomic(&constant_dataset(2.0), &path).unwrap();

        let back = read_raster(&path).unwrap();
        assert_eq!(back.data[0], 2.0);
    }

    #[test]
    fn test_publish_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_radar.rst");

        publish_atomic(&constant_dataset(5.0), &path).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("latest_radar.rst")]);
    }
}
