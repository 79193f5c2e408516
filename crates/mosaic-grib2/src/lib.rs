//! GRIB2 reader for regular latitude/longitude radar mosaic grids
//! (WMO FM 92 GRIB Edition 2).
//!
//! This is not a general GRIB2 implementation. It reads exactly what a
//! merged radar mosaic carries: one message, grid definition template 3.0
//! (lat/lon), data representation template 5.0 (simple packing), and an
//! optional bitmap. The decoded grid comes back as a row-major f32 array
//! with reconstructed 1D latitude/longitude axes; bitmap-missing points
//! are NaN.

pub mod sections;
pub mod unpack;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use sections::{
    has_section, parse_bitmap, parse_data_representation, parse_data_section,
    parse_grid_definition, parse_identification, parse_indicator,
};

/// Errors raised while reading a GRIB2 mosaic.
#[derive(Debug, Error)]
pub enum Grib2Error {
    #[error("invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("unsupported template: {0}")]
    UnsupportedTemplate(String),

    #[error("data unpacking failed: {0}")]
    Unpacking(String),

    #[error("message contains no data field")]
    MissingData,
}

/// A decoded mosaic grid: values plus the coordinate axes that position it.
#[derive(Debug, Clone)]
pub struct MosaicGrid {
    /// Row-major values, `height` rows of `width` columns. Missing points
    /// (bitmap gaps) are NaN.
    pub values: Vec<f32>,
    pub width: usize,
    pub height: usize,
    /// Latitude of each row, in the order the rows are stored.
    pub latitudes: Vec<f64>,
    /// Longitude of each column. May use the 0–360 convention; callers
    /// normalize.
    pub longitudes: Vec<f64>,
    /// Reference time from the identification section.
    pub reference_time: DateTime<Utc>,
}

/// Decode a single-message GRIB2 mosaic from raw (already decompressed)
/// bytes.
pub fn decode_mosaic(data: &[u8]) -> Result<MosaicGrid, Grib2Error> {
    let indicator = parse_indicator(data)?;
    let identification = parse_identification(data)?;
    let grid = parse_grid_definition(data)?;

    // A message without data representation or data sections has nothing
    // to rasterize.
    if !has_section(data, 5) || !has_section(data, 7) {
        return Err(Grib2Error::MissingData);
    }
    let repr = parse_data_representation(data)?;
    let packed = parse_data_section(data)?;
    if repr.num_data_points == 0 {
        return Err(Grib2Error::MissingData);
    }

    let bitmap = parse_bitmap(data)?;

    debug!(
        discipline = indicator.discipline,
        ni = grid.ni,
        nj = grid.nj,
        num_points = repr.num_data_points,
        bits_per_value = repr.bits_per_value,
        has_bitmap = bitmap.is_some(),
        "Decoding GRIB2 mosaic"
    );

    let values = unpack::unpack_simple(
        &packed,
        repr.num_data_points,
        repr.bits_per_value,
        repr.reference_value,
        repr.binary_scale_factor,
        repr.decimal_scale_factor,
        bitmap.as_deref(),
    )?;

    let expected = grid.ni * grid.nj;
    if values.len() != expected {
        return Err(Grib2Error::InvalidFormat(format!(
            "grid is {}x{} ({} points) but data section decoded {} values",
            grid.ni,
            grid.nj,
            expected,
            values.len()
        )));
    }

    Ok(MosaicGrid {
        values,
        width: grid.ni,
        height: grid.nj,
        latitudes: axis(grid.first_lat, grid.last_lat, grid.nj),
        longitudes: axis(grid.first_lon, grid.last_lon, grid.ni),
        reference_time: identification.reference_time,
    })
}

/// Evenly spaced coordinate axis from the first/last grid point values.
/// Handles both ascending and descending axes.
fn axis(first: f64, last: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![first];
    }
    let step = (last - first) / (n - 1) as f64;
    (0..n).map(|i| first + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_descending() {
        let lats = axis(54.0, 50.0, 5);
        assert_eq!(lats.len(), 5);
        assert!((lats[0] - 54.0).abs() < 1e-9);
        assert!((lats[4] - 50.0).abs() < 1e-9);
        assert!(lats.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_axis_single_point() {
        assert_eq!(axis(10.0, 10.0, 1), vec![10.0]);
    }
}
