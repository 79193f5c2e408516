//! In-memory raster model and grid normalization.

use radar_common::BoundingBox;

use crate::error::{RasterError, Result};

/// Nodata sentinel written into published rasters. Reflectivity below
/// -90 dBZ is physically impossible; sources use values in that range
/// (-99, -999) to mark missing measurements.
pub const NODATA: f32 = -999.0;

/// Threshold below which a source value is treated as a missing-data
/// sentinel.
const SENTINEL_FLOOR: f32 = -90.0;

/// A single-band georeferenced raster in EPSG:4326.
///
/// Row 0 is the northernmost row; `data` is row-major `height` x `width`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDataset {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    pub bounds: BoundingBox,
    pub nodata: f32,
}

/// Affine mapping from pixel indices to geographic coordinates.
///
/// `x = origin_x + col * pixel_width`, `y = origin_y + row * pixel_height`
/// with `pixel_height` negative for north-up rasters. This is the contract
/// any raster-writing collaborator must record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Geographic coordinates of the top-left corner of a pixel.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }
}

impl RasterDataset {
    /// Build a normalized dataset from a decoded grid and its coordinate
    /// axes.
    ///
    /// Applies, in order: longitude normalization to [-180, 180), bounds
    /// computation, north-up orientation, and nodata sentinel replacement.
    pub fn from_grid(values: Vec<f32>, latitudes: &[f64], longitudes: &[f64]) -> Result<Self> {
        let width = longitudes.len();
        let height = latitudes.len();

        if width == 0 || height == 0 {
            return Err(RasterError::InvalidGrid("empty coordinate axis".into()));
        }
        if values.len() != width * height {
            return Err(RasterError::InvalidGrid(format!(
                "{} values for a {}x{} grid",
                values.len(),
                width,
                height
            )));
        }

        // Sources using the 0-360 longitude convention are remapped so
        // bounds come out in [-180, 180). The remap preserves relative
        // ordering of the remapped values.
        let longitudes: Vec<f64> = if longitudes.iter().any(|&v| v > 180.0) {
            longitudes
                .iter()
                .map(|&v| if v > 180.0 { v - 360.0 } else { v })
                .collect()
        } else {
            longitudes.to_vec()
        };

        let (west, east) = min_max(&longitudes);
        let (south, north) = min_max(latitudes);

        // Row 0 must be the northernmost row. A descending latitude axis
        // is already north-up; an ascending one gets its rows reversed,
        // which moves the first input row to the southern edge.
        let north_up = latitudes[0] > latitudes[height - 1] || height == 1;
        let mut data = if north_up {
            values
        } else {
            flip_rows(values, width, height)
        };

        for v in data.iter_mut() {
            if !v.is_finite() || *v < SENTINEL_FLOOR {
                *v = NODATA;
            }
        }

        Ok(Self {
            width,
            height,
            data,
            bounds: BoundingBox::new(west, south, east, north),
            nodata: NODATA,
        })
    }

    /// Derive the affine pixel-to-geographic transform from the bounds.
    pub fn geo_transform(&self) -> GeoTransform {
        GeoTransform {
            origin_x: self.bounds.west,
            origin_y: self.bounds.north,
            pixel_width: self.bounds.width() / self.width as f64,
            pixel_height: -self.bounds.height() / self.height as f64,
        }
    }

    /// Value at (col, row), or `None` outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }
}

fn min_max(axis: &[f64]) -> (f64, f64) {
    axis.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
        (min.min(v), max.max(v))
    })
}

fn flip_rows(values: Vec<f32>, width: usize, height: usize) -> Vec<f32> {
    let mut flipped = Vec::with_capacity(values.len());
    for row in (0..height).rev() {
        flipped.extend_from_slice(&values[row * width..(row + 1) * width]);
    }
    flipped
}
