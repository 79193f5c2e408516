//! Georeferenced raster handling for the radar pipeline.
//!
//! Three concerns live here:
//! - [`dataset`]: the in-memory raster model plus the normalization rules
//!   that turn a decoded mosaic grid into a north-up, bounds-tagged raster.
//! - [`artifact`]: the on-disk single-band raster container (chunked,
//!   deflate-compressed, CRC-checked).
//! - [`publish`]: atomic publication of the "latest raster" artifact.

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod publish;

pub use artifact::{encode_raster, read_raster};
pub use dataset::{GeoTransform, RasterDataset, NODATA};
pub use error::{RasterError, Result};
pub use publish::publish_atomic;
