//! Shared test utilities for the radar-tiles workspace.

pub mod grib2;

pub use grib2::{gzip_bytes, MosaicBuilder};
