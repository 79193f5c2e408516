//! On-disk raster artifact encoding.
//!
//! The artifact is a chunked container in the PNG mold: an 8-byte
//! signature followed by length-prefixed chunks, each carrying a CRC-32
//! over its type and payload.
//!
//! Chunks, in order:
//! - `HDR ` — version, dimensions, bounds, nodata, CRS EPSG code and the
//!   affine geotransform.
//! - `DATA` — the f32 band, little-endian, zlib-compressed.
//! - `END ` — empty terminator; a reader treats its absence as a
//!   truncated artifact.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use radar_common::BoundingBox;

use crate::dataset::RasterDataset;
use crate::error::{RasterError, Result};

/// Artifact signature: high-bit byte to catch text-mode corruption, the
/// format tag, then CR LF SUB as in PNG.
const SIGNATURE: [u8; 8] = [0x89, b'R', b'R', b'S', b'T', 0x0D, 0x0A, 0x1A];

const FORMAT_VERSION: u8 = 1;
const EPSG_WGS84: u32 = 4326;

const HEADER_LEN: usize = 1 + 4 + 4 + 8 * 4 + 4 + 4 + 8 * 4;

/// Encode a dataset into artifact bytes.
pub fn encode_raster(dataset: &RasterDataset) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&SIGNATURE);

    // HDR chunk.
    let gt = dataset.geo_transform();
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.push(FORMAT_VERSION);
    header.extend_from_slice(&(dataset.width as u32).to_be_bytes());
    header.extend_from_slice(&(dataset.height as u32).to_be_bytes());
    header.extend_from_slice(&dataset.bounds.west.to_be_bytes());
    header.extend_from_slice(&dataset.bounds.south.to_be_bytes());
    header.extend_from_slice(&dataset.bounds.east.to_be_bytes());
    header.extend_from_slice(&dataset.bounds.north.to_be_bytes());
    header.extend_from_slice(&dataset.nodata.to_be_bytes());
    header.extend_from_slice(&EPSG_WGS84.to_be_bytes());
    header.extend_from_slice(&gt.origin_x.to_be_bytes());
    header.extend_from_slice(&gt.origin_y.to_be_bytes());
    header.extend_from_slice(&gt.pixel_width.to_be_bytes());
    header.extend_from_slice(&gt.pixel_height.to_be_bytes());
    write_chunk(&mut out, b"HDR ", &header);

    // DATA chunk: little-endian f32 band, zlib-compressed.
    let mut band = Vec::with_capacity(dataset.data.len() * 4);
    for v in &dataset.data {
        band.extend_from_slice(&v.to_le_bytes());
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(&band)
        .map_err(|e| RasterError::InvalidArtifact(format!("band compression failed: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| RasterError::InvalidArtifact(format!("band compression failed: {}", e)))?;
    write_chunk(&mut out, b"DATA", &compressed);

    write_chunk(&mut out, b"END ", &[]);

    Ok(out)
}

/// Read a raster artifact back into a dataset.
pub fn read_raster(path: &Path) -> Result<RasterDataset> {
    let bytes = fs::read(path)?;
    decode_raster(&bytes)
}

/// Decode artifact bytes into a dataset.
pub fn decode_raster(bytes: &[u8]) -> Result<RasterDataset> {
    if bytes.len() < SIGNATURE.len() || bytes[..SIGNATURE.len()] != SIGNATURE {
        return Err(RasterError::InvalidArtifact("bad signature".into()));
    }

    let mut header: Option<Vec<u8>> = None;
    let mut band: Option<Vec<u8>> = None;
    let mut terminated = false;

    let mut offset = SIGNATURE.len();
    while offset < bytes.len() {
        let (chunk_type, payload, next) = read_chunk(bytes, offset)?;
        match &chunk_type {
            b"HDR " => header = Some(payload),
            b"DATA" => band = Some(payload),
            b"END " => {
                terminated = true;
                break;
            }
            // Unknown chunk types are skipped for forward compatibility.
            _ => {}
        }
        offset = next;
    }

    if !terminated {
        return Err(RasterError::InvalidArtifact(
            "missing terminator chunk (truncated artifact)".into(),
        ));
    }

    let header = header.ok_or_else(|| RasterError::InvalidArtifact("missing HDR chunk".into()))?;
    let band = band.ok_or_else(|| RasterError::InvalidArtifact("missing DATA chunk".into()))?;

    if header.len() < HEADER_LEN {
        return Err(RasterError::InvalidArtifact(format!(
            "header is {} bytes, expected {}",
            header.len(),
            HEADER_LEN
        )));
    }
    if header[0] != FORMAT_VERSION {
        return Err(RasterError::InvalidArtifact(format!(
            "unsupported format version {}",
            header[0]
        )));
    }

    let width = u32::from_be_bytes(header[1..5].try_into().unwrap()) as usize;
    let height = u32::from_be_bytes(header[5..9].try_into().unwrap()) as usize;
    let west = f64::from_be_bytes(header[9..17].try_into().unwrap());
    let south = f64::from_be_bytes(header[17..25].try_into().unwrap());
    let east = f64::from_be_bytes(header[25..33].try_into().unwrap());
    let north = f64::from_be_bytes(header[33..41].try_into().unwrap());
    let nodata = f32::from_be_bytes(header[41..45].try_into().unwrap());
    let epsg = u32::from_be_bytes(header[45..49].try_into().unwrap());

    if epsg != EPSG_WGS84 {
        return Err(RasterError::InvalidArtifact(format!(
            "unsupported CRS EPSG:{}",
            epsg
        )));
    }

    let mut band_bytes = Vec::with_capacity(width * height * 4);
    ZlibDecoder::new(&band[..])
        .read_to_end(&mut band_bytes)
        .map_err(|e| RasterError::InvalidArtifact(format!("band decompression failed: {}", e)))?;

    if band_bytes.len() != width * height * 4 {
        return Err(RasterError::InvalidArtifact(format!(
            "band holds {} bytes, expected {} for {}x{}",
            band_bytes.len(),
            width * height * 4,
            width,
            height
        )));
    }

    let data: Vec<f32> = band_bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(RasterDataset {
        width,
        height,
        data,
        bounds: BoundingBox::new(west, south, east, north),
        nodata,
    })
}

/// Append one length-prefixed, CRC-trailed chunk.
fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(payload);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(payload);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Read the chunk at `offset`, returning (type, payload, next offset).
fn read_chunk(bytes: &[u8], offset: usize) -> Result<([u8; 4], Vec<u8>, usize)> {
    if offset + 8 > bytes.len() {
        return Err(RasterError::InvalidArtifact(
            "truncated chunk header".into(),
        ));
    }

    let length = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
    let chunk_type: [u8; 4] = bytes[offset + 4..offset + 8].try_into().unwrap();

    let payload_start = offset + 8;
    let crc_start = payload_start + length;
    if crc_start + 4 > bytes.len() {
        return Err(RasterError::InvalidArtifact("truncated chunk body".into()));
    }

    let payload = &bytes[payload_start..crc_start];
    let stored_crc = u32::from_be_bytes(bytes[crc_start..crc_start + 4].try_into().unwrap());

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&chunk_type);
    hasher.update(payload);
    if hasher.finalize() != stored_crc {
        let name: &'static str = match &chunk_type {
            b"HDR " => "HDR",
            b"DATA" => "DATA",
            b"END " => "END",
            _ => "unknown",
        };
        return Err(RasterError::ChecksumMismatch(name));
    }

    Ok((chunk_type, payload.to_vec(), crc_start + 4))
}
