//! Indexed PNG encoding (color type 3).
//!
//! Radar tiles draw from a fixed 256-color palette, so the indexed
//! encoder is the only path needed: 1 byte per pixel into the IDAT
//! stream, palette in PLTE, per-entry alpha in tRNS.

use std::io::Write;

use crate::colormap::Color;

/// Encode an indexed PNG from a palette and per-pixel palette indices.
pub fn encode_indexed(
    width: usize,
    height: usize,
    palette: &[Color],
    indices: &[u8],
) -> Result<Vec<u8>, String> {
    if indices.len() != width * height {
        return Err(format!(
            "{} indices for a {}x{} image",
            indices.len(),
            width,
            height
        ));
    }
    if palette.is_empty() || palette.len() > 256 {
        return Err(format!("palette has {} entries", palette.len()));
    }

    let mut png = Vec::new();

    // PNG signature.
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    // IHDR chunk.
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth: 8 bits per palette index
    ihdr.push(3); // color type: indexed
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr);

    // PLTE chunk.
    let mut plte = Vec::with_capacity(palette.len() * 3);
    for c in palette {
        plte.push(c.r);
        plte.push(c.g);
        plte.push(c.b);
    }
    write_chunk(&mut png, b"PLTE", &plte);

    // tRNS chunk, only when some entry is not fully opaque.
    if palette.iter().any(|c| c.a < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c.a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    // IDAT chunk: each scanline prefixed with filter type 0.
    let mut raw = Vec::with_capacity(height * (1 + width));
    for y in 0..height {
        raw.push(0);
        raw.extend_from_slice(&indices[y * width..(y + 1) * width]);
    }
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder
        .write_all(&raw)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    let idat = encoder
        .finish()
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat);

    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Write a PNG chunk: length, type, data, CRC-32 over type + data.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}
