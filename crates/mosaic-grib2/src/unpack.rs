//! Simple-packing (template 5.0) data unpacking.
//!
//! Unpacking formula:
//! `value = (R + packed * 2^E) * 10^-D`
//! where R is the reference value, E the binary scale factor and D the
//! decimal scale factor.

use crate::Grib2Error;

/// Unpack simple-packed data into f32 values.
///
/// When a bitmap is present, the packed stream carries values only for
/// points whose bitmap bit is set; cleared bits produce NaN and consume
/// no packed bits.
pub fn unpack_simple(
    packed: &[u8],
    num_points: u32,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&[u8]>,
) -> Result<Vec<f32>, Grib2Error> {
    let num_points = num_points as usize;

    if bits_per_value == 0 {
        // A constant field: every present point is the reference value.
        let mut values = vec![reference_value; num_points];
        if let Some(bm) = bitmap {
            for (i, v) in values.iter_mut().enumerate() {
                if !bitmap_bit(bm, i) {
                    *v = f32::NAN;
                }
            }
        }
        return Ok(values);
    }

    if bits_per_value > 32 {
        return Err(Grib2Error::Unpacking(format!(
            "unsupported bits per value: {}",
            bits_per_value
        )));
    }

    let binary_scale = 2.0_f32.powi(binary_scale_factor as i32);
    let decimal_scale = 10.0_f32.powi(-(decimal_scale_factor as i32));
    let bits = bits_per_value as usize;

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0usize;

    for i in 0..num_points {
        if let Some(bm) = bitmap {
            if !bitmap_bit(bm, i) {
                values.push(f32::NAN);
                continue;
            }
        }

        let raw = extract_bits(packed, bit_position, bits).ok_or_else(|| {
            Grib2Error::Unpacking(format!(
                "packed data exhausted at point {} of {}",
                i, num_points
            ))
        })?;
        bit_position += bits;

        values.push((reference_value + raw as f32 * binary_scale) * decimal_scale);
    }

    Ok(values)
}

/// Whether the bitmap marks point `i` as present. Bits are MSB-first
/// within each octet.
fn bitmap_bit(bitmap: &[u8], i: usize) -> bool {
    let byte_idx = i / 8;
    let bit_idx = 7 - (i % 8);
    match bitmap.get(byte_idx) {
        Some(byte) => (byte >> bit_idx) & 1 == 1,
        // A truncated bitmap treats trailing points as present, matching
        // writers that omit padding octets.
        None => true,
    }
}

/// Extract `num_bits` bits starting at `start_bit` as a big-endian u32.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Option<u32> {
    if num_bits == 0 || num_bits > 32 {
        return None;
    }

    let mut result = 0u32;
    for i in 0..num_bits {
        let absolute = start_bit + i;
        let byte = *data.get(absolute / 8)?;
        let bit = (byte >> (7 - (absolute % 8))) & 1;
        result = (result << 1) | bit as u32;
    }

    Some(result)
}
