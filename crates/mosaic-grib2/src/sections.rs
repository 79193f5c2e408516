//! GRIB2 section parsing.
//!
//! A GRIB2 message is a sequence of length-prefixed sections. Section 0
//! (indicator) is fixed at 16 bytes; every later section starts with a
//! 4-byte big-endian length and a 1-byte section number. Sections needed
//! here: 1 (identification), 3 (grid definition), 5 (data representation),
//! 6 (bitmap, optional) and 7 (data).

use crate::Grib2Error;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

const MICRODEG: f64 = 1e-6;

/// Section 0: Indicator.
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification.
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub reference_time: DateTime<Utc>,
}

/// Section 3: Grid definition, template 3.0 (regular lat/lon).
///
/// Coordinates are converted from microdegrees to degrees at parse time.
#[derive(Debug, Clone)]
pub struct GridDefinition {
    /// Points along a parallel (columns).
    pub ni: usize,
    /// Points along a meridian (rows).
    pub nj: usize,
    pub first_lat: f64,
    pub first_lon: f64,
    pub last_lat: f64,
    pub last_lon: f64,
    pub scanning_mode: u8,
}

/// Section 5: Data representation, template 5.0 (simple packing).
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

/// Parse section 0 at the start of the message.
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "message shorter than indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "missing GRIB magic bytes".to_string(),
        ));
    }

    // Octet 7: discipline, octet 8: edition, octets 9-16: message length.
    let discipline = data[6];
    let edition = data[7];
    let message_length = u64::from_be_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);

    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "expected GRIB edition 2, got {}",
            edition
        )));
    }

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse section 1, located immediately after the indicator.
pub fn parse_identification(data: &[u8]) -> Result<Identification, Grib2Error> {
    let offset = find_section(data, 1)?;
    let sec = &data[offset..];

    if sec.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: "not enough data".to_string(),
        });
    }

    // Skip 4-byte length + section number.
    let body = &sec[5..];
    let center = u16::from_be_bytes([body[0], body[1]]);

    let year = u16::from_be_bytes([body[7], body[8]]);
    let month = body[9];
    let day = body[10];
    let hour = body[11];
    let minute = body[12];
    let second = body[13];

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "invalid reference time {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center,
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
    })
}

/// Parse section 3 as template 3.0 (regular latitude/longitude grid).
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition, Grib2Error> {
    let offset = find_section(data, 3)?;
    let sec = &data[offset..];

    if sec.len() < 72 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "not enough data".to_string(),
        });
    }

    let template = u16::from_be_bytes([sec[12], sec[13]]);
    if template != 0 {
        return Err(Grib2Error::UnsupportedTemplate(format!(
            "grid definition template 3.{} (only 3.0 lat/lon is supported)",
            template
        )));
    }

    // Template 3.0 body, offsets relative to the template start at byte 14:
    //   16-19  Ni, 20-23  Nj
    //   32-35  La1, 36-39  Lo1 (microdegrees)
    //   41-44  La2, 45-48  Lo2 (microdegrees)
    //   57     scanning mode flags
    let gd = &sec[14..];
    if gd.len() < 58 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("template 3.0 needs 58 bytes, got {}", gd.len()),
        });
    }

    let ni = u32::from_be_bytes([gd[16], gd[17], gd[18], gd[19]]) as usize;
    let nj = u32::from_be_bytes([gd[20], gd[21], gd[22], gd[23]]) as usize;

    if ni == 0 || nj == 0 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("degenerate grid {}x{}", ni, nj),
        });
    }

    let la1 = i32::from_be_bytes([gd[32], gd[33], gd[34], gd[35]]);
    let lo1 = i32::from_be_bytes([gd[36], gd[37], gd[38], gd[39]]);
    let la2 = i32::from_be_bytes([gd[41], gd[42], gd[43], gd[44]]);
    let lo2 = i32::from_be_bytes([gd[45], gd[46], gd[47], gd[48]]);
    let scanning_mode = gd[57];

    Ok(GridDefinition {
        ni,
        nj,
        first_lat: la1 as f64 * MICRODEG,
        first_lon: lo1 as f64 * MICRODEG,
        last_lat: la2 as f64 * MICRODEG,
        last_lon: lo2 as f64 * MICRODEG,
        scanning_mode,
    })
}

/// Parse section 5 as template 5.0 (simple packing).
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    let offset = find_section(data, 5)?;
    let sec = &data[offset..];

    if sec.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "not enough data".to_string(),
        });
    }

    let num_data_points = u32::from_be_bytes([sec[5], sec[6], sec[7], sec[8]]);
    let template = u16::from_be_bytes([sec[9], sec[10]]);
    if template != 0 {
        return Err(Grib2Error::UnsupportedTemplate(format!(
            "data representation template 5.{} (only 5.0 simple packing is supported)",
            template
        )));
    }

    // Template 5.0 body starts at offset 11:
    //   0-3  reference value (IEEE f32)
    //   4-5  binary scale factor E
    //   6-7  decimal scale factor D
    //   8    bits per packed value
    let body = &sec[11..];
    let reference_value = f32::from_be_bytes([body[0], body[1], body[2], body[3]]);
    let binary_scale_factor = i16::from_be_bytes([body[4], body[5]]);
    let decimal_scale_factor = i16::from_be_bytes([body[6], body[7]]);
    let bits_per_value = body[8];

    Ok(DataRepresentation {
        num_data_points,
        reference_value,
        binary_scale_factor,
        decimal_scale_factor,
        bits_per_value,
    })
}

/// Parse section 6. Returns `None` when the bitmap indicator says no
/// bitmap applies (255).
pub fn parse_bitmap(data: &[u8]) -> Result<Option<Bytes>, Grib2Error> {
    let offset = match find_section(data, 6) {
        Ok(o) => o,
        // Some writers omit section 6 entirely.
        Err(_) => return Ok(None),
    };
    let sec = &data[offset..];

    if sec.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "not enough data".to_string(),
        });
    }

    let length = u32::from_be_bytes([sec[0], sec[1], sec[2], sec[3]]) as usize;
    let indicator = sec[5];

    if indicator == 255 {
        return Ok(None);
    }

    if length > sec.len() {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "section length exceeds available data".to_string(),
        });
    }

    Ok(Some(Bytes::copy_from_slice(&sec[6..length])))
}

/// Parse section 7 and return the packed payload.
pub fn parse_data_section(data: &[u8]) -> Result<Bytes, Grib2Error> {
    let offset = find_section(data, 7)?;
    let sec = &data[offset..];

    if sec.len() < 5 {
        return Err(Grib2Error::InvalidSection {
            section: 7,
            reason: "not enough data".to_string(),
        });
    }

    let length = u32::from_be_bytes([sec[0], sec[1], sec[2], sec[3]]) as usize;
    if length < 5 || length > sec.len() {
        return Err(Grib2Error::InvalidSection {
            section: 7,
            reason: "section length exceeds available data".to_string(),
        });
    }

    Ok(Bytes::copy_from_slice(&sec[5..length]))
}

/// Whether the message carries a section with this number.
pub fn has_section(data: &[u8], section_num: u8) -> bool {
    find_section(data, section_num).is_ok()
}

/// Walk the section chain looking for a section number.
fn find_section(data: &[u8], section_num: u8) -> Result<usize, Grib2Error> {
    let mut offset = 16; // after section 0

    loop {
        if offset + 5 > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "section not found".to_string(),
            });
        }

        // "7777" marks the end of the message.
        if &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "reached end of message".to_string(),
            });
        }

        let length = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;

        if length < 5 || offset + length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "invalid section length".to_string(),
            });
        }

        if data[offset + 4] == section_num {
            return Ok(offset);
        }

        offset += length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_rejects_short_input() {
        assert!(parse_indicator(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_indicator_rejects_bad_magic() {
        let mut data = [0u8; 16];
        data[0..4].copy_from_slice(b"BIRG");
        assert!(parse_indicator(&data).is_err());
    }

    #[test]
    fn test_indicator_rejects_edition_1() {
        let mut data = [0u8; 16];
        data[0..4].copy_from_slice(b"GRIB");
        data[7] = 1;
        assert!(matches!(
            parse_indicator(&data),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_find_section_walks_chain() {
        // Indicator + a fake 6-byte section 1 + a fake 6-byte section 3.
        let mut data = Vec::new();
        data.extend_from_slice(b"GRIB");
        data.extend_from_slice(&[0, 0]);
        data.push(209);
        data.push(2);
        data.extend_from_slice(&30u64.to_be_bytes());
        data.extend_from_slice(&6u32.to_be_bytes());
        data.push(1);
        data.push(0);
        data.extend_from_slice(&6u32.to_be_bytes());
        data.push(3);
        data.push(0);

        assert_eq!(find_section(&data, 1).unwrap(), 16);
        assert_eq!(find_section(&data, 3).unwrap(), 22);
        assert!(find_section(&data, 5).is_err());
    }
}
