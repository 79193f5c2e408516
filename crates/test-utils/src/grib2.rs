//! Synthetic GRIB2 message builder for tests.
//!
//! Builds minimal but structurally valid single-message GRIB2 files:
//! sections 0, 1, 3 (template 3.0), 5 (template 5.0), 6 and 7. NaN
//! values in the input data become bitmap gaps.

use std::io::Write;

/// Builder for synthetic mosaic messages.
pub struct MosaicBuilder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    ni: u32,
    nj: u32,
    la1: i32,
    lo1: i32,
    la2: i32,
    lo2: i32,
    scanning_mode: u8,
    data_values: Vec<f32>,
    omit_data_sections: bool,
}

impl MosaicBuilder {
    /// Defaults modeled on a merged-reflectivity CONUS mosaic: north-up
    /// scan, 0-360 longitude convention.
    pub fn new_mosaic() -> Self {
        let ni = 20;
        let nj = 15;
        Self {
            discipline: 209,
            center: 161,
            year: 2026,
            month: 8,
            day: 7,
            hour: 12,
            minute: 30,
            second: 0,
            ni,
            nj,
            la1: 54_995_000,  // 54.995 N
            lo1: 230_005_000, // 230.005 E = -129.995 W
            la2: 40_005_000,
            lo2: 249_995_000,
            scanning_mode: 0b0000_0000, // +i, -j: north to south
            data_values: vec![0.0; (ni * nj) as usize],
            omit_data_sections: false,
        }
    }

    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    /// First/last grid point coordinates in microdegrees.
    pub fn with_corners(mut self, la1: i32, lo1: i32, la2: i32, lo2: i32) -> Self {
        self.la1 = la1;
        self.lo1 = lo1;
        self.la2 = la2;
        self.lo2 = lo2;
        self
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), (self.ni * self.nj) as usize);
        self.data_values = data;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    /// Drop sections 5-7, leaving a message with no data field.
    pub fn without_data_sections(mut self) -> Self {
        self.omit_data_sections = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let section1 = self.build_section1();
        let section3 = self.build_section3();
        let (section5, section6, section7) = self.build_data_sections();

        let mut body = Vec::new();
        body.extend_from_slice(&section1);
        body.extend_from_slice(&section3);
        if !self.omit_data_sections {
            body.extend_from_slice(&section5);
            body.extend_from_slice(&section6);
            body.extend_from_slice(&section7);
        }

        let message_length = 16 + body.len() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        message.extend_from_slice(&body);
        message.extend_from_slice(b"7777");

        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);

        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // sub-center
        section.push(2); // master table version
        section.push(1); // local table version
        section.push(0); // significance of reference time

        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(self.minute);
        section.push(self.second);

        section.push(0); // production status
        section.push(0); // type of data

        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&(14u32 + 58).to_be_bytes());
        section.push(3);

        section.push(0); // source of grid definition
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0); // octets for optional list
        section.push(0); // interpretation of optional list
        section.extend_from_slice(&0u16.to_be_bytes()); // template 3.0

        // Template 3.0 body (58 bytes).
        section.push(6); // shape of Earth
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // basic angle
        section.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // subdivisions

        section.extend_from_slice(&self.la1.to_be_bytes());
        section.extend_from_slice(&self.lo1.to_be_bytes());
        section.push(48); // resolution/component flags
        section.extend_from_slice(&self.la2.to_be_bytes());
        section.extend_from_slice(&self.lo2.to_be_bytes());

        let di = if self.ni > 1 {
            (self.lo2 - self.lo1).unsigned_abs() / (self.ni - 1)
        } else {
            0
        };
        let dj = if self.nj > 1 {
            (self.la2 - self.la1).unsigned_abs() / (self.nj - 1)
        } else {
            0
        };
        section.extend_from_slice(&di.to_be_bytes());
        section.extend_from_slice(&dj.to_be_bytes());
        section.push(self.scanning_mode);

        section
    }

    /// Sections 5, 6 and 7: simple packing with 16 bits per value; NaN
    /// input values become bitmap gaps.
    fn build_data_sections(&self) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let num_points = (self.ni * self.nj) as usize;
        let present: Vec<f32> = self
            .data_values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        let has_gaps = present.len() < num_points;

        let (min_val, max_val) = present
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            });
        let reference_value = if present.is_empty() { 0.0 } else { min_val };
        let range = if present.is_empty() {
            0.0
        } else {
            max_val - min_val
        };

        let bits_per_value: u8 = if range == 0.0 { 0 } else { 16 };
        let binary_scale_factor: i16 = if range == 0.0 {
            0
        } else {
            (range / 65535.0).log2().ceil() as i16
        };

        // Section 5.
        let mut section5 = Vec::new();
        section5.extend_from_slice(&21u32.to_be_bytes());
        section5.push(5);
        section5.extend_from_slice(&(num_points as u32).to_be_bytes());
        section5.extend_from_slice(&0u16.to_be_bytes()); // template 5.0
        section5.extend_from_slice(&reference_value.to_be_bytes());
        section5.extend_from_slice(&binary_scale_factor.to_be_bytes());
        section5.extend_from_slice(&0i16.to_be_bytes()); // decimal scale
        section5.push(bits_per_value);
        section5.push(0); // original field type

        // Section 6.
        let mut section6 = Vec::new();
        if has_gaps {
            let bitmap_len = num_points.div_ceil(8);
            section6.extend_from_slice(&((6 + bitmap_len) as u32).to_be_bytes());
            section6.push(6);
            section6.push(0); // bitmap attached
            let mut bitmap = vec![0u8; bitmap_len];
            for (i, v) in self.data_values.iter().enumerate() {
                if !v.is_nan() {
                    bitmap[i / 8] |= 1 << (7 - (i % 8));
                }
            }
            section6.extend_from_slice(&bitmap);
        } else {
            section6.extend_from_slice(&6u32.to_be_bytes());
            section6.push(6);
            section6.push(255); // no bitmap
        }

        // Section 7: pack present values MSB-first.
        let mut packed = Vec::new();
        if bits_per_value > 0 {
            let scale = 2.0_f32.powi(binary_scale_factor as i32);
            for &v in &present {
                let raw = ((v - reference_value) / scale).round() as u32;
                packed.extend_from_slice(&(raw as u16).to_be_bytes());
            }
        }
        let mut section7 = Vec::new();
        section7.extend_from_slice(&((5 + packed.len()) as u32).to_be_bytes());
        section7.push(7);
        section7.extend_from_slice(&packed);

        (section5, section6, section7)
    }
}

/// Gzip a byte slice, as the remote source serves its payloads.
pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).expect("gzip write cannot fail");
    encoder.finish().expect("gzip finish cannot fail")
}
