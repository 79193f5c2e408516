//! End-to-end decoder tests against synthetic mosaic messages.

use chrono::{Datelike, Timelike};
use mosaic_grib2::{decode_mosaic, Grib2Error};
use test_utils::MosaicBuilder;

#[test]
fn test_decode_mosaic_shape_and_axes() {
    let message = MosaicBuilder::new_mosaic().build();
    let grid = decode_mosaic(&message).unwrap();

    assert_eq!(grid.width, 20);
    assert_eq!(grid.height, 15);
    assert_eq!(grid.values.len(), 300);
    assert_eq!(grid.latitudes.len(), 15);
    assert_eq!(grid.longitudes.len(), 20);

    // North-to-south scan: latitudes descend from La1 to La2.
    assert!((grid.latitudes[0] - 54.995).abs() < 1e-6);
    assert!((grid.latitudes[14] - 40.005).abs() < 1e-6);
    assert!(grid.latitudes.windows(2).all(|w| w[0] > w[1]));

    // 0-360 longitude convention survives decoding untouched.
    assert!((grid.longitudes[0] - 230.005).abs() < 1e-6);
    assert!((grid.longitudes[19] - 249.995).abs() < 1e-6);
}

#[test]
fn test_decode_mosaic_reference_time() {
    let message = MosaicBuilder::new_mosaic()
        .with_reference_time(2026, 8, 7, 18)
        .build();
    let grid = decode_mosaic(&message).unwrap();

    assert_eq!(grid.reference_time.year(), 2026);
    assert_eq!(grid.reference_time.month(), 8);
    assert_eq!(grid.reference_time.day(), 7);
    assert_eq!(grid.reference_time.hour(), 18);
}

#[test]
fn test_decode_mosaic_value_roundtrip() {
    let n = 20 * 15;
    let data: Vec<f32> = (0..n).map(|i| -30.0 + i as f32 * 0.25).collect();
    let message = MosaicBuilder::new_mosaic().with_data(data.clone()).build();
    let grid = decode_mosaic(&message).unwrap();

    for (decoded, original) in grid.values.iter().zip(data.iter()) {
        assert!(
            (decoded - original).abs() < 0.01,
            "decoded {} vs original {}",
            decoded,
            original
        );
    }
}

#[test]
fn test_decode_mosaic_constant_field() {
    let message = MosaicBuilder::new_mosaic().with_constant_value(-999.0).build();
    let grid = decode_mosaic(&message).unwrap();
    assert!(grid.values.iter().all(|&v| v == -999.0));
}

#[test]
fn test_decode_mosaic_bitmap_gaps() {
    let mut data = vec![15.0f32; 20 * 15];
    data[0] = f32::NAN;
    data[37] = f32::NAN;
    data[299] = f32::NAN;

    let message = MosaicBuilder::new_mosaic().with_data(data).build();
    let grid = decode_mosaic(&message).unwrap();

    assert!(grid.values[0].is_nan());
    assert!(grid.values[37].is_nan());
    assert!(grid.values[299].is_nan());
    assert!((grid.values[1] - 15.0).abs() < 0.01);
    assert_eq!(grid.values.iter().filter(|v| v.is_nan()).count(), 3);
}

#[test]
fn test_decode_mosaic_negative_longitude_convention() {
    let message = MosaicBuilder::new_mosaic()
        .with_grid(10, 10)
        .with_corners(45_000_000, -100_000_000, 36_000_000, -91_000_000)
        .build();
    let grid = decode_mosaic(&message).unwrap();

    assert!((grid.longitudes[0] + 100.0).abs() < 1e-6);
    assert!((grid.longitudes[9] + 91.0).abs() < 1e-6);
}

#[test]
fn test_decode_rejects_message_without_data() {
    let message = MosaicBuilder::new_mosaic().without_data_sections().build();
    assert!(matches!(
        decode_mosaic(&message),
        Err(Grib2Error::MissingData)
    ));
}

#[test]
fn test_decode_rejects_truncated_message() {
    let message = MosaicBuilder::new_mosaic().build();
    assert!(decode_mosaic(&message[..message.len() / 2]).is_err());
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(decode_mosaic(b"not a grib file at all").is_err());
}
