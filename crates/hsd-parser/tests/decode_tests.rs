//! End-to-end decoding tests against synthetic segment files.

use chrono::{TimeZone, Utc};
use hsd_parser::header::BandRecord;
use hsd_parser::{decode, decode_uncompressed, HsdError, HsdFile};
use sate_common::GeoExtent;
use test_utils::fixtures::himawari8;
use test_utils::{assert_approx_eq, assert_coords_approx_eq, require_test_file, HsdBuilder};

// ============================================================================
// Header fidelity
// ============================================================================

#[test]
fn test_header_fields_round_trip() {
    let data = HsdBuilder::new(13)
        .size(6, 3)
        .first_line(1101)
        .segment(3, 10)
        .correction(-0.25, 1.0005, -2.0e-6)
        .build();
    let file = decode_uncompressed(&data).unwrap();
    let h = &file.header;

    assert_eq!(h.basic.total_header_blocks, 11);
    assert_eq!(h.basic.byte_order, 0);
    assert_eq!(h.basic.satellite_name, "Himawari-8");
    assert_eq!(h.basic.processing_center, "MSC");
    assert_eq!(h.basic.observation_area, "FLDK");
    assert_eq!(h.basic.format_version, "1.3");
    assert_eq!(h.basic.total_header_length as usize, h.header_length);
    assert_eq!(h.basic.total_data_length, 6 * 3 * 2);
    assert_eq!(
        h.basic.observation_start(),
        Some(Utc.with_ymd_and_hms(2024, 1, 5, 23, 45, 0).unwrap())
    );

    assert_eq!(h.data.bits_per_pixel, 16);
    assert_eq!(h.columns(), 6);
    assert_eq!(h.lines(), 3);

    assert_eq!(h.projection.sub_lon, 140.7);
    assert_eq!(h.projection.cfac, 20_466_275);
    assert_eq!(h.projection.coff, 2750.5);
    assert_eq!(h.projection.earth_const3, 1.006739501);

    assert_eq!(h.calibration.band_number, 13);
    assert_eq!(h.calibration.error_pixel_count, 65535);
    assert_eq!(h.calibration.outside_scan_count, 65534);
    match h.calibration.record {
        BandRecord::Infrared(ir) => {
            assert_eq!(ir.c0, -0.25);
            assert_eq!(ir.c1, 1.0005);
            assert_eq!(ir.c2, -2.0e-6);
            assert_eq!(ir.light_speed, 2.99792458e8);
        }
        BandRecord::Visible(_) => panic!("band 13 must carry an infrared record"),
    }

    assert_eq!(h.segment.segment_number, 3);
    assert_eq!(h.segment.total_segments, 10);
    assert_eq!(h.segment.first_line_number, 1101);
    assert_eq!(h.band().unwrap().number(), 13);
}

#[test]
fn test_visible_band_record() {
    let data = HsdBuilder::new(3).c_star(0.00185).build();
    let file = decode_uncompressed(&data).unwrap();
    assert_eq!(
        file.header.calibration.record,
        BandRecord::Visible(hsd_parser::header::VisibleRecord { c_star: 0.00185 })
    );
}

#[test]
fn test_counts_row_major() {
    let data = HsdBuilder::new(8)
        .size(3, 2)
        .counts(vec![1, 2, 3, 4, 5, 6])
        .build();
    let file = decode_uncompressed(&data).unwrap();
    assert_eq!(file.raw.get(0, 2), Some(3));
    assert_eq!(file.raw.get(1, 0), Some(4));
    assert_eq!(file.raw.valid_count(), 6);
}

// ============================================================================
// Block walking
// ============================================================================

#[test]
fn test_padded_blocks_are_stepped_over() {
    let plain = decode_uncompressed(&HsdBuilder::new(13).build()).unwrap();
    let padded = decode_uncompressed(
        &HsdBuilder::new(13)
            .pad_block(2, 7)
            .pad_block(3, 32)
            .pad_block(5, 1)
            .pad_block(6, 100)
            .build(),
    )
    .unwrap();

    assert_eq!(padded.header.projection, plain.header.projection);
    assert_eq!(padded.header.calibration, plain.header.calibration);
    assert_eq!(padded.header.header_length, plain.header.header_length + 140);
    assert_eq!(padded.raw, plain.raw);
}

#[test]
fn test_only_mandatory_blocks() {
    let file = decode_uncompressed(&HsdBuilder::new(13).mandatory_blocks_only().build()).unwrap();
    assert_eq!(file.header.basic.total_header_blocks, 5);
    assert_eq!(file.raw.len(), 32);
}

#[test]
fn test_missing_mandatory_block() {
    for block in [2u8, 3, 5, 7] {
        let data = HsdBuilder::new(13).omit_block(block).build();
        match decode_uncompressed(&data) {
            Err(HsdError::MissingBlock(n)) => assert_eq!(n, block),
            other => panic!("omitting block {} gave {:?}", block, other.map(|_| ())),
        }
    }
}

#[test]
fn test_truncated_header() {
    let data = HsdBuilder::new(13).build();
    let result = decode_uncompressed(&data[..300]);
    assert!(matches!(result, Err(HsdError::Truncated { offset: 282, .. })));
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_unsupported_band_numbers() {
    for band in [0u16, 17, 300] {
        let data = HsdBuilder::new(band).build();
        assert!(matches!(
            decode_uncompressed(&data),
            Err(HsdError::UnsupportedBand(b)) if b == band
        ));
    }
}

#[test]
fn test_payload_size_mismatch() {
    let short = HsdBuilder::new(13).payload_adjust(-1).build();
    assert!(matches!(
        decode_uncompressed(&short),
        Err(HsdError::PayloadSize { expected: 64, actual: 63 })
    ));

    let long = HsdBuilder::new(13).payload_adjust(2).build();
    assert!(matches!(
        decode_uncompressed(&long),
        Err(HsdError::PayloadSize { expected: 64, actual: 66 })
    ));
}

#[test]
fn test_unsupported_features() {
    let cases = [
        HsdBuilder::new(13).byte_order(1),
        HsdBuilder::new(13).bits_per_pixel(8),
        HsdBuilder::new(13).compression_flag(1),
    ];
    for builder in cases {
        assert!(matches!(
            decode_uncompressed(&builder.build()),
            Err(HsdError::Unsupported(_))
        ));
    }
}

#[test]
fn test_empty_segment() {
    let file = decode_uncompressed(&HsdBuilder::new(13).size(0, 0).build()).unwrap();
    assert!(file.raw.is_empty());
    let (lons, lats) = file.geolocate().unwrap();
    assert!(lons.is_empty() && lats.is_empty());
}

// ============================================================================
// Masking
// ============================================================================

#[test]
fn test_invalid_counts_masked() {
    let data = HsdBuilder::new(13)
        .size(3, 2)
        .error_counts(4000, 4001)
        .counts(vec![4000, 4001, 65530, 65535, 65529, 12])
        .build();
    let file = decode_uncompressed(&data).unwrap();
    assert_eq!(
        file.raw.cells(),
        &[None, None, None, None, Some(65529), Some(12)]
    );
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_compressed_containers_decode_identically() {
    let builder = HsdBuilder::new(13).size(5, 5).first_line(2748);
    let plain = decode(&builder.build()).unwrap();
    let bz2 = decode(&builder.build_bz2()).unwrap();
    let gz = decode(&builder.build_gzip()).unwrap();
    assert_eq!(bz2.header, plain.header);
    assert_eq!(bz2.raw, plain.raw);
    assert_eq!(gz.raw, plain.raw);
}

#[test]
fn test_open_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("57_B13.bz2");
    std::fs::write(&path, HsdBuilder::new(13).build_bz2()).unwrap();
    let file = HsdFile::open(&path).unwrap();
    assert_eq!(file.header.calibration.band_number, 13);

    assert!(matches!(
        HsdFile::open(dir.path().join("missing.bz2")),
        Err(HsdError::Io(_))
    ));
}

// ============================================================================
// Calibration and navigation, end to end
// ============================================================================

#[test]
fn test_infrared_golden_segment() {
    // 2 x 2 segment straddling the equator just west of the sub-satellite point
    let data = HsdBuilder::new(13)
        .size(2, 2)
        .first_line(2750)
        .offsets(1.5, 2750.5)
        .counts(vec![1000, 3000, 65535, 5000])
        .build_bz2();
    let file = decode(&data).unwrap();

    let celsius = file.calibrate();
    assert_approx_eq!(celsius.get(0, 0).unwrap(), 32.261137843240135, 1e-9);
    assert_approx_eq!(celsius.get(0, 1).unwrap(), -20.827628756647528, 1e-9);
    // error count
    assert_eq!(celsius.get(1, 0), None);
    // negative radiance
    assert_eq!(celsius.get(1, 1), None);

    let (lons, lats) = file.geolocate().unwrap();
    assert_coords_approx_eq!(
        (lons.get(0, 0).unwrap(), lats.get(0, 0).unwrap()),
        (140.6730505401393, 0.009043694861833665),
        1e-9
    );
    assert_coords_approx_eq!(
        (lons.get(1, 1).unwrap(), lats.get(1, 1).unwrap()),
        (140.69101684718365, -0.00904369467509648),
        1e-9
    );
    // the error count has no coordinates either
    assert_eq!(lons.get(1, 0), None);
    assert_eq!(lats.get(1, 0), None);
    // a calibration-only mask keeps the pixel's position
    assert!(lons.get(1, 1).is_some());
    assert_eq!(lons.valid_count(), 3);
    assert_eq!(lats.valid_count(), 3);

    let extent = GeoExtent::from_grids(&lons, &lats).unwrap();
    assert!(extent.min_lat < 0.0 && extent.max_lat > 0.0);
}

#[test]
fn test_sentinel_counts_masked_in_every_grid() {
    let data = HsdBuilder::new(8)
        .size(3, 1)
        .first_line(2750)
        .offsets(2.0, 2750.5)
        .counts(vec![1200, 65530, 65535])
        .build();
    let file = decode_uncompressed(&data).unwrap();
    let values = file.calibrate();
    let (lons, lats) = file.geolocate().unwrap();
    for column in 1..3 {
        assert_eq!(file.raw.get(0, column), None);
        assert_eq!(values.get(0, column), None);
        assert_eq!(lons.get(0, column), None);
        assert_eq!(lats.get(0, column), None);
    }
    assert!(lons.get(0, 0).is_some() && lats.get(0, 0).is_some());
}

#[test]
fn test_sub_satellite_point_follows_header() {
    for sub_lon in [128.2, 145.0, -75.2] {
        let file = decode_uncompressed(&HsdBuilder::new(13).sub_lon(sub_lon).build()).unwrap();
        let projection = &file.header.projection;
        assert_eq!(projection.sub_lon, sub_lon);
        let (lon, lat) = file
            .header
            .fixed_grid()
            .pixel_to_geo(projection.coff as f64, projection.loff as f64)
            .unwrap();
        assert_coords_approx_eq!((lon, lat), (sub_lon, 0.0), 1e-6);
    }
}

#[test]
fn test_visible_reflectance_unclipped() {
    let data = HsdBuilder::new(3)
        .size(2, 1)
        .calibration(0.3, -6.0)
        .c_star(0.0019)
        .counts(vec![1000, 4000])
        .build();
    let file = decode_uncompressed(&data).unwrap();
    let reflectance = file.calibrate();
    assert_approx_eq!(reflectance.get(0, 0).unwrap(), 0.5586, 1e-12);
    assert_approx_eq!(reflectance.get(0, 1).unwrap(), 2.2686, 1e-12);
}

#[test]
fn test_full_disk_corner_segment_off_earth() {
    let file = decode_uncompressed(&HsdBuilder::new(13).size(4, 2).first_line(1).build()).unwrap();
    let (lons, lats) = file.geolocate().unwrap();
    assert_eq!(lons.valid_count(), 0);
    assert_eq!(lats.valid_count(), 0);
    // counts are still there; only geolocation is masked
    assert_eq!(file.raw.valid_count(), 8);
}

// ============================================================================
// Real data (skipped when absent)
// ============================================================================

#[test]
fn test_real_segment_file() {
    let path = require_test_file!("HS_H08_20150707_0200_B13_FLDK_R20_S0110.DAT.bz2");
    let file = HsdFile::open(&path).unwrap();
    assert_eq!(file.header.calibration.band_number, 13);
    assert_eq!(file.header.columns(), himawari8::FULL_DISK as usize);
    assert_eq!(file.header.segment.total_segments, 10);

    let celsius = file.calibrate();
    let (lo, hi) = celsius.value_range().unwrap();
    assert!(lo > -110.0 && hi < 70.0, "range {}..{}", lo, hi);
}
