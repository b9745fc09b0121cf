//! Tests for the typed directory model and structure planner

use crate::cog::ifd::CogIfd;
use crate::tiff::constants::{planar_config, subfile_type};
use crate::tiff::errors::TiffError;

fn image(width: u64, height: u64, tile: u16, samples: u16) -> CogIfd {
    let mut ifd = CogIfd::new();
    ifd.image_width = width;
    ifd.image_height = height;
    ifd.tile_width = tile;
    ifd.tile_height = tile;
    ifd.samples_per_pixel = samples;
    ifd.bits_per_sample = vec![8; samples as usize];
    ifd.photometric_interpretation = 1;
    ifd.compression = 1;
    let tiles = ifd.expected_tile_count() as usize;
    ifd.tile_byte_counts = vec![10; tiles];
    ifd.tile_offsets = vec![0; tiles];
    ifd
}

fn mask_for(parent: &CogIfd) -> CogIfd {
    let mut mask = CogIfd::new();
    mask.image_width = parent.image_width;
    mask.image_height = parent.image_height;
    mask.tile_width = parent.tile_width;
    mask.tile_height = parent.tile_height;
    mask.samples_per_pixel = 1;
    mask.bits_per_sample = vec![1];
    mask.photometric_interpretation = 4;
    let tiles = parent.tile_byte_counts.len() / parent.n_planes();
    mask.tile_byte_counts = vec![5; tiles];
    mask.tile_offsets = vec![0; tiles];
    mask
}

#[test]
fn test_tile_geometry() {
    let ifd = image(513, 256, 256, 1);
    assert_eq!(ifd.n_tiles_x(), 3);
    assert_eq!(ifd.n_tiles_y(), 1);
    assert_eq!(ifd.n_planes(), 1);
    assert_eq!(ifd.expected_tile_count(), 3);
}

#[test]
fn test_separate_planes_geometry() {
    let mut ifd = image(256, 256, 128, 4);
    ifd.planar_configuration = planar_config::SEPARATE;
    assert_eq!(ifd.n_tiles_x(), 2);
    assert_eq!(ifd.n_tiles_y(), 2);
    assert_eq!(ifd.n_planes(), 4);
    assert_eq!(ifd.expected_tile_count(), 16);

    assert_eq!(ifd.tile_index(1, 1, 2), 2 * 4 + 1 * 2 + 1);
    assert_eq!(ifd.tile_from_index(11), (1, 1, 2));
}

#[test]
fn test_structure_photometric_always_counted() {
    // A directory with nothing set still carries its photometric tag.
    let empty = CogIfd::new();
    let (n_tags, dir_bytes, strile_bytes) = empty.structure(false);
    assert_eq!(n_tags, 1);
    assert_eq!(dir_bytes, 2 + 12 + 4);
    assert_eq!(strile_bytes, 0);

    let (n_tags, dir_bytes, _) = empty.structure(true);
    assert_eq!(n_tags, 1);
    assert_eq!(dir_bytes, 8 + 20 + 8);
}

#[test]
fn test_structure_inline_striles() {
    // A single tile keeps both arrays inline: no strile bytes at all.
    let ifd = image(200, 200, 256, 1);
    let (n_tags, _, strile_bytes) = ifd.structure(false);
    // width, height, bits, compression, photometric, samples, tile w/h,
    // offsets, counts
    assert_eq!(n_tags, 10);
    assert_eq!(strile_bytes, 0);
}

#[test]
fn test_structure_overflow_striles() {
    let ifd = image(600, 600, 256, 1); // 3x3 tiles
    let (_, _, strile_classic) = ifd.structure(false);
    assert_eq!(strile_classic, 9 * 4 + 9 * 4);

    let (_, _, strile_big) = ifd.structure(true);
    assert_eq!(strile_big, 9 * 8 + 9 * 4);
}

#[test]
fn test_structure_counts_dir_overflow() {
    let mut ifd = image(200, 200, 256, 1);
    ifd.bits_per_sample = vec![8, 8, 8]; // 6 bytes, spills in classic
    let (_, dir_classic, _) = ifd.structure(false);
    let (_, dir_big, _) = ifd.structure(true);

    // Classic: header 2 + 10 entries * 12 + next 4 + 6 overflow bytes.
    assert_eq!(dir_classic, 2 + 10 * 12 + 4 + 6);
    // BigTIFF: three shorts fit the 8-byte slot, no overflow.
    assert_eq!(dir_big, 8 + 10 * 20 + 8);
}

#[test]
fn test_add_overview_sets_type_and_clears_geo() {
    let mut main = image(512, 512, 256, 1);
    main.model_pixel_scale = vec![1.0, 1.0, 0.0];
    let mut overview = image(256, 256, 256, 1);
    overview.model_pixel_scale = vec![2.0, 2.0, 0.0];
    overview.geo_ascii_params = "WGS 84".to_string();

    main.add_overview(overview).unwrap();
    assert_eq!(main.overviews.len(), 1);
    let attached = &main.overviews[0];
    assert_eq!(attached.subfile_type, subfile_type::REDUCED_IMAGE);
    assert!(attached.model_pixel_scale.is_empty());
    assert!(attached.geo_ascii_params.is_empty());
    // The root keeps its own georeferencing.
    assert_eq!(main.model_pixel_scale, vec![1.0, 1.0, 0.0]);
}

#[test]
fn test_add_overview_must_shrink() {
    let mut main = image(512, 512, 256, 1);
    main.add_overview(image(256, 256, 256, 1)).unwrap();

    // Same size as the current lowest level is rejected.
    match main.add_overview(image(256, 256, 256, 1)) {
        Err(TiffError::InvalidOverview(_)) => {}
        other => panic!("expected InvalidOverview, got {:?}", other.err()),
    }
}

#[test]
fn test_add_overview_band_mismatch() {
    let mut main = image(512, 512, 256, 3);
    match main.add_overview(image(256, 256, 256, 1)) {
        Err(TiffError::InconsistentBandCount { expected: 3, actual: 1 }) => {}
        other => panic!("expected InconsistentBandCount, got {:?}", other.err()),
    }
}

#[test]
fn test_add_mask() {
    let mut main = image(512, 512, 256, 3);
    let mask = mask_for(&main);
    main.add_mask(mask).unwrap();
    assert_eq!(main.mask.as_ref().unwrap().subfile_type, subfile_type::MASK);
}

#[test]
fn test_add_mask_on_overview() {
    let mut overview = image(256, 256, 256, 1);
    overview.subfile_type = subfile_type::REDUCED_IMAGE;
    let mask = mask_for(&overview);
    overview.add_mask(mask).unwrap();
    assert_eq!(
        overview.mask.as_ref().unwrap().subfile_type,
        subfile_type::MASK | subfile_type::REDUCED_IMAGE
    );
}

#[test]
fn test_add_mask_geometry_mismatch() {
    let mut main = image(512, 512, 256, 1);
    let mut mask = mask_for(&main);
    mask.image_width = 511;
    match main.add_mask(mask) {
        Err(TiffError::InvalidMask(_)) => {}
        other => panic!("expected InvalidMask, got {:?}", other.err()),
    }
}

#[test]
fn test_add_mask_band_mismatch() {
    let mut main = image(512, 512, 256, 1);
    let mut mask = mask_for(&main);
    mask.samples_per_pixel = 3;
    mask.bits_per_sample = vec![8, 8, 8];
    match main.add_mask(mask) {
        Err(TiffError::InvalidMask(_)) => {}
        other => panic!("expected InvalidMask, got {:?}", other.err()),
    }
}

#[test]
fn test_directories_order() {
    let mut main = image(512, 512, 256, 1);
    let mask = mask_for(&main);
    main.add_mask(mask).unwrap();
    let mut overview = image(256, 256, 256, 1);
    let overview_mask = mask_for(&overview);
    overview.add_mask(overview_mask).unwrap();
    main.add_overview(overview).unwrap();

    let dirs = main.directories();
    assert_eq!(dirs.len(), 4);
    assert_eq!(dirs[0].image_width, 512);
    assert_eq!(dirs[0].subfile_type, subfile_type::NONE);
    assert_eq!(dirs[1].subfile_type, subfile_type::MASK);
    assert_eq!(dirs[2].image_width, 256);
    assert_eq!(dirs[2].subfile_type, subfile_type::REDUCED_IMAGE);
    assert_eq!(
        dirs[3].subfile_type,
        subfile_type::MASK | subfile_type::REDUCED_IMAGE
    );
}
