//! Input loading and directory merging
//!
//! This module turns parsed TIFF inputs into the typed directory tree the
//! writer consumes: it decodes the recognized tags of every raw IFD,
//! wires up file-backed tile sources, and merges the flat directory list
//! into `{main, overviews[], masks}` by sorting on image area.

use log::{debug, info};
use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use crate::cog::config::Config;
use crate::cog::ifd::{CogIfd, TileSource};
use crate::cog::writer;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{subfile_type, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::Ifd;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;
use crate::utils::tag_utils;

/// A reader shared between the parser and the tile sources built on it
pub(crate) type SharedReader = Rc<RefCell<Box<dyn SeekableReader>>>;

/// Tile source backed by a shared random-access reader and the
/// directory's input offset/byte-count arrays
pub(crate) struct ReaderTileSource {
    reader: SharedReader,
    offsets: Vec<u64>,
    counts: Vec<u32>,
}

impl TileSource for ReaderTileSource {
    fn load_tile(&mut self, index: usize, buf: &mut [u8]) -> TiffResult<()> {
        if index >= self.offsets.len() || buf.len() != self.counts[index] as usize {
            return Err(TiffError::GenericError(format!(
                "tile buffer size mismatch for tile {}",
                index
            )));
        }
        let mut reader = self.reader.borrow_mut();
        reader.seek(SeekFrom::Start(self.offsets[index]))?;
        reader.read_exact(buf)?;
        Ok(())
    }
}

/// Rewrites one or more parsed inputs into a COG on `out`
///
/// The first input provides the full-resolution image (and possibly a
/// complete overview chain); additional inputs supply externally built
/// overviews. The output uses 64-bit addressing when the configuration
/// forces it, when the first input is a BigTIFF, or when 32-bit offsets
/// would overflow.
pub(crate) fn rewrite(
    config: &Config,
    readers: Vec<Box<dyn SeekableReader>>,
    out: &mut dyn Write,
) -> TiffResult<()> {
    if readers.is_empty() {
        return Err(TiffError::InvalidOption(
            "at least one input is required".to_string(),
        ));
    }

    let mut inputs = Vec::with_capacity(readers.len());
    for (index, reader) in readers.into_iter().enumerate() {
        let shared: SharedReader = Rc::new(RefCell::new(reader));
        let mut parser = TiffReader::new();
        let tiff = {
            let mut guard = shared.borrow_mut();
            parser.read(&mut **guard)?
        };
        debug!(
            "Input {}: {} directories, {}",
            index,
            tiff.ifd_count(),
            if tiff.is_big_tiff { "BigTIFF" } else { "TIFF" }
        );
        inputs.push((parser, tiff, shared));
    }

    let byte_order = inputs[0].1.byte_order;
    if inputs.iter().any(|(_, tiff, _)| tiff.byte_order != byte_order) {
        return Err(TiffError::InconsistentByteOrder);
    }
    let first_input_bigtiff = inputs[0].1.is_big_tiff;
    let multi_input = inputs.len() > 1;

    let mut flat: Vec<CogIfd> = Vec::new();
    for (input_index, (parser, tiff, shared)) in inputs.iter().enumerate() {
        for raw in &tiff.ifds {
            validation::validate_tiled_ifd(raw)?;
            let mut ifd = decode_ifd(parser, shared, raw)?;

            if ifd.tile_width == 0 || ifd.tile_height == 0 {
                return Err(TiffError::NotTiled(format!(
                    "directory {} of input {} has a zero tile size",
                    raw.number, input_index
                )));
            }
            if ifd.expected_tile_count() != ifd.tile_byte_counts.len() as u64 {
                return Err(TiffError::InconsistentTileCount {
                    expected: ifd.expected_tile_count(),
                    actual: ifd.tile_byte_counts.len() as u64,
                });
            }

            if multi_input {
                if ifd.subfile_type & subfile_type::REDUCED_IMAGE != 0 {
                    return Err(TiffError::InvalidOverview(
                        "inputs of a multi-file rewrite may not contain overviews".to_string(),
                    ));
                }
                if input_index != 0 {
                    ifd.subfile_type |= subfile_type::REDUCED_IMAGE;
                }
            }

            flat.push(ifd);
        }
    }

    let mut tree = merge(flat)?;
    info!(
        "Merged inputs into {} levels{}",
        tree.level_count(),
        if tree.has_mask() { " with mask" } else { "" }
    );

    let mut effective = config.clone();
    effective.big_tiff = effective.big_tiff || first_input_bigtiff;
    writer::write_cog(&effective, &mut tree, out)
}

/// Sorts a flat directory list and attaches masks and overviews
///
/// Sorting on `(-area, subfile_type)` puts the full-resolution image
/// first, its mask second, then each overview followed by its mask.
/// Directories matching the current head's size become its mask; smaller
/// ones open the next overview level.
pub(crate) fn merge(mut ifds: Vec<CogIfd>) -> TiffResult<CogIfd> {
    ifds.sort_by(|a, b| {
        let area_a = a.image_width * a.image_height;
        let area_b = b.image_width * b.image_height;
        area_b
            .cmp(&area_a)
            .then(a.subfile_type.cmp(&b.subfile_type))
    });

    let mut iter = ifds.into_iter();
    let mut main = iter.next().ok_or_else(|| {
        TiffError::InvalidOption("inputs contain no directories".to_string())
    })?;
    if main.subfile_type != subfile_type::NONE {
        return Err(TiffError::BadSort {
            image_height: main.image_height,
            subfile_type: main.subfile_type,
        });
    }

    let mut head_width = main.image_width;
    let mut head_height = main.image_height;
    for ifd in iter {
        if ifd.image_width == head_width && ifd.image_height == head_height {
            if main.overviews.is_empty() {
                main.add_mask(ifd)?;
            } else {
                let last = main.overviews.len() - 1;
                main.overviews[last].add_mask(ifd)?;
            }
        } else {
            head_width = ifd.image_width;
            head_height = ifd.image_height;
            main.add_overview(ifd)?;
        }
    }

    Ok(main)
}

/// Decodes a raw directory's recognized tags into a typed `CogIfd` and
/// wires up its tile source
///
/// Tags outside the recognized set are dropped.
pub(crate) fn decode_ifd(
    parser: &TiffReader,
    shared: &SharedReader,
    raw: &Ifd,
) -> TiffResult<CogIfd> {
    let mut ifd = CogIfd::new();

    {
        let mut guard = shared.borrow_mut();
        let reader: &mut dyn SeekableReader = &mut **guard;

        for entry in &raw.entries {
            match entry.tag {
                tags::SUBFILE_TYPE => {
                    ifd.subfile_type = scalar(parser.read_u64_values(reader, entry)?) as u32;
                }
                tags::IMAGE_WIDTH => {
                    ifd.image_width = scalar(parser.read_u64_values(reader, entry)?);
                }
                tags::IMAGE_LENGTH => {
                    ifd.image_height = scalar(parser.read_u64_values(reader, entry)?);
                }
                tags::BITS_PER_SAMPLE => {
                    ifd.bits_per_sample = parser.read_u16_values(reader, entry)?;
                }
                tags::COMPRESSION => {
                    ifd.compression = scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::PHOTOMETRIC_INTERPRETATION => {
                    ifd.photometric_interpretation =
                        scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::DOCUMENT_NAME => {
                    ifd.document_name = parser.read_string_value(reader, entry)?;
                }
                tags::SAMPLES_PER_PIXEL => {
                    ifd.samples_per_pixel = scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::PLANAR_CONFIGURATION => {
                    ifd.planar_configuration =
                        scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::DATE_TIME => {
                    ifd.date_time = parser.read_string_value(reader, entry)?;
                }
                tags::PREDICTOR => {
                    ifd.predictor = scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::COLORMAP => {
                    ifd.colormap = parser.read_u16_values(reader, entry)?;
                }
                tags::TILE_WIDTH => {
                    ifd.tile_width = scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::TILE_LENGTH => {
                    ifd.tile_height = scalar(parser.read_u64_values(reader, entry)?) as u16;
                }
                tags::TILE_OFFSETS => {
                    ifd.tile_offsets = parser.read_u64_values(reader, entry)?;
                }
                tags::TILE_BYTE_COUNTS => {
                    ifd.tile_byte_counts = parser
                        .read_u64_values(reader, entry)?
                        .into_iter()
                        .map(|count| count as u32)
                        .collect();
                }
                tags::EXTRA_SAMPLES => {
                    ifd.extra_samples = parser.read_u16_values(reader, entry)?;
                }
                tags::SAMPLE_FORMAT => {
                    ifd.sample_format = parser.read_u16_values(reader, entry)?;
                }
                tags::JPEG_TABLES => {
                    ifd.jpeg_tables = parser.read_byte_values(reader, entry)?;
                }
                tags::MODEL_PIXEL_SCALE => {
                    ifd.model_pixel_scale = parser.read_f64_values(reader, entry)?;
                }
                tags::MODEL_TIE_POINT => {
                    ifd.model_tie_point = parser.read_f64_values(reader, entry)?;
                }
                tags::MODEL_TRANSFORMATION => {
                    ifd.model_transformation = parser.read_f64_values(reader, entry)?;
                }
                tags::GEO_KEY_DIRECTORY => {
                    ifd.geo_key_directory = parser.read_u16_values(reader, entry)?;
                }
                tags::GEO_DOUBLE_PARAMS => {
                    ifd.geo_double_params = parser.read_f64_values(reader, entry)?;
                }
                tags::GEO_ASCII_PARAMS => {
                    ifd.geo_ascii_params = parser.read_string_value(reader, entry)?;
                }
                tags::GDAL_METADATA => {
                    ifd.gdal_metadata = parser.read_string_value(reader, entry)?;
                }
                tags::GDAL_NODATA => {
                    ifd.nodata = parser.read_string_value(reader, entry)?;
                }
                tags::LERC_PARAMETERS => {
                    ifd.lerc_params = parser.read_u32_values(reader, entry)?;
                }
                tags::RPC_COEFFICIENTS => {
                    ifd.rpc_coefficients = parser.read_f64_values(reader, entry)?;
                }
                other => {
                    debug!(
                        "Dropping unrecognized tag {} ({})",
                        other,
                        tag_utils::tag_name(other)
                    );
                }
            }
        }
    }

    ifd.set_tile_source(Box::new(ReaderTileSource {
        reader: Rc::clone(shared),
        offsets: ifd.tile_offsets.clone(),
        counts: ifd.tile_byte_counts.clone(),
    }));

    Ok(ifd)
}

/// First element of a decoded scalar tag, zero when absent
fn scalar(values: Vec<u64>) -> u64 {
    values.first().copied().unwrap_or(0)
}
