//! TIFF validation utilities
//!
//! This module provides validation functions for TIFF files to ensure
//! data integrity before a rewrite starts: header sanity, IFD offset
//! bounds, and the tiled-layout requirements of the COG engine.

use log::{debug, error, warn};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{header, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::Ifd;

/// Validates an IFD offset to ensure it's within reasonable bounds
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Gets the file size for validation purposes
///
/// Returns u64::MAX when the size cannot be determined, so offset checks
/// degrade to no-ops instead of rejecting streams of unknown length.
pub fn file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.seek(SeekFrom::Current(0))?;
    let size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(size)
}

/// Validates the BigTIFF header
///
/// BigTIFF has specific header requirements beyond the standard TIFF:
/// after the version number (43) come the offset size (must be 8) and a
/// reserved value (must be 0).
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTiffHeader);
    }

    Ok(())
}

/// Checks that a raw directory satisfies the tiled-layout requirements
///
/// The engine shuffles tiles; a directory without tile tags, or one that
/// still carries strip tags, cannot be rewritten. The two tile arrays must
/// also be the same length.
pub fn validate_tiled_ifd(ifd: &Ifd) -> TiffResult<()> {
    let offsets = ifd.entry(tags::TILE_OFFSETS);
    let counts = ifd.entry(tags::TILE_BYTE_COUNTS);

    let (offsets, counts) = match (offsets, counts) {
        (Some(o), Some(c)) => (o, c),
        _ => {
            return Err(TiffError::NotTiled(format!(
                "directory {} has no tile offset/byte-count tags",
                ifd.number
            )))
        }
    };

    if ifd.has_tag(tags::STRIP_OFFSETS) || ifd.has_tag(tags::STRIP_BYTE_COUNTS) {
        return Err(TiffError::NotTiled(format!(
            "directory {} carries strip tags",
            ifd.number
        )));
    }

    if offsets.count != counts.count {
        return Err(TiffError::InconsistentTileCount {
            expected: offsets.count,
            actual: counts.count,
        });
    }

    debug!("Directory {} is tiled with {} tiles", ifd.number, offsets.count);
    Ok(())
}

/// Reads just enough of a file header to tell whether it is a BigTIFF
///
/// Used by the command line front end to honor `--keep-bigtiff` without
/// parsing the whole file twice.
pub fn sniff_big_tiff(path: &Path) -> TiffResult<bool> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;

    let version = match &buf[0..2] {
        b"II" => u16::from_le_bytes([buf[2], buf[3]]),
        b"MM" => u16::from_be_bytes([buf[2], buf[3]]),
        _ => {
            return Err(TiffError::InvalidByteOrder(u16::from_le_bytes([
                buf[0], buf[1],
            ])))
        }
    };

    Ok(version == header::BIG_TIFF_VERSION)
}
