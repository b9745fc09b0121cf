//! Custom error types for TIFF and COG processing

use std::fmt;
use std::io;

/// Errors raised while parsing inputs or rewriting them as a COG
#[derive(Debug)]
pub enum TiffError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTiffHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// An input directory is not tiled, or still carries strip tags
    NotTiled(String),
    /// Multiple inputs disagree on byte order
    InconsistentByteOrder,
    /// After sorting, the first directory is not the full-resolution image
    BadSort { image_height: u64, subfile_type: u32 },
    /// An attached overview is not strictly smaller than its parent
    InvalidOverview(String),
    /// A mask does not match its parent's geometry or sample layout
    InvalidMask(String),
    /// An overview's band layout differs from the full-resolution image
    InconsistentBandCount { expected: u16, actual: u16 },
    /// Derived tile count disagrees with the tile arrays
    InconsistentTileCount { expected: u64, actual: u64 },
    /// Option validation failed
    InvalidOption(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::InvalidHeader => write!(f, "Invalid TIFF header"),
            TiffError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            TiffError::InvalidBigTiffHeader => write!(f, "Invalid BigTIFF header"),
            TiffError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            TiffError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            TiffError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            TiffError::NotTiled(msg) => write!(f, "Input is not a tiled TIFF: {}", msg),
            TiffError::InconsistentByteOrder => write!(f, "Inputs disagree on byte order"),
            TiffError::BadSort { image_height, subfile_type } => write!(
                f,
                "Failed sort: first directory has height {} and subfile type {}",
                image_height, subfile_type
            ),
            TiffError::InvalidOverview(msg) => write!(f, "Invalid overview: {}", msg),
            TiffError::InvalidMask(msg) => write!(f, "Invalid mask: {}", msg),
            TiffError::InconsistentBandCount { expected, actual } => write!(
                f,
                "Inconsistent band count: expected {} samples per pixel, got {}",
                expected, actual
            ),
            TiffError::InconsistentTileCount { expected, actual } => write!(
                f,
                "Inconsistent tile count: geometry implies {} tiles, arrays hold {}",
                expected, actual
            ),
            TiffError::InvalidOption(msg) => write!(f, "Invalid option: {}", msg),
            TiffError::GenericError(msg) => write!(f, "TIFF error: {}", msg),
        }
    }
}

impl std::error::Error for TiffError {}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;
