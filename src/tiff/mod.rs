//! TIFF file format parsing module
//!
//! This module provides structures and functions for reading TIFF and
//! BigTIFF format files: header detection, IFD-chain walking, and typed
//! access to the tag payloads the COG engine recognizes.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
#[cfg(test)]
mod tests;
pub(crate) mod constants;
pub(crate) mod validation;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{Ifd, IfdEntry};
pub use reader::TiffReader;
pub use types::Tiff;
