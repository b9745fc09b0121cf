//! I/O abstractions shared by the TIFF parser and the COG writer
//!
//! This module provides the byte-order strategy used for all
//! endian-sensitive reads and writes, and the reader trait the rest of
//! the crate is written against.

pub mod byte_order;
pub mod seekable;

pub use byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use seekable::SeekableReader;
