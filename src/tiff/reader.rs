//! TIFF file reader implementation
//!
//! This module implements the TIFF/BigTIFF directory parser. It walks the
//! IFD chain, captures raw tag entries, and offers typed accessors for the
//! recognized tag payloads. It never touches pixel data: tile bodies are
//! read later, through the tile sources built by the COG loader.

use log::{debug, info, warn};
use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{Ifd, IfdEntry};
use crate::tiff::types::Tiff;
use crate::tiff::validation;
use crate::utils::string_utils;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Byte order of the current file
    byte_order: Option<ByteOrder>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            byte_order: None,
            is_big_tiff: false,
        }
    }

    /// Returns the byte order handler, with proper error handling for the
    /// not-yet-detected case
    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Reads a TIFF file from the given reader
    ///
    /// This method handles the core process of reading a TIFF file:
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs in the chain
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<Tiff> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order = Some(byte_order);
        self.byte_order_handler = Some(byte_order.create_handler());

        let is_big_tiff = {
            let handler = self.handler()?;
            let version = handler.read_u16(reader)?;
            match version {
                header::BIG_TIFF_VERSION => {
                    validation::validate_bigtiff_header(reader, handler)?;
                    true
                }
                header::TIFF_VERSION => false,
                _ => return Err(TiffError::UnsupportedVersion(version)),
            }
        };
        self.is_big_tiff = is_big_tiff;

        let handler = self.handler()?;
        let first_ifd_offset = if is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };
        debug!("First IFD offset: {}", first_ifd_offset);

        let file_size = validation::file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = Tiff::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        info!("Read {} IFDs from TIFF file", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads a chain of IFDs starting from the given offset
    fn read_ifd_chain(
        &self,
        reader: &mut dyn SeekableReader,
        first_ifd_offset: u64,
        file_size: u64,
    ) -> TiffResult<Vec<Ifd>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;
        let mut ifd_number = 0;
        let max_ifds = 100; // guards against offset cycles in corrupt files

        while ifd_offset != 0 && ifd_number < max_ifds {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain",
                      ifd_offset, file_size);
                break;
            }

            let ifd = self.read_ifd(reader, ifd_offset, ifd_number)?;
            debug!("Read IFD #{} with {} entries", ifd_number, ifd.entries.len());
            ifds.push(ifd);

            // The cursor sits right after the entries, on the next-IFD pointer.
            let handler = self.handler()?;
            let next_ifd_offset = if self.is_big_tiff {
                handler.read_u64(reader)?
            } else {
                handler.read_u32(reader)? as u64
            };

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }

            ifd_offset = next_ifd_offset;
            ifd_number += 1;
        }

        Ok(ifds)
    }

    /// Reads a single IFD at the given file offset
    pub fn read_ifd(
        &self,
        reader: &mut dyn SeekableReader,
        offset: u64,
        number: usize,
    ) -> TiffResult<Ifd> {
        reader.seek(SeekFrom::Start(offset))?;

        let handler = self.handler()?;
        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let mut ifd = Ifd::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry, keeping the raw inline slot bytes
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IfdEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let mut raw_value = [0u8; 8];
        let slot = if self.is_big_tiff { 8 } else { 4 };
        reader.read_exact(&mut raw_value[..slot])?;

        let mut slot_reader = Cursor::new(&raw_value[..slot]);
        let value_offset = if self.is_big_tiff {
            handler.read_u64(&mut slot_reader)?
        } else {
            handler.read_u32(&mut slot_reader)? as u64
        };

        Ok(IfdEntry::new(tag, field_type, count, value_offset, raw_value))
    }

    /// Reads an entry's payload bytes, inline or at its offset
    ///
    /// The returned bytes are still in the file's byte order; the typed
    /// accessors below decode them.
    pub fn entry_payload(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<Vec<u8>> {
        let size = entry.payload_size() as usize;
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.raw_value[..size].to_vec());
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut payload = vec![0u8; size];
        reader.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Reads an integer-typed entry as a vector of u64
    ///
    /// Accepts BYTE, SHORT, LONG and LONG8 entries (and their undefined/
    /// signed aliases of the same width), widening every element.
    pub fn read_u64_values(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<Vec<u64>> {
        let payload = self.entry_payload(reader, entry)?;
        let handler = self.handler()?;
        let mut cursor = Cursor::new(payload);

        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            let value = match entry.field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => {
                    let mut b = [0u8; 1];
                    cursor
                        .read_exact(&mut b)
                        .map_err(TiffError::IoError)?;
                    b[0] as u64
                }
                field_types::SHORT | field_types::SSHORT => {
                    handler.read_u16(&mut cursor)? as u64
                }
                field_types::LONG | field_types::SLONG => {
                    handler.read_u32(&mut cursor)? as u64
                }
                field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => {
                    handler.read_u64(&mut cursor)?
                }
                _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
            };
            values.push(value);
        }

        Ok(values)
    }

    /// Reads a SHORT-typed entry as a vector of u16
    pub fn read_u16_values(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<Vec<u16>> {
        self.read_u64_values(reader, entry)
            .map(|values| values.into_iter().map(|v| v as u16).collect())
    }

    /// Reads a LONG-typed entry as a vector of u32
    pub fn read_u32_values(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<Vec<u32>> {
        self.read_u64_values(reader, entry)
            .map(|values| values.into_iter().map(|v| v as u32).collect())
    }

    /// Reads a DOUBLE-typed entry as a vector of f64
    pub fn read_f64_values(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<Vec<f64>> {
        if entry.field_type != field_types::DOUBLE {
            return Err(TiffError::UnsupportedFieldType(entry.field_type));
        }

        let payload = self.entry_payload(reader, entry)?;
        let handler = self.handler()?;
        let mut cursor = Cursor::new(payload);

        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            values.push(handler.read_f64(&mut cursor)?);
        }
        Ok(values)
    }

    /// Reads an ASCII entry as a string, trimming trailing NULs
    pub fn read_string_value(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<String> {
        let mut payload = self.entry_payload(reader, entry)?;
        string_utils::trim_trailing_nulls(&mut payload);

        String::from_utf8(payload)
            .map_err(|e| TiffError::GenericError(format!("Invalid ASCII tag value: {}", e)))
    }

    /// Reads a BYTE/UNDEFINED entry as raw bytes
    pub fn read_byte_values(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IfdEntry,
    ) -> TiffResult<Vec<u8>> {
        self.entry_payload(reader, entry)
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Gets the byte order of the current file, if detected
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }
}
