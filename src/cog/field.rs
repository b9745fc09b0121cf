//! Directory entry codec
//!
//! A TIFF directory entry is a fixed-width record: 12 bytes in classic
//! TIFF, 20 in BigTIFF. Payloads that fit the entry's value slot (4 or 8
//! bytes) are stored inline, zero padded; larger payloads are appended to
//! an overflow buffer and the slot holds their absolute file offset. This
//! module sizes and encodes entries for both layouts so the structure
//! planner and the writer agree byte-for-byte.

use std::io::Write;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::field_types;
use crate::tiff::errors::TiffResult;

/// Fixed entry size for the given addressing mode
pub(crate) fn entry_size(bigtiff: bool) -> u64 {
    if bigtiff { 20 } else { 12 }
}

/// Inline value slot size for the given addressing mode
pub(crate) fn slot_size(bigtiff: bool) -> u64 {
    if bigtiff { 8 } else { 4 }
}

/// Size of an array entry: the fixed record, plus the payload when it
/// cannot be stored inline
pub(crate) fn array_field_size(elem_size: u64, count: u64, bigtiff: bool) -> u64 {
    let payload = elem_size * count;
    if payload <= slot_size(bigtiff) {
        entry_size(bigtiff)
    } else {
        entry_size(bigtiff) + payload
    }
}

/// An overflow buffer plus the absolute file offset of its first byte
///
/// Two of these exist while a directory tree is serialized: one per
/// directory for ordinary oversized payloads, and a single global one for
/// the tile offset/byte-count arrays placed after all directories.
pub(crate) struct TagData {
    offset: u64,
    buf: Vec<u8>,
}

impl TagData {
    pub fn new(offset: u64) -> Self {
        TagData { offset, buf: Vec::new() }
    }

    /// The file offset the next appended payload will land on
    pub fn next_offset(&self) -> u64 {
        self.offset + self.buf.len() as u64
    }

    pub fn extend(&mut self, payload: &[u8]) {
        self.buf.extend_from_slice(payload);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

/// A typed tag payload, covering the shapes the recognized tag set emits
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// BYTE[] (also used for UNDEFINED payloads like JPEGTables)
    Byte(Vec<u8>),
    /// ASCII, emitted with a trailing NUL included in the count
    Ascii(String),
    /// SHORT[]
    Short(Vec<u16>),
    /// LONG[]
    Long(Vec<u32>),
    /// LONG8[] (BigTIFF only on the wire; classic layouts spill it)
    Long8(Vec<u64>),
    /// DOUBLE[]
    Double(Vec<f64>),
}

impl TagValue {
    /// TIFF type code for this payload
    pub fn type_code(&self) -> u16 {
        match self {
            TagValue::Byte(_) => field_types::BYTE,
            TagValue::Ascii(_) => field_types::ASCII,
            TagValue::Short(_) => field_types::SHORT,
            TagValue::Long(_) => field_types::LONG,
            TagValue::Long8(_) => field_types::LONG8,
            TagValue::Double(_) => field_types::DOUBLE,
        }
    }

    /// Value count as written to the entry; ASCII counts its NUL byte
    pub fn count(&self) -> u64 {
        match self {
            TagValue::Byte(v) => v.len() as u64,
            TagValue::Ascii(s) => s.len() as u64 + 1,
            TagValue::Short(v) => v.len() as u64,
            TagValue::Long(v) => v.len() as u64,
            TagValue::Long8(v) => v.len() as u64,
            TagValue::Double(v) => v.len() as u64,
        }
    }

    /// Size of a single element in bytes
    pub fn elem_size(&self) -> u64 {
        match self {
            TagValue::Byte(_) | TagValue::Ascii(_) => 1,
            TagValue::Short(_) => 2,
            TagValue::Long(_) => 4,
            TagValue::Long8(_) | TagValue::Double(_) => 8,
        }
    }

    /// Total payload size in bytes
    pub fn payload_size(&self) -> u64 {
        self.elem_size() * self.count()
    }

    /// Bytes this value occupies in a directory: the fixed entry when the
    /// payload fits inline, entry plus payload otherwise
    pub fn field_size(&self, bigtiff: bool) -> u64 {
        if self.payload_size() <= slot_size(bigtiff) {
            entry_size(bigtiff)
        } else {
            entry_size(bigtiff) + self.payload_size()
        }
    }

    /// Encodes the payload elements in the configured byte order
    fn encode_payload(&self, handler: &dyn ByteOrderHandler) -> TiffResult<Vec<u8>> {
        let mut payload = Vec::with_capacity(self.payload_size() as usize);
        match self {
            TagValue::Byte(v) => payload.extend_from_slice(v),
            TagValue::Ascii(s) => {
                payload.extend_from_slice(s.as_bytes());
                payload.push(0);
            }
            TagValue::Short(v) => {
                for &x in v {
                    handler.write_u16(&mut payload, x)?;
                }
            }
            TagValue::Long(v) => {
                for &x in v {
                    handler.write_u32(&mut payload, x)?;
                }
            }
            TagValue::Long8(v) => {
                for &x in v {
                    handler.write_u64(&mut payload, x)?;
                }
            }
            TagValue::Double(v) => {
                for &x in v {
                    handler.write_f64(&mut payload, x)?;
                }
            }
        }
        Ok(payload)
    }
}

/// Writes one directory entry, routing oversized payloads to `overflow`
pub(crate) fn write_entry(
    out: &mut dyn Write,
    handler: &dyn ByteOrderHandler,
    bigtiff: bool,
    tag: u16,
    value: &TagValue,
    overflow: &mut TagData,
) -> TiffResult<()> {
    handler.write_u16(out, tag)?;
    handler.write_u16(out, value.type_code())?;
    if bigtiff {
        handler.write_u64(out, value.count())?;
    } else {
        handler.write_u32(out, value.count() as u32)?;
    }

    let payload = value.encode_payload(handler)?;
    write_slot(out, handler, bigtiff, &payload, overflow)
}

/// Writes a LONG[] entry from a borrowed slice
///
/// Used for the tile byte-count array (and classic-mode tile offsets),
/// which are large enough that building a `TagValue` copy would double
/// their memory.
pub(crate) fn write_long_array_entry(
    out: &mut dyn Write,
    handler: &dyn ByteOrderHandler,
    bigtiff: bool,
    tag: u16,
    values: &[u32],
    target: &mut TagData,
) -> TiffResult<()> {
    handler.write_u16(out, tag)?;
    handler.write_u16(out, field_types::LONG)?;
    if bigtiff {
        handler.write_u64(out, values.len() as u64)?;
    } else {
        handler.write_u32(out, values.len() as u32)?;
    }

    let mut payload = Vec::with_capacity(values.len() * 4);
    for &x in values {
        handler.write_u32(&mut payload, x)?;
    }
    write_slot(out, handler, bigtiff, &payload, target)
}

/// Writes a LONG8[] entry from a borrowed slice (BigTIFF tile offsets)
pub(crate) fn write_long8_array_entry(
    out: &mut dyn Write,
    handler: &dyn ByteOrderHandler,
    bigtiff: bool,
    tag: u16,
    values: &[u64],
    target: &mut TagData,
) -> TiffResult<()> {
    handler.write_u16(out, tag)?;
    handler.write_u16(out, field_types::LONG8)?;
    if bigtiff {
        handler.write_u64(out, values.len() as u64)?;
    } else {
        handler.write_u32(out, values.len() as u32)?;
    }

    let mut payload = Vec::with_capacity(values.len() * 8);
    for &x in values {
        handler.write_u64(&mut payload, x)?;
    }
    write_slot(out, handler, bigtiff, &payload, target)
}

/// Writes the entry's value slot: inline and zero padded when the payload
/// fits, otherwise the offset of the payload appended to `target`
fn write_slot(
    out: &mut dyn Write,
    handler: &dyn ByteOrderHandler,
    bigtiff: bool,
    payload: &[u8],
    target: &mut TagData,
) -> TiffResult<()> {
    let slot = slot_size(bigtiff) as usize;
    if payload.len() <= slot {
        out.write_all(payload)?;
        const ZEROS: [u8; 8] = [0; 8];
        out.write_all(&ZEROS[..slot - payload.len()])?;
    } else {
        let offset = target.next_offset();
        if bigtiff {
            handler.write_u64(out, offset)?;
        } else {
            handler.write_u32(out, offset as u32)?;
        }
        target.extend(payload);
    }
    Ok(())
}
