//! Image File Directory (IFD) structures and methods
//!
//! This module implements the raw IFD form produced by the parser: a list
//! of tag entries exactly as they appear in the file. Typed interpretation
//! of the recognized tags happens later, when a raw directory is turned
//! into a [`crate::cog::CogIfd`].

use std::collections::HashMap;
use std::fmt;
use crate::tiff::constants::field_types;
use log::trace;
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
///
/// An IFD contains metadata about an image, stored as a series of tag
/// entries. TIFF files can contain multiple IFDs, one per image; a COG
/// source typically chains the full-resolution image, its mask, and the
/// overview levels.
#[derive(Debug, Clone)]
pub struct Ifd {
    /// Entries in this IFD
    pub entries: Vec<IfdEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Cached tag values for quick lookup
    tag_map: HashMap<u16, IfdEntry>,
}

/// Represents an entry in an Image File Directory (IFD)
///
/// Each entry describes one aspect of the image using a tag-value pair.
/// Small payloads are stored directly in the entry's value slot; larger
/// ones live elsewhere in the file at `value_offset`. The raw slot bytes
/// are kept verbatim so inline multi-value payloads (for example three
/// inline SHORTs in BigTIFF) can be decoded with the file's byte order.
#[derive(Debug, Clone)]
pub struct IfdEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values, decoded with the file byte order
    pub value_offset: u64,
    /// The raw inline slot (4 bytes classic, 8 bytes BigTIFF, zero padded)
    pub raw_value: [u8; 8],
}

impl IfdEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64, raw_value: [u8; 8]) -> Self {
        trace!("New IFD entry: tag={} ({}), type={} ({}), count={}, offset/value={}",
               tag, tag_utils::tag_name(tag), field_type,
               tag_utils::field_type_name(field_type), count, value_offset);

        Self {
            tag,
            field_type,
            count,
            value_offset,
            raw_value,
        }
    }

    /// Get the size in bytes for a single value of this entry's field type
    pub fn field_type_size(&self) -> u64 {
        match self.field_type {
            field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
            field_types::SHORT | field_types::SSHORT => 2,
            field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
            field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
            _ => 1,
        }
    }

    /// Total payload size of this entry in bytes
    pub fn payload_size(&self) -> u64 {
        self.field_type_size() * self.count
    }

    /// Determines if the value is stored inline in the entry's value slot
    /// rather than at the offset location
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.payload_size() <= inline_size
    }
}

impl Ifd {
    /// Creates an empty directory with the given index and file offset
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry to this IFD and updates the lookup cache
    pub fn add_entry(&mut self, entry: IfdEntry) {
        self.tag_map.insert(entry.tag, entry.clone());
        self.entries.push(entry);
    }

    /// Gets a tag's value/offset field directly
    pub fn tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn entry(&self, tag: u16) -> Option<&IfdEntry> {
        self.tag_map.get(&tag)
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;
        for entry in &self.entries {
            writeln!(f, "    {} ({}): count={} value/offset={} [{}]",
                     entry.tag, tag_utils::tag_name(entry.tag), entry.count,
                     entry.value_offset, tag_utils::field_type_name(entry.field_type))?;
        }
        Ok(())
    }
}
