//! Tests for the directory entry codec

use crate::cog::field::{self, TagData, TagValue};
use crate::io::byte_order::ByteOrder;

#[test]
fn test_inline_capacities_classic() {
    // Largest payloads that still fit the 4-byte slot.
    assert_eq!(TagValue::Byte(vec![0; 4]).field_size(false), 12);
    assert_eq!(TagValue::Byte(vec![0; 5]).field_size(false), 12 + 5);
    assert_eq!(TagValue::Ascii("abc".to_string()).field_size(false), 12);
    assert_eq!(TagValue::Ascii("abcd".to_string()).field_size(false), 12 + 5);
    assert_eq!(TagValue::Short(vec![0; 2]).field_size(false), 12);
    assert_eq!(TagValue::Short(vec![0; 3]).field_size(false), 12 + 6);
    assert_eq!(TagValue::Long(vec![0; 1]).field_size(false), 12);
    assert_eq!(TagValue::Long(vec![0; 2]).field_size(false), 12 + 8);
    // 8-byte types never fit a classic slot.
    assert_eq!(TagValue::Long8(vec![0; 1]).field_size(false), 12 + 8);
    assert_eq!(TagValue::Double(vec![0.0; 1]).field_size(false), 12 + 8);
}

#[test]
fn test_inline_capacities_bigtiff() {
    assert_eq!(TagValue::Byte(vec![0; 8]).field_size(true), 20);
    assert_eq!(TagValue::Byte(vec![0; 9]).field_size(true), 20 + 9);
    assert_eq!(TagValue::Ascii("abcdefg".to_string()).field_size(true), 20);
    assert_eq!(TagValue::Ascii("abcdefgh".to_string()).field_size(true), 20 + 9);
    assert_eq!(TagValue::Short(vec![0; 4]).field_size(true), 20);
    assert_eq!(TagValue::Long(vec![0; 2]).field_size(true), 20);
    assert_eq!(TagValue::Long8(vec![0; 1]).field_size(true), 20);
    assert_eq!(TagValue::Long8(vec![0; 2]).field_size(true), 20 + 16);
    assert_eq!(TagValue::Double(vec![0.0; 1]).field_size(true), 20);
}

#[test]
fn test_ascii_count_includes_nul() {
    let value = TagValue::Ascii("abc".to_string());
    assert_eq!(value.count(), 4);
}

#[test]
fn test_write_scalar_short_entry() {
    let handler = ByteOrder::LittleEndian.create_handler();
    let mut overflow = TagData::new(1000);
    let mut out = Vec::new();

    field::write_entry(
        &mut out,
        handler.as_ref(),
        false,
        259,
        &TagValue::Short(vec![5]),
        &mut overflow,
    )
    .unwrap();

    assert_eq!(out.len(), 12);
    assert_eq!(&out[0..2], &259u16.to_le_bytes());
    assert_eq!(&out[2..4], &3u16.to_le_bytes()); // SHORT
    assert_eq!(&out[4..8], &1u32.to_le_bytes());
    assert_eq!(&out[8..10], &5u16.to_le_bytes());
    assert_eq!(&out[10..12], &[0, 0]); // zero padding
    assert_eq!(overflow.len(), 0);
}

#[test]
fn test_write_overflow_routing() {
    let handler = ByteOrder::LittleEndian.create_handler();
    let mut overflow = TagData::new(1000);
    let mut out = Vec::new();

    field::write_entry(
        &mut out,
        handler.as_ref(),
        false,
        269,
        &TagValue::Ascii("abcdef".to_string()),
        &mut overflow,
    )
    .unwrap();

    // Slot holds the overflow offset; payload landed in the buffer.
    assert_eq!(&out[8..12], &1000u32.to_le_bytes());
    assert_eq!(overflow.bytes(), b"abcdef\0");
    assert_eq!(overflow.next_offset(), 1007);

    // A second oversized value lands right after the first.
    let mut out2 = Vec::new();
    field::write_entry(
        &mut out2,
        handler.as_ref(),
        false,
        306,
        &TagValue::Double(vec![1.5]),
        &mut overflow,
    )
    .unwrap();
    assert_eq!(&out2[8..12], &1007u32.to_le_bytes());
    assert_eq!(overflow.len(), 7 + 8);
}

#[test]
fn test_big_endian_entry_encoding() {
    let handler = ByteOrder::BigEndian.create_handler();
    let mut overflow = TagData::new(0);
    let mut out = Vec::new();

    field::write_entry(
        &mut out,
        handler.as_ref(),
        false,
        256,
        &TagValue::Long(vec![640]),
        &mut overflow,
    )
    .unwrap();

    assert_eq!(&out[0..2], &256u16.to_be_bytes());
    assert_eq!(&out[4..8], &1u32.to_be_bytes());
    assert_eq!(&out[8..12], &640u32.to_be_bytes());
}

#[test]
fn test_long_array_entry_inline_and_overflow() {
    let handler = ByteOrder::LittleEndian.create_handler();

    // One LONG fits the classic slot.
    let mut strile = TagData::new(500);
    let mut out = Vec::new();
    field::write_long_array_entry(&mut out, handler.as_ref(), false, 324, &[77], &mut strile)
        .unwrap();
    assert_eq!(&out[8..12], &77u32.to_le_bytes());
    assert_eq!(strile.len(), 0);

    // Four LONGs spill to the strile buffer.
    let mut out = Vec::new();
    field::write_long_array_entry(
        &mut out,
        handler.as_ref(),
        false,
        324,
        &[1, 2, 3, 4],
        &mut strile,
    )
    .unwrap();
    assert_eq!(&out[8..12], &500u32.to_le_bytes());
    assert_eq!(strile.len(), 16);
}

#[test]
fn test_array_field_size_matches_tag_values() {
    for count in [0u64, 1, 2, 3, 4, 5, 9] {
        let value = TagValue::Long(vec![0; count as usize]);
        assert_eq!(
            field::array_field_size(4, count, false),
            value.field_size(false)
        );
        assert_eq!(
            field::array_field_size(4, count, true),
            value.field_size(true)
        );
    }
}
