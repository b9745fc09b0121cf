//! Integration tests for the TIFF parsing layer

use std::io::Cursor;

use cogkit::TiffReader;

#[test]
fn test_complete_tiff_workflow() {
    // Create a sample TIFF file in memory
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.extend_from_slice(&[0x49, 0x49]); // "II" for little-endian
    buffer.extend_from_slice(&[42, 0]); // TIFF magic number
    buffer.extend_from_slice(&[8, 0, 0, 0]); // Offset to first IFD

    // IFD with two entries
    buffer.extend_from_slice(&[2, 0]); // Number of entries

    // Entry 1: ImageWidth (tag 256)
    buffer.extend_from_slice(&[0, 1]); // Tag (256)
    buffer.extend_from_slice(&[4, 0]); // Type (LONG)
    buffer.extend_from_slice(&[1, 0, 0, 0]); // Count
    buffer.extend_from_slice(&[200, 0, 0, 0]); // Value (width = 200)

    // Entry 2: ImageLength (tag 257)
    buffer.extend_from_slice(&[1, 1]); // Tag (257)
    buffer.extend_from_slice(&[4, 0]); // Type (LONG)
    buffer.extend_from_slice(&[1, 0, 0, 0]); // Count
    buffer.extend_from_slice(&[100, 0, 0, 0]); // Value (height = 100)

    // Next IFD offset (0 = no more IFDs)
    buffer.extend_from_slice(&[0, 0, 0, 0]);

    let mut cursor = Cursor::new(buffer);
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).expect("parse failed");
    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.ifds.len(), 1);

    let ifd = &tiff.ifds[0];
    assert_eq!(ifd.entries.len(), 2);
    assert_eq!(ifd.tag_value(256), Some(200));
    assert_eq!(ifd.tag_value(257), Some(100));
}

#[test]
fn test_ifd_chain() {
    // Two chained IFDs, each with a single ImageWidth entry.
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&[0x49, 0x49]);
    buffer.extend_from_slice(&[42, 0]);
    buffer.extend_from_slice(&[8, 0, 0, 0]);

    // First IFD at offset 8, linking to the second at offset 26.
    buffer.extend_from_slice(&[1, 0]);
    buffer.extend_from_slice(&[0, 1]);
    buffer.extend_from_slice(&[4, 0]);
    buffer.extend_from_slice(&[1, 0, 0, 0]);
    buffer.extend_from_slice(&[64, 0, 0, 0]);
    buffer.extend_from_slice(&[26, 0, 0, 0]);

    // Second IFD.
    buffer.extend_from_slice(&[1, 0]);
    buffer.extend_from_slice(&[0, 1]);
    buffer.extend_from_slice(&[4, 0]);
    buffer.extend_from_slice(&[1, 0, 0, 0]);
    buffer.extend_from_slice(&[32, 0, 0, 0]);
    buffer.extend_from_slice(&[0, 0, 0, 0]);

    let mut cursor = Cursor::new(buffer);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).expect("parse failed");

    assert_eq!(tiff.ifds.len(), 2);
    assert_eq!(tiff.ifds[0].tag_value(256), Some(64));
    assert_eq!(tiff.ifds[1].tag_value(256), Some(32));
}
