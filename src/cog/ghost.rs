//! GDAL ghost area and tile framing
//!
//! GDAL stores a block of textual "structural metadata" between the file
//! header and the first directory, plus a 4-byte size leader and a 4-byte
//! trailer around every tile body. Together these let a range reader
//! fetch a tile in a single round trip without parsing the directory
//! first. The block contents are fixed ASCII; the declared size counts
//! everything after the first line, and the trailing whitespace keeps the
//! following offset word aligned.

/// Ghost block for trees without a mask (184 bytes total)
const GHOST_AREA: &str = concat!(
    "GDAL_STRUCTURAL_METADATA_SIZE=000140 bytes\n",
    "LAYOUT=IFDS_BEFORE_DATA\n",
    "BLOCK_ORDER=ROW_MAJOR\n",
    "BLOCK_LEADER=SIZE_AS_UINT4\n",
    "BLOCK_TRAILER=LAST_4_BYTES_REPEATED\n",
    // The space after this line reserves room to flip NO to YES in place.
    "KNOWN_INCOMPATIBLE_EDITION=NO\n",
    "  ",
);

/// Ghost block for trees carrying a mask (218 bytes total)
const GHOST_AREA_MASK: &str = concat!(
    "GDAL_STRUCTURAL_METADATA_SIZE=000174 bytes\n",
    "LAYOUT=IFDS_BEFORE_DATA\n",
    "BLOCK_ORDER=ROW_MAJOR\n",
    "BLOCK_LEADER=SIZE_AS_UINT4\n",
    "BLOCK_TRAILER=LAST_4_BYTES_REPEATED\n",
    "KNOWN_INCOMPATIBLE_EDITION=NO\n",
    " MASK_INTERLEAVED_WITH_IMAGERY=YES\n",
    " ",
);

/// Bytes the leader adds before each non-sparse tile body
pub(crate) const TILE_LEADER_BYTES: u64 = 4;

/// Bytes the trailer adds after each non-sparse tile body
pub(crate) const TILE_TRAILER_BYTES: u64 = 4;

/// The ghost block to emit for a tree with or without a mask
pub(crate) fn ghost_block(with_mask: bool) -> &'static [u8] {
    if with_mask {
        GHOST_AREA_MASK.as_bytes()
    } else {
        GHOST_AREA.as_bytes()
    }
}

/// Length of the ghost block, or zero when ghost areas are disabled
pub(crate) fn ghost_len(enabled: bool, with_mask: bool) -> u64 {
    if enabled {
        ghost_block(with_mask).len() as u64
    } else {
        0
    }
}

/// The 4-byte trailer for a tile body: its last four bytes repeated
///
/// Degenerate bodies shorter than four bytes land right-aligned in a
/// zeroed trailer.
pub(crate) fn tile_trailer(body: &[u8]) -> [u8; 4] {
    let mut trailer = [0u8; 4];
    let take = body.len().min(4);
    trailer[4 - take..].copy_from_slice(&body[body.len() - take..]);
    trailer
}
