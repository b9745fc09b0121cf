//! COG layout computation and serialization
//!
//! Writing is a two-phase affair. The offset pass lays the file out in
//! its entirety — header, ghost area, every directory, the global strile
//! buffer, then each tile in interleave order — and records the new tile
//! offsets in the tree. The serialization pass then emits exactly those
//! bytes, forward-only, so the sink never needs to seek. If a 32-bit
//! layout overflows, the offset pass restarts once in BigTIFF mode.

use log::{debug, info};
use std::io::Write;

use crate::cog::config::Config;
use crate::cog::field::{self, TagData};
use crate::cog::ghost;
use crate::cog::ifd::{CogIfd, Slot};
use crate::cog::interleave::{LevelPlan, PlanarInterleaving, TileSequence};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::constants::header;
use crate::tiff::errors::TiffResult;

/// Writes the directory tree as a COG on `out`
pub(crate) fn write_cog(
    config: &Config,
    tree: &mut CogIfd,
    out: &mut dyn Write,
) -> TiffResult<()> {
    let handler = config.encoding.create_handler();
    let with_mask = tree.has_mask();

    let mut ghost_enabled = config.with_gdal_ghost_area;
    if ghost_enabled && tree.has_separate_planes() {
        // The GDAL reader does not support ghost framing for band-separate
        // imagery, so the toggle is forced off.
        info!("Separate-plane imagery present, writing without ghost areas");
        ghost_enabled = false;
    }

    let plans = build_plans(tree, config)?;

    let mut bigtiff = config.big_tiff;
    loop {
        tree.compute_structure(bigtiff);
        if compute_offsets(tree, &plans, bigtiff, ghost_enabled, with_mask) {
            break;
        }
        info!("32-bit tile offsets would overflow, restarting layout as BigTIFF");
        bigtiff = true;
    }

    serialize(
        tree,
        &plans,
        handler.as_ref(),
        config.encoding,
        bigtiff,
        ghost_enabled,
        with_mask,
        out,
    )
}

/// Resolves per-level geometry and plane ordering, lowest resolution first
pub(crate) fn build_plans(tree: &CogIfd, config: &Config) -> TiffResult<Vec<LevelPlan>> {
    let mut plans = Vec::with_capacity(tree.level_count());
    for level in (0..tree.level_count()).rev() {
        let image = tree.level(level);
        let has_mask = image.mask.is_some();
        let n_planes = image.n_planes();

        let interleaving = match &config.planar_interleaving {
            Some(custom) => {
                custom.validate(n_planes, has_mask)?;
                custom.clone()
            }
            None => PlanarInterleaving::default_for(n_planes, has_mask),
        };

        plans.push(LevelPlan {
            level,
            n_tiles_x: image.n_tiles_x(),
            n_tiles_y: image.n_tiles_y(),
            n_planes,
            has_mask,
            groups: interleaving.groups,
        });
    }
    Ok(plans)
}

/// Assigns an output offset to every tile of every directory
///
/// Returns false when a 32-bit layout overflows, asking the caller to
/// restart in BigTIFF mode; this is the only automatic promotion and it
/// happens at most once.
pub(crate) fn compute_offsets(
    tree: &mut CogIfd,
    plans: &[LevelPlan],
    bigtiff: bool,
    ghost_enabled: bool,
    with_mask: bool,
) -> bool {
    tree.for_each_dir_mut(|dir| {
        let tiles = dir.tile_byte_counts.len();
        if bigtiff {
            dir.new_tile_offsets64 = vec![0; tiles];
            dir.new_tile_offsets32 = Vec::new();
        } else {
            dir.new_tile_offsets32 = vec![0; tiles];
            dir.new_tile_offsets64 = Vec::new();
        }
    });

    let header_size = if bigtiff {
        header::BIGTIFF_HEADER_SIZE
    } else {
        header::TIFF_HEADER_SIZE
    };
    let mut data_offset = header_size + ghost::ghost_len(ghost_enabled, with_mask);
    for dir in tree.directories() {
        data_offset += dir.dir_bytes + dir.strile_bytes;
    }
    debug!("Tile data starts at offset {}", data_offset);

    for tile in TileSequence::new(plans) {
        let node = tree.node_mut(tile.level, tile.is_mask);
        let count = node.tile_byte_counts[tile.index] as u64;

        if count == 0 {
            // Sparse tile: offset stays zero.
            if bigtiff {
                node.new_tile_offsets64[tile.index] = 0;
            } else {
                node.new_tile_offsets32[tile.index] = 0;
            }
            continue;
        }

        if ghost_enabled {
            data_offset += ghost::TILE_LEADER_BYTES;
        }
        if !bigtiff && data_offset > u32::MAX as u64 {
            return false;
        }
        if bigtiff {
            node.new_tile_offsets64[tile.index] = data_offset;
        } else {
            node.new_tile_offsets32[tile.index] = data_offset as u32;
        }

        data_offset += count;
        if ghost_enabled {
            data_offset += ghost::TILE_TRAILER_BYTES;
        }
    }

    true
}

/// Emits the computed layout: header, ghost area, directories, strile
/// arrays, then the framed tile bodies
#[allow(clippy::too_many_arguments)]
fn serialize(
    tree: &mut CogIfd,
    plans: &[LevelPlan],
    handler: &dyn ByteOrderHandler,
    encoding: ByteOrder,
    bigtiff: bool,
    ghost_enabled: bool,
    with_mask: bool,
    out: &mut dyn Write,
) -> TiffResult<()> {
    let header_size = if bigtiff {
        header::BIGTIFF_HEADER_SIZE
    } else {
        header::TIFF_HEADER_SIZE
    };
    let ghost_len = ghost::ghost_len(ghost_enabled, with_mask);

    out.write_all(&encoding.marker())?;
    if bigtiff {
        handler.write_u16(out, header::BIG_TIFF_VERSION)?;
        handler.write_u16(out, header::BIGTIFF_OFFSET_SIZE)?;
        handler.write_u16(out, 0)?;
        handler.write_u64(out, header_size + ghost_len)?;
    } else {
        handler.write_u16(out, header::TIFF_VERSION)?;
        handler.write_u32(out, (header_size + ghost_len) as u32)?;
    }

    if ghost_enabled {
        out.write_all(ghost::ghost_block(with_mask))?;
    }

    let total_dir_bytes: u64 = tree.directories().iter().map(|dir| dir.dir_bytes).sum();
    let mut strile = TagData::new(header_size + ghost_len + total_dir_bytes);

    let dirs = tree.directories();
    let mut offset = header_size + ghost_len;
    let last = dirs.len() - 1;
    for (index, dir) in dirs.iter().copied().enumerate() {
        let next_offset = if index == last { 0 } else { offset + dir.dir_bytes };
        write_directory(out, handler, bigtiff, dir, offset, next_offset, &mut strile)?;
        offset += dir.dir_bytes;
    }

    out.write_all(strile.bytes())?;
    debug!("Wrote {} directories and {} strile bytes", last + 1, strile.len());

    let mut body = Vec::new();
    for tile in TileSequence::new(plans) {
        let node = tree.node_mut(tile.level, tile.is_mask);
        let count = node.tile_byte_counts[tile.index] as usize;
        if count == 0 {
            continue;
        }

        body.clear();
        body.resize(count, 0);
        node.load_tile(tile.index, &mut body)?;

        if ghost_enabled {
            // The leader is a little-endian u32 regardless of the file's
            // byte order.
            out.write_all(&(count as u32).to_le_bytes())?;
            out.write_all(&body)?;
            out.write_all(&ghost::tile_trailer(&body))?;
        } else {
            out.write_all(&body)?;
        }
    }

    Ok(())
}

/// Writes one directory: tag count, entries in ascending tag order, the
/// next-IFD pointer, then the per-directory overflow buffer
fn write_directory(
    out: &mut dyn Write,
    handler: &dyn ByteOrderHandler,
    bigtiff: bool,
    ifd: &CogIfd,
    offset: u64,
    next_offset: u64,
    strile: &mut TagData,
) -> TiffResult<()> {
    let dir_header = if bigtiff { 8 } else { 2 };
    let next_ptr = if bigtiff { 8 } else { 4 };
    let mut overflow = TagData::new(
        offset + dir_header + ifd.n_tags * field::entry_size(bigtiff) + next_ptr,
    );

    if bigtiff {
        handler.write_u64(out, ifd.n_tags)?;
    } else {
        handler.write_u16(out, ifd.n_tags as u16)?;
    }

    for (tag, slot) in ifd.slots() {
        match slot {
            Slot::Value(value) => {
                field::write_entry(out, handler, bigtiff, tag, &value, &mut overflow)?;
            }
            Slot::TileOffsets => {
                if bigtiff {
                    field::write_long8_array_entry(
                        out, handler, bigtiff, tag, &ifd.new_tile_offsets64, strile,
                    )?;
                } else {
                    field::write_long_array_entry(
                        out, handler, bigtiff, tag, &ifd.new_tile_offsets32, strile,
                    )?;
                }
            }
            Slot::TileByteCounts => {
                field::write_long_array_entry(
                    out, handler, bigtiff, tag, &ifd.tile_byte_counts, strile,
                )?;
            }
        }
    }

    if bigtiff {
        handler.write_u64(out, next_offset)?;
    } else {
        handler.write_u32(out, next_offset as u32)?;
    }

    out.write_all(overflow.bytes())?;
    Ok(())
}
