//! Rewrite configuration

use std::io::Write;

use crate::cog::ifd::CogIfd;
use crate::cog::interleave::PlanarInterleaving;
use crate::cog::{loader, writer};
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::errors::TiffResult;

/// Options controlling a rewrite
///
/// The defaults produce a little-endian file, promote to BigTIFF only
/// when needed, and include the GDAL ghost area.
#[derive(Clone)]
pub struct Config {
    /// Output byte order
    pub encoding: ByteOrder,
    /// Force 64-bit addressing even when 32-bit offsets would suffice
    pub big_tiff: bool,
    /// Include the ghost area and per-tile leader/trailer framing
    ///
    /// Forced off when the tree contains separate-plane imagery, which
    /// the GDAL reader does not support in combination with ghost
    /// framing.
    pub with_gdal_ghost_area: bool,
    /// Override the default plane/mask emission order
    pub planar_interleaving: Option<PlanarInterleaving>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            encoding: ByteOrder::LittleEndian,
            big_tiff: false,
            with_gdal_ghost_area: true,
            planar_interleaving: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the inputs and rewrites them as a single COG on `out`
    ///
    /// The first reader must hold the full-resolution image; additional
    /// readers supply externally built overviews.
    pub fn rewrite(
        &self,
        readers: Vec<Box<dyn SeekableReader>>,
        out: &mut dyn Write,
    ) -> TiffResult<()> {
        loader::rewrite(self, readers, out)
    }

    /// Rewrites an already-assembled directory tree as a COG on `out`
    ///
    /// This is the entry point for trees built by
    /// [`crate::cog::Stripper::assemble_strips`] rather than parsed from
    /// a file.
    pub fn rewrite_tree(&self, tree: &mut CogIfd, out: &mut dyn Write) -> TiffResult<()> {
        writer::write_cog(self, tree, out)
    }
}
