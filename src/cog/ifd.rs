//! Typed directory model for the rewriting engine
//!
//! A [`CogIfd`] holds the recognized tags of one directory as typed
//! fields, the derived tile geometry, the relationships to its mask and
//! overviews, and the tile source used to read compressed tile bodies at
//! write time. The structure planner in this module computes how many
//! bytes a directory occupies on disk for a given addressing mode, which
//! the offset computer and the writer both rely on.

use log::debug;

use crate::cog::field::{self, TagValue};
use crate::tiff::constants::{planar_config, subfile_type, tags};
use crate::tiff::errors::{TiffError, TiffResult};

/// Source of compressed tile bodies
///
/// The writer calls this at emit time, once per non-sparse tile, with a
/// buffer sized to the tile's byte count. Implementations pair a reader
/// handle with the directory's input offset arrays; the strip assembler
/// provides one that dispatches to the owning strip instead.
pub trait TileSource {
    /// Reads the compressed bytes of tile `index` into `buf`
    fn load_tile(&mut self, index: usize, buf: &mut [u8]) -> TiffResult<()>;
}

/// How a tag is routed when a directory is serialized
pub(crate) enum Slot {
    /// Ordinary tag: inline or per-directory overflow
    Value(TagValue),
    /// Tile offsets: entry in the directory, payload in the global strile buffer
    TileOffsets,
    /// Tile byte counts: entry in the directory, payload in the global strile buffer
    TileByteCounts,
}

/// One directory of the output tree, with typed tags and relationships
///
/// The full-resolution directory owns the overview list; every image
/// directory may own a single-band mask. Masks own nothing.
pub struct CogIfd {
    pub subfile_type: u32,
    pub image_width: u64,
    pub image_height: u64,
    pub bits_per_sample: Vec<u16>,
    pub compression: u16,
    pub photometric_interpretation: u16,
    pub document_name: String,
    pub samples_per_pixel: u16,
    pub planar_configuration: u16,
    pub date_time: String,
    pub predictor: u16,
    pub colormap: Vec<u16>,
    pub tile_width: u16,
    pub tile_height: u16,
    /// Tile offsets in the input file; output offsets are computed
    pub tile_offsets: Vec<u64>,
    pub tile_byte_counts: Vec<u32>,
    pub extra_samples: Vec<u16>,
    pub sample_format: Vec<u16>,
    pub jpeg_tables: Vec<u8>,
    pub model_pixel_scale: Vec<f64>,
    pub model_tie_point: Vec<f64>,
    pub model_transformation: Vec<f64>,
    pub geo_key_directory: Vec<u16>,
    pub geo_double_params: Vec<f64>,
    pub geo_ascii_params: String,
    pub gdal_metadata: String,
    pub nodata: String,
    pub lerc_params: Vec<u32>,
    pub rpc_coefficients: Vec<f64>,

    /// Transparency mask paired with this directory
    pub mask: Option<Box<CogIfd>>,
    /// Reduced-resolution levels, descending; populated on the root only
    pub overviews: Vec<CogIfd>,

    pub(crate) tile_source: Option<Box<dyn TileSource>>,

    // Computed during offset assignment
    pub(crate) new_tile_offsets32: Vec<u32>,
    pub(crate) new_tile_offsets64: Vec<u64>,

    // Computed by the structure planner
    pub(crate) n_tags: u64,
    pub(crate) dir_bytes: u64,
    pub(crate) strile_bytes: u64,
}

impl Default for CogIfd {
    fn default() -> Self {
        CogIfd {
            subfile_type: 0,
            image_width: 0,
            image_height: 0,
            bits_per_sample: Vec::new(),
            compression: 0,
            photometric_interpretation: 0,
            document_name: String::new(),
            samples_per_pixel: 0,
            planar_configuration: 0,
            date_time: String::new(),
            predictor: 0,
            colormap: Vec::new(),
            tile_width: 0,
            tile_height: 0,
            tile_offsets: Vec::new(),
            tile_byte_counts: Vec::new(),
            extra_samples: Vec::new(),
            sample_format: Vec::new(),
            jpeg_tables: Vec::new(),
            model_pixel_scale: Vec::new(),
            model_tie_point: Vec::new(),
            model_transformation: Vec::new(),
            geo_key_directory: Vec::new(),
            geo_double_params: Vec::new(),
            geo_ascii_params: String::new(),
            gdal_metadata: String::new(),
            nodata: String::new(),
            lerc_params: Vec::new(),
            rpc_coefficients: Vec::new(),
            mask: None,
            overviews: Vec::new(),
            tile_source: None,
            new_tile_offsets32: Vec::new(),
            new_tile_offsets64: Vec::new(),
            n_tags: 0,
            dir_bytes: 0,
            strile_bytes: 0,
        }
    }
}

impl CogIfd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tile columns
    pub fn n_tiles_x(&self) -> u64 {
        if self.tile_width == 0 {
            return 0;
        }
        (self.image_width + self.tile_width as u64 - 1) / self.tile_width as u64
    }

    /// Number of tile rows
    pub fn n_tiles_y(&self) -> u64 {
        if self.tile_height == 0 {
            return 0;
        }
        (self.image_height + self.tile_height as u64 - 1) / self.tile_height as u64
    }

    /// Number of separately-stored planes: the sample count for
    /// separate-plane imagery, one otherwise
    pub fn n_planes(&self) -> usize {
        if self.planar_configuration == planar_config::SEPARATE {
            self.samples_per_pixel.max(1) as usize
        } else {
            1
        }
    }

    /// Tile count implied by the geometry
    pub fn expected_tile_count(&self) -> u64 {
        self.n_tiles_x() * self.n_tiles_y() * self.n_planes() as u64
    }

    /// Flat tile index for a `(x, y, plane)` position
    pub fn tile_index(&self, x: u64, y: u64, plane: usize) -> usize {
        (plane as u64 * self.n_tiles_x() * self.n_tiles_y() + y * self.n_tiles_x() + x) as usize
    }

    /// Inverse of [`CogIfd::tile_index`]
    pub fn tile_from_index(&self, index: usize) -> (u64, u64, usize) {
        let tiles_per_plane = self.n_tiles_x() * self.n_tiles_y();
        let plane = index as u64 / tiles_per_plane;
        let rem = index as u64 % tiles_per_plane;
        (rem % self.n_tiles_x(), rem / self.n_tiles_x(), plane as usize)
    }

    /// Installs the tile source used to read this directory's tile bodies
    pub fn set_tile_source(&mut self, source: Box<dyn TileSource>) {
        self.tile_source = Some(source);
    }

    /// Reads the compressed bytes of tile `index` into `buf`
    ///
    /// The buffer length must equal the tile's byte count; a mismatch is
    /// a caller bug and aborts the write.
    pub fn load_tile(&mut self, index: usize, buf: &mut [u8]) -> TiffResult<()> {
        if index >= self.tile_byte_counts.len()
            || buf.len() != self.tile_byte_counts[index] as usize
        {
            return Err(TiffError::GenericError(format!(
                "tile buffer size mismatch for tile {}",
                index
            )));
        }
        match self.tile_source.as_mut() {
            Some(source) => source.load_tile(index, buf),
            None => Err(TiffError::GenericError(
                "directory has no tile source".to_string(),
            )),
        }
    }

    /// Attaches a reduced-resolution level below the current lowest one
    ///
    /// The overview must be strictly smaller than the current lowest
    /// level and share the root's band layout. Geospatial tags on the
    /// attached directory are dropped; the root carries them for the
    /// whole tree.
    pub fn add_overview(&mut self, mut overview: CogIfd) -> TiffResult<()> {
        if overview.mask.is_some() || !overview.overviews.is_empty() {
            return Err(TiffError::InvalidOverview(
                "overview already has masks or overviews attached".to_string(),
            ));
        }

        let head = self.overviews.last().unwrap_or(&*self);
        if overview.image_width >= head.image_width
            || overview.image_height >= head.image_height
        {
            return Err(TiffError::InvalidOverview(format!(
                "{}x{} is not strictly smaller than {}x{}",
                overview.image_width, overview.image_height,
                head.image_width, head.image_height
            )));
        }

        if overview.samples_per_pixel != self.samples_per_pixel {
            return Err(TiffError::InconsistentBandCount {
                expected: self.samples_per_pixel,
                actual: overview.samples_per_pixel,
            });
        }
        if overview.bits_per_sample.len() != self.bits_per_sample.len() {
            return Err(TiffError::InvalidOverview(format!(
                "bits-per-sample length {} does not match {}",
                overview.bits_per_sample.len(),
                self.bits_per_sample.len()
            )));
        }

        overview.subfile_type = subfile_type::REDUCED_IMAGE;
        overview.clear_geo_tags();
        self.overviews.push(overview);
        Ok(())
    }

    /// Attaches a transparency mask to this directory
    pub fn add_mask(&mut self, mut mask: CogIfd) -> TiffResult<()> {
        if mask.mask.is_some() || !mask.overviews.is_empty() {
            return Err(TiffError::InvalidMask(
                "mask has masks or overviews of its own".to_string(),
            ));
        }
        if mask.n_planes() != 1 || mask.samples_per_pixel > 1 {
            return Err(TiffError::InvalidMask(format!(
                "mask must be single band, has {} samples per pixel",
                mask.samples_per_pixel
            )));
        }
        if mask.bits_per_sample.len() > 1 {
            return Err(TiffError::InvalidMask(
                "mask must carry a single bits-per-sample value".to_string(),
            ));
        }
        if mask.image_width != self.image_width
            || mask.image_height != self.image_height
            || mask.tile_width != self.tile_width
            || mask.tile_height != self.tile_height
        {
            return Err(TiffError::InvalidMask(
                "mask size/tiling must match its parent".to_string(),
            ));
        }
        if mask.tile_byte_counts.len() * self.n_planes() != self.tile_byte_counts.len() {
            return Err(TiffError::InvalidMask(format!(
                "mask holds {} tiles for a parent with {}",
                mask.tile_byte_counts.len(),
                self.tile_byte_counts.len()
            )));
        }

        mask.subfile_type = match self.subfile_type {
            subfile_type::NONE => subfile_type::MASK,
            subfile_type::REDUCED_IMAGE => subfile_type::MASK | subfile_type::REDUCED_IMAGE,
            other => {
                return Err(TiffError::InvalidMask(format!(
                    "cannot attach a mask to subfile type {}",
                    other
                )))
            }
        };
        mask.clear_geo_tags();
        self.mask = Some(Box::new(mask));
        Ok(())
    }

    /// Drops the geospatial reference tags
    ///
    /// Attached overviews and masks inherit georeferencing from the root
    /// directory; keeping their own copies would let them drift.
    fn clear_geo_tags(&mut self) {
        self.model_pixel_scale.clear();
        self.model_tie_point.clear();
        self.model_transformation.clear();
        self.geo_key_directory.clear();
        self.geo_double_params.clear();
        self.geo_ascii_params.clear();
    }

    /// Number of resolution levels in this tree (root plus overviews)
    pub fn level_count(&self) -> usize {
        1 + self.overviews.len()
    }

    /// The image directory of a level (0 = full resolution)
    pub fn level(&self, index: usize) -> &CogIfd {
        if index == 0 {
            self
        } else {
            &self.overviews[index - 1]
        }
    }

    /// Mutable access to a level's image or mask directory
    pub(crate) fn node_mut(&mut self, level: usize, is_mask: bool) -> &mut CogIfd {
        let image = if level == 0 {
            self
        } else {
            &mut self.overviews[level - 1]
        };
        if is_mask {
            image.mask.as_mut().map(|m| m.as_mut()).unwrap_or_else(|| {
                unreachable!("tile sequence referenced a level without a mask")
            })
        } else {
            image
        }
    }

    /// All directories of the tree in output order:
    /// main, main's mask, then each overview followed by its mask
    pub(crate) fn directories(&self) -> Vec<&CogIfd> {
        let mut dirs = Vec::with_capacity(self.level_count() * 2);
        for level in 0..self.level_count() {
            let image = self.level(level);
            dirs.push(image);
            if let Some(mask) = image.mask.as_deref() {
                dirs.push(mask);
            }
        }
        dirs
    }

    /// Whether any directory of the tree carries a mask
    pub fn has_mask(&self) -> bool {
        (0..self.level_count()).any(|level| self.level(level).mask.is_some())
    }

    /// Whether any directory stores its planes separately
    pub fn has_separate_planes(&self) -> bool {
        self.directories()
            .iter()
            .any(|dir| dir.planar_configuration == planar_config::SEPARATE)
    }

    /// The serialized form of this directory's tags, ascending by tag id
    ///
    /// PhotometricInterpretation is always present, whatever its value;
    /// every other tag is emitted only when non-zero / non-empty. The two
    /// tile arrays are routed to the global strile buffer.
    pub(crate) fn slots(&self) -> Vec<(u16, Slot)> {
        let mut slots: Vec<(u16, Slot)> = Vec::with_capacity(24);

        if self.subfile_type > 0 {
            slots.push((tags::SUBFILE_TYPE, Slot::Value(TagValue::Long(vec![self.subfile_type]))));
        }
        if self.image_width > 0 {
            slots.push((tags::IMAGE_WIDTH, Slot::Value(TagValue::Long(vec![self.image_width as u32]))));
        }
        if self.image_height > 0 {
            slots.push((tags::IMAGE_LENGTH, Slot::Value(TagValue::Long(vec![self.image_height as u32]))));
        }
        if !self.bits_per_sample.is_empty() {
            slots.push((tags::BITS_PER_SAMPLE, Slot::Value(TagValue::Short(self.bits_per_sample.clone()))));
        }
        if self.compression > 0 {
            slots.push((tags::COMPRESSION, Slot::Value(TagValue::Short(vec![self.compression]))));
        }
        slots.push((
            tags::PHOTOMETRIC_INTERPRETATION,
            Slot::Value(TagValue::Short(vec![self.photometric_interpretation])),
        ));
        if !self.document_name.is_empty() {
            slots.push((tags::DOCUMENT_NAME, Slot::Value(TagValue::Ascii(self.document_name.clone()))));
        }
        if self.samples_per_pixel > 0 {
            slots.push((tags::SAMPLES_PER_PIXEL, Slot::Value(TagValue::Short(vec![self.samples_per_pixel]))));
        }
        if self.planar_configuration > 0 {
            slots.push((tags::PLANAR_CONFIGURATION, Slot::Value(TagValue::Short(vec![self.planar_configuration]))));
        }
        if !self.date_time.is_empty() {
            slots.push((tags::DATE_TIME, Slot::Value(TagValue::Ascii(self.date_time.clone()))));
        }
        if self.predictor > 0 {
            slots.push((tags::PREDICTOR, Slot::Value(TagValue::Short(vec![self.predictor]))));
        }
        if !self.colormap.is_empty() {
            slots.push((tags::COLORMAP, Slot::Value(TagValue::Short(self.colormap.clone()))));
        }
        if self.tile_width > 0 {
            slots.push((tags::TILE_WIDTH, Slot::Value(TagValue::Short(vec![self.tile_width]))));
        }
        if self.tile_height > 0 {
            slots.push((tags::TILE_LENGTH, Slot::Value(TagValue::Short(vec![self.tile_height]))));
        }
        if !self.tile_byte_counts.is_empty() {
            slots.push((tags::TILE_OFFSETS, Slot::TileOffsets));
            slots.push((tags::TILE_BYTE_COUNTS, Slot::TileByteCounts));
        }
        if !self.extra_samples.is_empty() {
            slots.push((tags::EXTRA_SAMPLES, Slot::Value(TagValue::Short(self.extra_samples.clone()))));
        }
        if !self.sample_format.is_empty() {
            slots.push((tags::SAMPLE_FORMAT, Slot::Value(TagValue::Short(self.sample_format.clone()))));
        }
        if !self.jpeg_tables.is_empty() {
            slots.push((tags::JPEG_TABLES, Slot::Value(TagValue::Byte(self.jpeg_tables.clone()))));
        }
        if !self.model_pixel_scale.is_empty() {
            slots.push((tags::MODEL_PIXEL_SCALE, Slot::Value(TagValue::Double(self.model_pixel_scale.clone()))));
        }
        if !self.model_tie_point.is_empty() {
            slots.push((tags::MODEL_TIE_POINT, Slot::Value(TagValue::Double(self.model_tie_point.clone()))));
        }
        if !self.model_transformation.is_empty() {
            slots.push((tags::MODEL_TRANSFORMATION, Slot::Value(TagValue::Double(self.model_transformation.clone()))));
        }
        if !self.geo_key_directory.is_empty() {
            slots.push((tags::GEO_KEY_DIRECTORY, Slot::Value(TagValue::Short(self.geo_key_directory.clone()))));
        }
        if !self.geo_double_params.is_empty() {
            slots.push((tags::GEO_DOUBLE_PARAMS, Slot::Value(TagValue::Double(self.geo_double_params.clone()))));
        }
        if !self.geo_ascii_params.is_empty() {
            slots.push((tags::GEO_ASCII_PARAMS, Slot::Value(TagValue::Ascii(self.geo_ascii_params.clone()))));
        }
        if !self.gdal_metadata.is_empty() {
            slots.push((tags::GDAL_METADATA, Slot::Value(TagValue::Ascii(self.gdal_metadata.clone()))));
        }
        if !self.nodata.is_empty() {
            slots.push((tags::GDAL_NODATA, Slot::Value(TagValue::Ascii(self.nodata.clone()))));
        }
        if !self.lerc_params.is_empty() {
            slots.push((tags::LERC_PARAMETERS, Slot::Value(TagValue::Long(self.lerc_params.clone()))));
        }
        if !self.rpc_coefficients.is_empty() {
            slots.push((tags::RPC_COEFFICIENTS, Slot::Value(TagValue::Double(self.rpc_coefficients.clone()))));
        }

        slots
    }

    /// Computes `(n_tags, dir_bytes, strile_bytes)` for one addressing mode
    ///
    /// `dir_bytes` covers the tag count, the fixed entries, the next-IFD
    /// pointer and every per-directory overflow payload; `strile_bytes`
    /// covers only the spilled tile arrays, which land after all
    /// directories.
    pub(crate) fn structure(&self, bigtiff: bool) -> (u64, u64, u64) {
        let header = if bigtiff { 8 } else { 2 };
        let next_ptr = if bigtiff { 8 } else { 4 };
        let entry = field::entry_size(bigtiff);
        let offset_elem = if bigtiff { 8 } else { 4 };
        let tile_count = self.tile_byte_counts.len() as u64;

        let slots = self.slots();
        let n_tags = slots.len() as u64;
        let mut dir_bytes = header + next_ptr;
        let mut strile_bytes = 0;

        for (_, slot) in &slots {
            match slot {
                Slot::Value(value) => dir_bytes += value.field_size(bigtiff),
                Slot::TileOffsets => {
                    dir_bytes += entry;
                    strile_bytes += field::array_field_size(offset_elem, tile_count, bigtiff) - entry;
                }
                Slot::TileByteCounts => {
                    dir_bytes += entry;
                    strile_bytes += field::array_field_size(4, tile_count, bigtiff) - entry;
                }
            }
        }

        (n_tags, dir_bytes, strile_bytes)
    }

    /// Visits every directory of the tree mutably, in output order
    pub(crate) fn for_each_dir_mut(&mut self, mut f: impl FnMut(&mut CogIfd)) {
        for level in 0..self.level_count() {
            let image = if level == 0 {
                &mut *self
            } else {
                &mut self.overviews[level - 1]
            };
            f(&mut *image);
            if let Some(mask) = image.mask.as_deref_mut() {
                f(mask);
            }
        }
    }

    /// Recomputes and caches structure sizes for the whole tree
    pub(crate) fn compute_structure(&mut self, bigtiff: bool) {
        for level in 0..self.level_count() {
            let image = if level == 0 {
                &mut *self
            } else {
                &mut self.overviews[level - 1]
            };
            let (n_tags, dir_bytes, strile_bytes) = image.structure(bigtiff);
            image.n_tags = n_tags;
            image.dir_bytes = dir_bytes;
            image.strile_bytes = strile_bytes;
            debug!(
                "Level {} structure: {} tags, {} directory bytes, {} strile bytes",
                level, n_tags, dir_bytes, strile_bytes
            );

            if let Some(mask) = image.mask.as_deref_mut() {
                let (n_tags, dir_bytes, strile_bytes) = mask.structure(bigtiff);
                mask.n_tags = n_tags;
                mask.dir_bytes = dir_bytes;
                mask.strile_bytes = strile_bytes;
            }
        }
    }
}
