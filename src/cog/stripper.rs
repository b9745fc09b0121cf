//! Strip planning for external parallel preprocessing
//!
//! A [`Stripper`] splits an image and its overview pyramid into
//! horizontal strips of roughly equal pixel count, so the expensive
//! resampling work can run outside this crate, one strip at a time. Each
//! strip's internal tiling is kept compatible with the final COG tiling,
//! which lets [`Stripper::assemble_strips`] later stitch the produced
//! strip TIFFs into a virtual directory tree without moving any pixels.
//!
//! The usual workflow: build a `Stripper` for the input dimensions, have
//! a tool like `gdal_translate` materialize every strip of every level
//! following [`Stripper::pyramid`], then assemble and rewrite.

use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

use crate::cog::ifd::{CogIfd, TileSource};
use crate::cog::loader::{self, SharedReader};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::subfile_type;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;

/// A horizontal band of one pyramid level
///
/// The strip covers `width x height` output pixels with its upper-left
/// corner at `(top_left_x, top_left_y)`. Its pixels are produced by
/// resampling the source window `(src_top_left_x, src_top_left_y,
/// src_width, src_height)`, expressed in floating-point pixel
/// coordinates of the previous level (or of the input image for level 0).
#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    pub width: usize,
    pub height: usize,
    pub top_left_x: usize,
    pub top_left_y: usize,
    pub src_top_left_x: f64,
    pub src_top_left_y: f64,
    pub src_width: f64,
    pub src_height: f64,
}

/// One pyramid level and its decomposition into strips
#[derive(Debug, Clone)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub strips: Vec<Strip>,
    pub(crate) tiling_width: usize,
    pub(crate) tiling_height: usize,
}

impl Image {
    /// Maps an output tile position to the strip holding it and the
    /// tile's position inside that strip
    ///
    /// Walks the strip heights cumulatively; within a strip the column
    /// wraps at the strip's own tile width.
    pub(crate) fn tile_strip_index(&self, x: usize, y: usize) -> (usize, usize, usize) {
        let mut strip = 0;
        let mut accum_y = 0;
        loop {
            let strip_rows =
                (self.strips[strip].height + self.tiling_height - 1) / self.tiling_height;
            if accum_y + strip_rows <= y {
                accum_y += strip_rows;
                strip += 1;
                continue;
            }
            let strip_y = y - accum_y;
            let tiles_x =
                (self.strips[strip].width + self.tiling_width - 1) / self.tiling_width;
            return (strip, x % tiles_x, strip_y);
        }
    }
}

/// A full-resolution image and its overviews, each split into strips
///
/// Index 0 is the full resolution level, whose strip source windows
/// reference the input image; every later level references the level
/// before it.
#[derive(Debug, Clone)]
pub struct Pyramid(pub Vec<Image>);

/// Dependencies of one strip on the strips of the previous level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Indexes of the previous level's strips covering this strip's
    /// source window
    pub parents: Vec<usize>,
    /// Y position in the previous level of the top-most parent strip
    pub parent_offset: usize,
}

impl Pyramid {
    /// Computes, for every strip, which parent strips its source window
    /// spans
    ///
    /// Level 0 strips have no parents. This is an optimization aid for
    /// schedulers; processing whole levels in order works without it.
    pub fn dag(&self) -> Vec<Vec<Node>> {
        let parents = |level: usize, strip: usize| -> (Vec<usize>, usize) {
            if level == 0 {
                return (Vec::new(), 0);
            }
            let cur = &self.0[level].strips[strip];
            let top = cur.src_top_left_y.floor() as usize;
            let bottom = (cur.src_top_left_y + cur.src_height).ceil() as usize - 1;

            let mut h = 0;
            let mut parent_strips = Vec::new();
            let mut offset = usize::MAX;
            for (index, parent) in self.0[level - 1].strips.iter().enumerate() {
                if top >= h + parent.height || bottom < h {
                    h += parent.height;
                    continue;
                }
                if h < offset {
                    offset = h;
                }
                parent_strips.push(index);
                h += parent.height;
            }
            if parent_strips.is_empty() {
                offset = 0;
            }
            (parent_strips, offset)
        };

        let mut dag = Vec::with_capacity(self.0.len());
        for (level, image) in self.0.iter().enumerate() {
            let mut nodes = Vec::with_capacity(image.strips.len());
            for strip in 0..image.strips.len() {
                let (parents, parent_offset) = parents(level, strip);
                nodes.push(Node { parents, parent_offset });
            }
            dag.push(nodes);
        }
        dag
    }
}

/// Planner that splits an image and its overviews into strips
///
/// Defaults: 64 MPixel strips, 256x256 internal tiling, overviews down to
/// just under one internal tile.
pub struct Stripper {
    width: usize,
    height: usize,
    target_strip_pixel_count: usize,
    min_overview_size: usize,
    fullres_strip_height_multiple: usize,
    internal_tiling_width: usize,
    internal_tiling_height: usize,
    pyr: Pyramid,
}

/// Builder for [`Stripper`]; all options are validated in
/// [`StripperBuilder::build`]
pub struct StripperBuilder {
    width: usize,
    height: usize,
    target_strip_pixel_count: usize,
    min_overview_size: usize,
    fullres_strip_height_multiple: usize,
    internal_tiling_width: usize,
    internal_tiling_height: usize,
    overview_count: Option<usize>,
}

impl StripperBuilder {
    /// Sets the internal tiling size of the strip TIFFs and the output
    pub fn internal_tile_size(mut self, width: usize, height: usize) -> Self {
        self.internal_tiling_width = width;
        self.internal_tiling_height = height;
        self
    }

    /// Overviews stop once one dimension reaches this size, even if the
    /// other still exceeds the internal tile size
    pub fn min_overview_size(mut self, size: usize) -> Self {
        self.min_overview_size = size;
        self
    }

    /// Forces the number of overview levels instead of deriving it
    pub fn overview_count(mut self, count: usize) -> Self {
        self.overview_count = Some(count);
        self
    }

    /// Approximate pixel count a single strip should cover
    pub fn target_pixel_count(mut self, count: usize) -> Self {
        self.target_strip_pixel_count = count;
        self
    }

    /// Forces full-resolution strip heights to a multiple of this value
    ///
    /// Useful when the source dataset is itself tiled: aligned strips
    /// avoid decompressing the same source tile twice. Must be a
    /// multiple of the internal tiling height.
    pub fn fullres_strip_height_multiple(mut self, height_base: usize) -> Self {
        self.fullres_strip_height_multiple = height_base;
        self
    }

    /// Validates the options and computes the pyramid
    pub fn build(self) -> TiffResult<Stripper> {
        if self.internal_tiling_width == 0 || self.internal_tiling_height == 0 {
            return Err(TiffError::InvalidOption(
                "internal tile width and height must be >=1".to_string(),
            ));
        }
        if self.min_overview_size == 0 {
            return Err(TiffError::InvalidOption(
                "minimal overview size must be >=1".to_string(),
            ));
        }
        if self.fullres_strip_height_multiple % self.internal_tiling_height != 0 {
            return Err(TiffError::InvalidOption(format!(
                "strip height multiple {} must be a multiple of internal tiling height {}",
                self.fullres_strip_height_multiple, self.internal_tiling_height
            )));
        }

        let mut stripper = Stripper {
            width: self.width,
            height: self.height,
            target_strip_pixel_count: self.target_strip_pixel_count,
            min_overview_size: self.min_overview_size,
            fullres_strip_height_multiple: self.fullres_strip_height_multiple,
            internal_tiling_width: self.internal_tiling_width,
            internal_tiling_height: self.internal_tiling_height,
            pyr: Pyramid(Vec::new()),
        };
        stripper.pyr = stripper.compute_pyramid(self.overview_count)?;
        Ok(stripper)
    }
}

impl Stripper {
    /// Starts building a stripper for an image of the given size
    pub fn builder(width: usize, height: usize) -> StripperBuilder {
        StripperBuilder {
            width,
            height,
            target_strip_pixel_count: 8192 * 8192,
            min_overview_size: 2,
            fullres_strip_height_multiple: 0,
            internal_tiling_width: 256,
            internal_tiling_height: 256,
            overview_count: None,
        }
    }

    /// The planned pyramid
    pub fn pyramid(&self) -> &Pyramid {
        &self.pyr
    }

    /// The planned image size
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// The internal tiling size
    pub fn internal_tile_size(&self) -> (usize, usize) {
        (self.internal_tiling_width, self.internal_tiling_height)
    }

    fn compute_pyramid(&self, forced_overview_count: Option<usize>) -> TiffResult<Pyramid> {
        if self.width * self.height == 0 {
            return Err(TiffError::InvalidOption(
                "cannot split a 0-sized image".to_string(),
            ));
        }

        let overview_count = match forced_overview_count {
            Some(count) => count,
            None => {
                let mut iw = self.width;
                let mut ih = self.height;
                let mut count = 0;
                while (iw > self.internal_tiling_width || ih > self.internal_tiling_height)
                    && (iw > self.min_overview_size && ih > self.min_overview_size)
                {
                    count += 1;
                    iw = iw.div_ceil(2);
                    ih = ih.div_ceil(2);
                }
                count
            }
        };

        let mut pyramid = Vec::with_capacity(overview_count + 1);
        pyramid.push(self.stripping(self.width, self.height, self.width, self.height));

        let mut iw = self.width;
        let mut ih = self.height;
        for _ in 1..=overview_count {
            if iw <= 1 || ih <= 1 {
                return Err(TiffError::InvalidOption(
                    "requested overview count results in a 0-sized image".to_string(),
                ));
            }
            let niw = iw.div_ceil(2);
            let nih = ih.div_ceil(2);
            pyramid.push(self.stripping(iw, ih, niw, nih));
            iw = niw;
            ih = nih;
        }

        Ok(Pyramid(pyramid))
    }

    /// Splits one level into strips
    fn stripping(
        &self,
        src_width: usize,
        src_height: usize,
        dst_width: usize,
        dst_height: usize,
    ) -> Image {
        let mut num_strips = (src_width * src_height) / self.target_strip_pixel_count;
        if num_strips == 0 {
            num_strips = 1;
        }
        let mut strip_height = dst_height / num_strips;
        if strip_height <= self.internal_tiling_height {
            strip_height = self.internal_tiling_height;
        }

        // Align to the requested multiple at full resolution, otherwise to
        // the internal tiling height. The multiple itself is constrained
        // to be a multiple of the tiling height.
        let fullres = src_width == dst_width && src_height == dst_height;
        if fullres && self.fullres_strip_height_multiple != 0 {
            strip_height = (strip_height / self.fullres_strip_height_multiple + 1)
                * self.fullres_strip_height_multiple;
        } else if strip_height % self.internal_tiling_height != 0 {
            strip_height =
                (strip_height / self.internal_tiling_height + 1) * self.internal_tiling_height;
        }
        num_strips = dst_height.div_ceil(strip_height);

        let res_y = src_height as f64 / dst_height as f64;
        let mut image = Image {
            width: dst_width,
            height: dst_height,
            strips: Vec::new(),
            tiling_width: self.internal_tiling_width,
            tiling_height: self.internal_tiling_height,
        };

        let mut dst_row = 0;
        let mut src_row = 0f64;
        for s in 0..num_strips {
            let mut this_height = strip_height;
            if dst_row + strip_height > dst_height {
                this_height = dst_height - dst_row;
            }
            if s > 0 && this_height < self.internal_tiling_height {
                // A tail shorter than one tile row is folded into the
                // previous strip.
                let last = image.strips.len() - 1;
                image.strips[last].src_height += this_height as f64 * res_y;
                image.strips[last].height += this_height;
            } else {
                image.strips.push(Strip {
                    width: dst_width,
                    height: this_height,
                    top_left_x: 0,
                    top_left_y: dst_row,
                    src_top_left_x: 0.0,
                    src_top_left_y: src_row,
                    src_width: src_width as f64,
                    src_height: this_height as f64 * res_y,
                });
            }
            dst_row += strip_height;
            src_row += strip_height as f64 * res_y;
        }

        image
    }

    /// Stitches produced strip TIFFs into a virtual directory tree
    ///
    /// `src_strips` must follow the pyramid structure: one reader per
    /// strip, one list per level, in the same order as
    /// [`Stripper::pyramid`]. Each strip TIFF holds one image directory
    /// and optionally its mask. The returned tree reads its tiles
    /// straight out of the strip readers; pass it to
    /// [`crate::cog::Config::rewrite_tree`].
    pub fn assemble_strips(
        &self,
        src_strips: Vec<Vec<Box<dyn SeekableReader>>>,
    ) -> TiffResult<CogIfd> {
        if src_strips.is_empty() || src_strips.len() > self.pyr.0.len() {
            return Err(TiffError::InvalidOption(format!(
                "got strips for {} levels, pyramid has {}",
                src_strips.len(),
                self.pyr.0.len()
            )));
        }

        let mut levels = src_strips.into_iter();
        let mut main = assemble_level_strips(&self.pyr.0[0], levels.next().unwrap_or_default())?;
        for (z, overview_strips) in levels.enumerate() {
            let overview = assemble_level_strips(&self.pyr.0[z + 1], overview_strips)?;
            main.add_overview(overview)?;
        }
        Ok(main)
    }
}

/// Tile source that dispatches an output tile to the strip holding it
struct StripTileSource {
    strips: Vec<CogIfd>,
    grid: Image,
    n_tiles_x: u64,
    n_tiles_y: u64,
}

impl TileSource for StripTileSource {
    fn load_tile(&mut self, index: usize, buf: &mut [u8]) -> TiffResult<()> {
        let tiles_per_plane = (self.n_tiles_x * self.n_tiles_y) as usize;
        let plane = index / tiles_per_plane;
        let rem = index % tiles_per_plane;
        let x = rem % self.n_tiles_x as usize;
        let y = rem / self.n_tiles_x as usize;

        let (strip, strip_x, strip_y) = self.grid.tile_strip_index(x, y);
        let source = &mut self.strips[strip];
        let strip_index = source.tile_index(strip_x as u64, strip_y as u64, plane);
        source.load_tile(strip_index, buf)
    }
}

/// Builds the virtual directory for one pyramid level from its strips
fn assemble_level_strips(
    img: &Image,
    strips: Vec<Box<dyn SeekableReader>>,
) -> TiffResult<CogIfd> {
    if strips.is_empty() {
        return Err(TiffError::InvalidOption(
            "a pyramid level has no strips".to_string(),
        ));
    }

    let mut strip_ifds: Vec<CogIfd> = Vec::with_capacity(strips.len());
    let mut strip_masks: Vec<CogIfd> = Vec::new();
    let mut directory_count = 0;

    for (s, reader) in strips.into_iter().enumerate() {
        let shared: SharedReader = Rc::new(RefCell::new(reader));
        let mut parser = TiffReader::new();
        let tiff = {
            let mut guard = shared.borrow_mut();
            parser.read(&mut **guard)?
        };

        if tiff.ifd_count() == 0 || tiff.ifd_count() > 2 {
            return Err(TiffError::GenericError(format!(
                "strip {} holds {} directories, expected 1 or 2",
                s,
                tiff.ifd_count()
            )));
        }
        if s == 0 {
            directory_count = tiff.ifd_count();
        } else if tiff.ifd_count() != directory_count {
            return Err(TiffError::GenericError(format!(
                "strip {} holds {} directories, other strips hold {}",
                s,
                tiff.ifd_count(),
                directory_count
            )));
        }

        for raw in &tiff.ifds {
            validation::validate_tiled_ifd(raw)?;
        }

        let image_ifd = loader::decode_ifd(&parser, &shared, &tiff.ifds[0])?;
        if image_ifd.subfile_type != subfile_type::NONE {
            return Err(TiffError::GenericError(format!(
                "strip {} image directory has subfile type {}, expected 0",
                s, image_ifd.subfile_type
            )));
        }
        strip_ifds.push(image_ifd);

        if directory_count == 2 {
            let mask_ifd = loader::decode_ifd(&parser, &shared, &tiff.ifds[1])?;
            if mask_ifd.subfile_type != subfile_type::MASK {
                return Err(TiffError::InvalidMask(format!(
                    "strip {} mask directory has subfile type {}, expected {}",
                    s, mask_ifd.subfile_type, subfile_type::MASK
                )));
            }
            if mask_ifd.n_planes() != 1 {
                return Err(TiffError::InvalidMask(format!(
                    "strip {} mask has {} planes, expected 1",
                    s,
                    mask_ifd.n_planes()
                )));
            }
            strip_masks.push(mask_ifd);
        }
    }

    // The synthetic level directory copies the first strip's tags and
    // takes the level's full geometry.
    let mut synthetic = clone_tags(&strip_ifds[0]);
    synthetic.image_width = img.width as u64;
    synthetic.image_height = img.height as u64;

    let n_tiles_x = synthetic.n_tiles_x();
    let n_tiles_y = synthetic.n_tiles_y();
    let n_planes = synthetic.n_planes();

    let total_tiles: usize = strip_ifds.iter().map(|ifd| ifd.tile_byte_counts.len()).sum();
    if n_tiles_x * n_tiles_y * n_planes as u64 != total_tiles as u64 {
        return Err(TiffError::InconsistentTileCount {
            expected: n_tiles_x * n_tiles_y * n_planes as u64,
            actual: total_tiles as u64,
        });
    }

    let mut counts = Vec::with_capacity(total_tiles);
    for plane in 0..n_planes {
        for y in 0..n_tiles_y as usize {
            for x in 0..n_tiles_x as usize {
                let (strip, strip_x, strip_y) = img.tile_strip_index(x, y);
                let index = strip_ifds[strip].tile_index(strip_x as u64, strip_y as u64, plane);
                counts.push(strip_ifds[strip].tile_byte_counts[index]);
            }
        }
    }
    synthetic.tile_byte_counts = counts;
    synthetic.tile_offsets = Vec::new();
    debug!(
        "Assembled level {}x{} from {} strips ({} tiles)",
        img.width,
        img.height,
        strip_ifds.len(),
        total_tiles
    );

    let mask_synthetic = if !strip_masks.is_empty() {
        let total_mask_tiles: usize =
            strip_masks.iter().map(|ifd| ifd.tile_byte_counts.len()).sum();
        if total_mask_tiles != total_tiles / n_planes {
            return Err(TiffError::InvalidMask(format!(
                "strips hold {} mask tiles for {} image tiles",
                total_mask_tiles, total_tiles
            )));
        }

        let mut mask = clone_tags(&strip_masks[0]);
        mask.image_width = synthetic.image_width;
        mask.image_height = synthetic.image_height;
        if mask.n_tiles_x() * mask.n_tiles_y() != total_mask_tiles as u64 {
            return Err(TiffError::InconsistentTileCount {
                expected: mask.n_tiles_x() * mask.n_tiles_y(),
                actual: total_mask_tiles as u64,
            });
        }

        let mut mask_counts = Vec::with_capacity(total_mask_tiles);
        for y in 0..mask.n_tiles_y() as usize {
            for x in 0..mask.n_tiles_x() as usize {
                let (strip, strip_x, strip_y) = img.tile_strip_index(x, y);
                let index = strip_masks[strip].tile_index(strip_x as u64, strip_y as u64, 0);
                mask_counts.push(strip_masks[strip].tile_byte_counts[index]);
            }
        }
        mask.tile_byte_counts = mask_counts;
        mask.tile_offsets = Vec::new();
        mask.set_tile_source(Box::new(StripTileSource {
            strips: strip_masks,
            grid: img.clone(),
            n_tiles_x: mask.n_tiles_x(),
            n_tiles_y: mask.n_tiles_y(),
        }));
        Some(mask)
    } else {
        None
    };

    synthetic.set_tile_source(Box::new(StripTileSource {
        strips: strip_ifds,
        grid: img.clone(),
        n_tiles_x,
        n_tiles_y,
    }));

    if let Some(mask) = mask_synthetic {
        synthetic.add_mask(mask)?;
    }

    Ok(synthetic)
}

/// Copies a directory's tag fields, leaving relationships, tile arrays
/// and the tile source behind
fn clone_tags(ifd: &CogIfd) -> CogIfd {
    CogIfd {
        subfile_type: ifd.subfile_type,
        image_width: ifd.image_width,
        image_height: ifd.image_height,
        bits_per_sample: ifd.bits_per_sample.clone(),
        compression: ifd.compression,
        photometric_interpretation: ifd.photometric_interpretation,
        document_name: ifd.document_name.clone(),
        samples_per_pixel: ifd.samples_per_pixel,
        planar_configuration: ifd.planar_configuration,
        date_time: ifd.date_time.clone(),
        predictor: ifd.predictor,
        colormap: ifd.colormap.clone(),
        tile_width: ifd.tile_width,
        tile_height: ifd.tile_height,
        extra_samples: ifd.extra_samples.clone(),
        sample_format: ifd.sample_format.clone(),
        jpeg_tables: ifd.jpeg_tables.clone(),
        model_pixel_scale: ifd.model_pixel_scale.clone(),
        model_tie_point: ifd.model_tie_point.clone(),
        model_transformation: ifd.model_transformation.clone(),
        geo_key_directory: ifd.geo_key_directory.clone(),
        geo_double_params: ifd.geo_double_params.clone(),
        geo_ascii_params: ifd.geo_ascii_params.clone(),
        gdal_metadata: ifd.gdal_metadata.clone(),
        nodata: ifd.nodata.clone(),
        lerc_params: ifd.lerc_params.clone(),
        rpc_coefficients: ifd.rpc_coefficients.clone(),
        ..CogIfd::default()
    }
}
