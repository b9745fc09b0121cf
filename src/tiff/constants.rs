//! TIFF format constants
//!
//! This module defines constants used throughout the TIFF processing code,
//! making the code more readable and maintainable by replacing magic numbers
//! with descriptive names.

/// TIFF header constants
pub mod header {
    /// Standard TIFF version number (42)
    pub const TIFF_VERSION: u16 = 42;

    /// BigTIFF version number (43)
    pub const BIG_TIFF_VERSION: u16 = 43;

    /// BigTIFF offset size (8 bytes)
    pub const BIGTIFF_OFFSET_SIZE: u16 = 8;

    /// Size of a classic TIFF header
    pub const TIFF_HEADER_SIZE: u64 = 8;

    /// Size of a BigTIFF header
    pub const BIGTIFF_HEADER_SIZE: u64 = 16;
}

/// Field types as defined in the TIFF spec
pub mod field_types {
    pub const BYTE: u16 = 1;       // 8-bit unsigned integer
    pub const ASCII: u16 = 2;      // 8-bit byte containing ASCII character
    pub const SHORT: u16 = 3;      // 16-bit unsigned integer
    pub const LONG: u16 = 4;       // 32-bit unsigned integer
    pub const RATIONAL: u16 = 5;   // Two LONGs: numerator and denominator
    pub const SBYTE: u16 = 6;      // 8-bit signed integer
    pub const UNDEFINED: u16 = 7;  // 8-bit byte with unspecified format
    pub const SSHORT: u16 = 8;     // 16-bit signed integer
    pub const SLONG: u16 = 9;      // 32-bit signed integer
    pub const SRATIONAL: u16 = 10; // Two SLONGs: numerator and denominator
    pub const FLOAT: u16 = 11;     // Single precision IEEE floating point
    pub const DOUBLE: u16 = 12;    // Double precision IEEE floating point
    pub const LONG8: u16 = 16;     // BigTIFF 64-bit unsigned integer
    pub const SLONG8: u16 = 17;    // BigTIFF 64-bit signed integer
    pub const IFD8: u16 = 18;      // BigTIFF 64-bit IFD offset
}

/// TIFF tags recognized by the rewriting engine
///
/// Tags outside this set are dropped when a directory is rewritten.
pub mod tags {
    pub const SUBFILE_TYPE: u16 = 254;             // Subfile data descriptor
    pub const IMAGE_WIDTH: u16 = 256;              // Width of the image in pixels
    pub const IMAGE_LENGTH: u16 = 257;             // Height of the image in pixels
    pub const BITS_PER_SAMPLE: u16 = 258;          // Bits per component
    pub const COMPRESSION: u16 = 259;              // Compression scheme
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262; // Color space of image data
    pub const DOCUMENT_NAME: u16 = 269;            // Name of the source document
    pub const STRIP_OFFSETS: u16 = 273;            // Offsets to the data strips
    pub const SAMPLES_PER_PIXEL: u16 = 277;        // Number of components per pixel
    pub const STRIP_BYTE_COUNTS: u16 = 279;        // Byte counts for strips
    pub const PLANAR_CONFIGURATION: u16 = 284;     // How components are stored
    pub const DATE_TIME: u16 = 306;                // Date and time of image creation
    pub const PREDICTOR: u16 = 317;                // Prediction scheme used on image data
    pub const COLORMAP: u16 = 320;                 // Colormap for palette color images
    pub const TILE_WIDTH: u16 = 322;               // Width of a tile
    pub const TILE_LENGTH: u16 = 323;              // Length of a tile
    pub const TILE_OFFSETS: u16 = 324;             // Offsets to the data tiles
    pub const TILE_BYTE_COUNTS: u16 = 325;         // Byte counts for tiles
    pub const EXTRA_SAMPLES: u16 = 338;            // Meaning of extra components
    pub const SAMPLE_FORMAT: u16 = 339;            // Interpretation of sample data
    pub const JPEG_TABLES: u16 = 347;              // Shared JPEG quantization/Huffman tables

    // GeoTIFF tags
    pub const MODEL_PIXEL_SCALE: u16 = 33550;      // Pixel size in map units
    pub const MODEL_TIE_POINT: u16 = 33922;        // Links raster to world coordinates
    pub const MODEL_TRANSFORMATION: u16 = 34264;   // Transformation matrix
    pub const GEO_KEY_DIRECTORY: u16 = 34735;      // GeoTIFF keys structure
    pub const GEO_DOUBLE_PARAMS: u16 = 34736;      // GeoTIFF double parameters
    pub const GEO_ASCII_PARAMS: u16 = 34737;       // GeoTIFF ASCII parameters

    // GDAL specific tags
    pub const GDAL_METADATA: u16 = 42112;          // XML metadata
    pub const GDAL_NODATA: u16 = 42113;            // NoData marker value

    // Compression side-channel tags
    pub const LERC_PARAMETERS: u16 = 50674;        // LERC compression parameters
    pub const RPC_COEFFICIENTS: u16 = 50844;       // Rational polynomial coefficients
}

/// Subfile type bit flags (tag 254)
pub mod subfile_type {
    pub const NONE: u32 = 0;             // Full resolution image
    pub const REDUCED_IMAGE: u32 = 1;    // Reduced resolution version of another image
    pub const MASK: u32 = 4;             // Transparency mask for another image
}

/// Planar configuration values (tag 284)
pub mod planar_config {
    pub const CONTIG: u16 = 1;           // Components stored interleaved (RGBRGBRGB)
    pub const SEPARATE: u16 = 2;         // Components stored separately (RRR...GGG...BBB)
}
