//! TIFF tag utilities
//!
//! Name lookups for tags and field types, used by log output and the
//! Display implementations.

use std::collections::HashMap;
use lazy_static::lazy_static;

use crate::tiff::constants::{field_types, tags};

lazy_static! {
    /// Names of the tags the engine recognizes, plus the strip tags it
    /// rejects, keyed by tag id
    static ref TAG_NAMES: HashMap<u16, &'static str> = {
        let mut names = HashMap::new();
        names.insert(tags::SUBFILE_TYPE, "SubfileType");
        names.insert(tags::IMAGE_WIDTH, "ImageWidth");
        names.insert(tags::IMAGE_LENGTH, "ImageLength");
        names.insert(tags::BITS_PER_SAMPLE, "BitsPerSample");
        names.insert(tags::COMPRESSION, "Compression");
        names.insert(tags::PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation");
        names.insert(tags::DOCUMENT_NAME, "DocumentName");
        names.insert(tags::STRIP_OFFSETS, "StripOffsets");
        names.insert(tags::SAMPLES_PER_PIXEL, "SamplesPerPixel");
        names.insert(tags::STRIP_BYTE_COUNTS, "StripByteCounts");
        names.insert(tags::PLANAR_CONFIGURATION, "PlanarConfiguration");
        names.insert(tags::DATE_TIME, "DateTime");
        names.insert(tags::PREDICTOR, "Predictor");
        names.insert(tags::COLORMAP, "ColorMap");
        names.insert(tags::TILE_WIDTH, "TileWidth");
        names.insert(tags::TILE_LENGTH, "TileLength");
        names.insert(tags::TILE_OFFSETS, "TileOffsets");
        names.insert(tags::TILE_BYTE_COUNTS, "TileByteCounts");
        names.insert(tags::EXTRA_SAMPLES, "ExtraSamples");
        names.insert(tags::SAMPLE_FORMAT, "SampleFormat");
        names.insert(tags::JPEG_TABLES, "JPEGTables");
        names.insert(tags::MODEL_PIXEL_SCALE, "ModelPixelScale");
        names.insert(tags::MODEL_TIE_POINT, "ModelTiepoint");
        names.insert(tags::MODEL_TRANSFORMATION, "ModelTransformation");
        names.insert(tags::GEO_KEY_DIRECTORY, "GeoKeyDirectory");
        names.insert(tags::GEO_DOUBLE_PARAMS, "GeoDoubleParams");
        names.insert(tags::GEO_ASCII_PARAMS, "GeoAsciiParams");
        names.insert(tags::GDAL_METADATA, "GDALMetadata");
        names.insert(tags::GDAL_NODATA, "GDALNoData");
        names.insert(tags::LERC_PARAMETERS, "LERCParameters");
        names.insert(tags::RPC_COEFFICIENTS, "RPCCoefficients");
        names
    };
}

/// Get the name of a TIFF tag, or "Unknown" for unrecognized ids
pub fn tag_name(tag: u16) -> &'static str {
    TAG_NAMES.get(&tag).copied().unwrap_or("Unknown")
}

/// Get the name of a TIFF field type
pub fn field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}
