//! Cloud Optimized GeoTIFF rewriting engine
//!
//! The engine consumes already-tiled TIFF/BigTIFF inputs and emits a
//! single COG: directories first, then the tile offset/byte-count
//! arrays, then every compressed tile in an interleaved order that puts
//! coarse overviews near the head of the file. Pixel data is copied
//! verbatim; nothing is decoded or recompressed.

pub mod config;
pub(crate) mod field;
pub(crate) mod ghost;
pub mod ifd;
pub mod interleave;
pub(crate) mod loader;
pub mod stripper;
pub(crate) mod writer;
#[cfg(test)]
mod tests;

pub use config::Config;
pub use ifd::{CogIfd, TileSource};
pub use interleave::PlanarInterleaving;
pub use stripper::{Image, Node, Pyramid, Strip, Stripper, StripperBuilder};
