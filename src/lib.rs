pub mod io;
pub mod tiff;
pub mod cog;
pub mod utils;
pub mod commands;
pub mod api;

pub use crate::api::CogKit;

pub use cog::{CogIfd, Config, PlanarInterleaving, Stripper, TileSource};
pub use tiff::TiffReader;
