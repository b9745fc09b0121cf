//! The rewrite command

use clap::ArgMatches;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::api::CogKit;
use crate::cog::Config;
use crate::commands::command_traits::Command;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::validation;

/// Rewrites one or more tiled TIFF inputs into a single COG
pub struct RewriteCommand {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    config: Config,
}

impl RewriteCommand {
    /// Builds the command from parsed CLI arguments
    pub fn new(args: &ArgMatches) -> TiffResult<Self> {
        let inputs: Vec<PathBuf> = args
            .get_many::<String>("input")
            .ok_or_else(|| TiffError::InvalidOption("missing input files".to_string()))?
            .map(PathBuf::from)
            .collect();

        let output = PathBuf::from(
            args.get_one::<String>("output")
                .map(String::as_str)
                .unwrap_or("out.tif"),
        );

        let mut config = Config::default();
        config.with_gdal_ghost_area = !args.get_flag("skip-gdal-ghost-areas");
        config.big_tiff = args.get_flag("force-bigtiff");
        if !config.big_tiff && args.get_flag("keep-bigtiff") {
            // Sniffing just the header avoids a second full parse.
            config.big_tiff = validation::sniff_big_tiff(&inputs[0])?;
            debug!(
                "keep-bigtiff: first input {} BigTIFF",
                if config.big_tiff { "is" } else { "is not" }
            );
        }

        Ok(RewriteCommand { inputs, output, config })
    }
}

impl Command for RewriteCommand {
    fn execute(&self) -> TiffResult<()> {
        info!(
            "Rewriting {} input(s) into {}",
            self.inputs.len(),
            self.output.display()
        );
        let kit = CogKit::with_config(self.config.clone());
        kit.rewrite(&self.inputs, Path::new(&self.output))
    }
}
