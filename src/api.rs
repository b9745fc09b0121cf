//! High-level library interface

use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::cog::Config;
use crate::io::seekable::SeekableReader;
use crate::tiff::errors::TiffResult;

/// Main interface to the cogkit library
///
/// Wraps a [`Config`] with path-oriented convenience methods; the
/// command line front end is a thin layer over this.
pub struct CogKit {
    config: Config,
}

impl CogKit {
    /// Creates an instance using the default configuration
    pub fn new() -> Self {
        CogKit { config: Config::default() }
    }

    /// Creates an instance with an explicit configuration
    pub fn with_config(config: Config) -> Self {
        CogKit { config }
    }

    /// Rewrites the input files as a single COG at `output`
    ///
    /// The first input provides the full-resolution image; additional
    /// inputs supply externally built overviews. Output is written
    /// through a buffered, forward-only sink.
    pub fn rewrite<P: AsRef<Path>>(&self, inputs: &[P], output: &Path) -> TiffResult<()> {
        let mut readers: Vec<Box<dyn SeekableReader>> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let file = File::open(input.as_ref())?;
            readers.push(Box::new(BufReader::with_capacity(1 << 20, file)));
        }

        let file = File::create(output)?;
        let mut out = BufWriter::with_capacity(1 << 20, file);
        self.config.rewrite(readers, &mut out)?;
        out.flush()?;

        info!("Wrote {}", output.display());
        Ok(())
    }
}

impl Default for CogKit {
    fn default() -> Self {
        Self::new()
    }
}
