//! CLI command implementations
//!
//! This module contains the commands supported by the CLI application
//! using the Command pattern.

pub mod command_traits;
pub mod rewrite_command;

pub use command_traits::{Command, CommandFactory};
pub use rewrite_command::RewriteCommand;

use clap::ArgMatches;
use crate::tiff::errors::TiffResult;

/// Factory for creating command instances based on CLI arguments
pub struct CogkitCommandFactory;

impl CogkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        CogkitCommandFactory
    }
}

impl Default for CogkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for CogkitCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> TiffResult<Box<dyn Command>> {
        Ok(Box::new(RewriteCommand::new(args)?))
    }
}
