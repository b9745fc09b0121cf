use clap::{Arg, ArgAction, Command as ClapCommand};
use log::error;
use std::process;

use cogkit::commands::{CogkitCommandFactory, CommandFactory};
use cogkit::utils::logger::Logger;

fn main() {
    let matches = ClapCommand::new("cogkit")
        .version("0.1.0")
        .about("Rewrite tiled TIFF/BigTIFF files into Cloud Optimized GeoTIFFs")
        .arg(
            Arg::new("input")
                .help("Input TIFF file, optionally followed by overview files")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Destination file")
                .value_name("FILE")
                .default_value("out.tif"),
        )
        .arg(
            Arg::new("skip-gdal-ghost-areas")
                .long("skip-gdal-ghost-areas")
                .help("Do not write GDAL ghost areas and tile leader/trailer bytes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep-bigtiff")
                .long("keep-bigtiff")
                .help("Keep BigTIFF addressing when the first input is a BigTIFF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force-bigtiff")
                .long("force-bigtiff")
                .help("Force BigTIFF output even if the result fits in a regular TIFF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if let Err(e) = Logger::init_global_logger("cogkit.log", matches.get_flag("verbose")) {
        eprintln!("Error initializing logger: {}", e);
        process::exit(1);
    }

    let factory = CogkitCommandFactory::new();
    match factory.create_command(&matches) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
