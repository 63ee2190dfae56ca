use std::process::ExitCode;

use clap::Parser;

use pixelops::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Each launch starts a fresh session log.
    match &args.log_file {
        Some(path) => logger::init_at(path),
        None => logger::init(),
    };

    cli::run(args)
}
