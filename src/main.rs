use clap::Parser;
use snaplink::commands::{self, Cli};
use snaplink::{logging, sysexits};
use std::process;

/// Entry point for the snaplink CLI application.
/// Parses command-line arguments and dispatches to the selected command.
fn main() {
    let cli = Cli::parse();
    logging::init(cli.args.verbose);

    match commands::execute(cli) {
        Ok(sysexits::EX_OK) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(sysexits::for_error(&e));
        }
    }
}
