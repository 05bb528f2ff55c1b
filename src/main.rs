//! Gifkey - command-line tool for removing a solid-color background from animated GIFs

use std::process::ExitCode;

use gifkey::cli;

fn main() -> ExitCode {
    cli::run()
}
