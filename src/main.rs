//! hwmem - devmem for devices selected by compatibility string
//!
//! Reads or writes a register of one or more devices, found by their
//! device-tree `compatible` property instead of a raw physical address.
//!
//! # Architecture
//!
//! The command line is turned into three independent steps:
//! - **Selection** - the bus backend enumerates matching devices and
//!   `-d`/`-A` pick the ones to act upon
//! - **Parsing** - ADDRESS, WIDTH and VALUE become an `Operation`
//! - **Dispatch** - every selected device is attached, then read or written
//!
//! Backends (`/dev/mem` through the live device tree, or an emulated dummy
//! bus) sit behind the `Bus` trait, so the same flow works for both.

mod cli;
mod commands;

use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    // Logs go to stderr, stdout carries only listings and read data
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = commands::report_error(&e, &mut io::stderr().lock());
            ExitCode::FAILURE
        }
    }
}
