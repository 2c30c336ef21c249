//! CLI argument parsing

use clap::Parser;
use hwmem_bus::{bus_help, bus_names_short, DEFAULT_BUS};

/// Generate dynamic help text for the bus argument
fn bus_arg_help() -> String {
    format!("Bus backend to use [available: {}]", bus_names_short())
}

/// Operand description and bus list shown after the options
fn after_help() -> String {
    format!(
        "Operands:\n\
         \x20 COMPAT   device-tree compatibility string\n\
         \x20 ADDRESS  offset to act upon, inside the device's register window\n\
         \x20 WIDTH    width in bits (8/16/...), 32 default, WIDTH % 8 == 0, WIDTH > 0\n\
         \x20 VALUE    data to be written\n\
         \n\
         (same as devmem + compatibility string)\n\
         All values can be in dec/hex format, write is limited to 64b.\n\
         Read data is printed in hex format, most significant byte first.\n\
         \n\
         {}",
        bus_help()
    )
}

#[derive(Parser, Debug)]
#[command(name = "hwmem")]
#[command(
    author,
    version,
    about = "Read/write device registers selected by device-tree compatibility string",
    long_about = None,
    after_help = after_help()
)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Bus backend, "name" or "name:key=value,..."
    #[arg(short, long, default_value = DEFAULT_BUS, help = bus_arg_help())]
    pub bus: String,

    /// Use device of selected index
    #[arg(
        short = 'd',
        long = "device",
        value_name = "INDEX",
        allow_negative_numbers = true,
        conflicts_with = "all"
    )]
    pub device: Option<i64>,

    /// Use all compatible devices
    #[arg(short = 'A', long)]
    pub all: bool,

    /// List all compatible devices
    #[arg(short, long)]
    pub list: bool,

    /// Device-tree compatibility string
    #[arg(value_name = "COMPAT")]
    pub compat: Option<String>,

    /// ADDRESS [WIDTH [VALUE]]
    #[arg(value_name = "OPERANDS", num_args = 0.., allow_negative_numbers = true)]
    pub operands: Vec<String>,
}
