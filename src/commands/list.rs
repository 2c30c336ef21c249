//! Device listing

use hwmem_core::Target;
use std::io::{self, Write};

/// Separator printed after each device description
const SEPARATOR: &str = "----------------------------";

/// Print every matched device, in enumeration order
pub fn print_devices<W: Write + ?Sized>(out: &mut W, targets: &[Target<'_>]) -> io::Result<()> {
    writeln!(out, "Available devices ({}): ", targets.len())?;
    for target in targets {
        writeln!(out, "{}", target.device.describe())?;
        writeln!(out, "{}", SEPARATOR)?;
    }
    Ok(())
}
