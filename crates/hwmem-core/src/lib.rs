//! hwmem-core - Device selection and register access dispatch
//!
//! This crate holds the decision logic of `hwmem`: it turns a list of
//! devices matched by a compatibility string into the set of devices to
//! operate on, validates the `ADDRESS [WIDTH [VALUE]]` operands and fans the
//! resulting read or write out over the selected devices.
//!
//! It never touches hardware itself. Backends implement the [`Device`] and
//! [`Bus`] traits and the CLI wires them together:
//!
//! ```ignore
//! use hwmem_core::{dispatch, select, CompatSpec, Operation, SelectionMode, Target};
//!
//! let specs = [CompatSpec::new("xlnx,axi-gpio-2.0")];
//! let targets = Target::enumerate(bus.find_devices(&specs));
//! let mut selected = select(targets, SelectionMode::Auto)?;
//! let op = Operation::parse(&["0x10", "32"])?;
//! let report = dispatch(&mut selected, &op, &mut std::io::stdout())?;
//! report.into_result()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod device;
pub mod dispatch;
pub mod error;
pub mod operation;
pub mod select;

pub use device::{Bus, CompatSpec, Device};
pub use dispatch::{dispatch, format_read, DeviceOutcome, DispatchReport, Target};
pub use error::{DeviceError, DeviceFailure, DispatchError, ParseError, SelectionError};
pub use operation::{Access, Operation, DEFAULT_WIDTH_BITS, MAX_WRITE_BYTES};
pub use select::{select, SelectionMode};
