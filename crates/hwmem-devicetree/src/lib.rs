//! hwmem-devicetree - Linux device tree backend
//!
//! This crate finds devices in the live device tree the kernel exposes under
//! `/proc/device-tree` and accesses their register windows through an
//! `mmap` of `/dev/mem`.
//!
//! # Overview
//!
//! Every node with a `compatible` property and a `reg` window becomes a
//! device. The first `reg` entry is translated to a CPU physical address
//! through the `ranges` of its parent buses. Addresses passed to
//! [`Device::read`](hwmem_core::Device::read) and
//! [`Device::write`](hwmem_core::Device::write) are offsets into that window.
//!
//! # Usage with hwmem CLI
//!
//! ```bash
//! # Read the first register of the only AXI GPIO
//! hwmem xlnx,axi-gpio-2.0 0x0
//!
//! # Use an extracted device tree and a different memory device
//! hwmem -b devicetree:root=/tmp/dt,mem=/dev/mem xlnx,axi-gpio-2.0 0x0
//! ```
//!
//! # System Requirements
//!
//! - Linux with `CONFIG_PROC_DEVICETREE` or `/sys/firmware/devicetree`
//! - Root access (or `CAP_SYS_RAWIO`) for `/dev/mem`
//! - `CONFIG_STRICT_DEVMEM` must allow access to the device's window

pub mod device;
pub mod error;
pub mod physmap;
pub mod tree;

pub use device::{parse_options, DevicetreeBus, DevicetreeConfig, DtDevice, DEFAULT_MEM};
pub use error::{DevicetreeError, Result};
pub use physmap::PhysMap;
pub use tree::{DtNode, DEFAULT_ROOTS};

/// Open the device tree bus from `key=value` parameters
///
/// This is a convenience function for use in the CLI bus dispatch.
pub fn open_devicetree(options: &[(&str, &str)]) -> Result<DevicetreeBus> {
    let config = parse_options(options)?;
    DevicetreeBus::open(&config)
}
