//! hwmem-dummy - In-memory emulated devices
//!
//! This crate provides a bus of emulated devices whose register windows live
//! in memory. It's useful for testing and for trying out `hwmem` without
//! access to real hardware.
//!
//! ```ignore
//! use hwmem_dummy::{BusConfig, DummyBus};
//!
//! let bus = DummyBus::from_config(BusConfig::from_file("board.ron".as_ref())?);
//! ```

pub mod config;
pub mod error;

pub use config::{BusConfig, DummyConfig, Size};
pub use error::{DummyError, Result};

use hwmem_core::{Bus, CompatSpec, Device, DeviceError};
use std::path::Path;

/// Emulated device backed by a byte vector
#[derive(Debug, Clone)]
pub struct DummyDevice {
    config: DummyConfig,
    data: Vec<u8>,
    attached: bool,
    attach_count: usize,
}

impl DummyDevice {
    /// Create a device with every byte set to `config.fill`
    ///
    /// A size that overflows `usize` gives an empty window; configurations
    /// loaded through [`BusConfig`] are validated against that.
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![config.fill; config.size.to_bytes().unwrap_or(0)];
        Self {
            config,
            data,
            attached: false,
            attach_count: 0,
        }
    }

    /// Create a device with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut device = Self::new(config);
        let len = core::cmp::min(initial_data.len(), device.data.len());
        device.data[..len].copy_from_slice(&initial_data[..len]);
        device
    }

    /// Get a reference to the register window
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// How many times `attach` has been called
    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    fn window(&self, address: u64, len: usize) -> core::result::Result<usize, DeviceError> {
        if !self.attached {
            return Err(DeviceError::NotAttached);
        }
        let out_of_bounds = || DeviceError::OutOfBounds {
            address,
            len,
            size: self.data.len() as u64,
        };
        let start = usize::try_from(address).map_err(|_| out_of_bounds())?;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start),
            _ => Err(out_of_bounds()),
        }
    }
}

impl Device for DummyDevice {
    fn attach(&mut self) -> core::result::Result<(), DeviceError> {
        self.attach_count += 1;
        self.attached = true;
        log::debug!("dummy: attached {}", self.config.name);
        Ok(())
    }

    fn read(&mut self, address: u64, buf: &mut [u8]) -> core::result::Result<(), DeviceError> {
        let start = self.window(address, buf.len())?;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u64, data: &[u8]) -> core::result::Result<(), DeviceError> {
        let start = self.window(address, data.len())?;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "name: {}\ncompatible: {}\nreg: {:#x} + {:#x} (emulated)",
            self.config.name,
            self.config.compatible.join(" "),
            self.config.base,
            self.data.len()
        )
    }
}

/// Bus owning a fixed list of emulated devices
#[derive(Debug, Clone, Default)]
pub struct DummyBus {
    devices: Vec<DummyDevice>,
}

impl DummyBus {
    /// Create a bus from already built devices
    pub fn new(devices: Vec<DummyDevice>) -> Self {
        Self { devices }
    }

    /// Create a bus with one fresh device per configuration entry
    pub fn from_config(config: BusConfig) -> Self {
        Self::new(config.devices.into_iter().map(DummyDevice::new).collect())
    }

    /// Open a bus from `key=value` parameters
    ///
    /// Supported keys:
    /// - `file=<path>` - RON bus description; without it the bus is empty
    pub fn open(params: &[(&str, &str)]) -> Result<Self> {
        let mut file = None;
        for (key, value) in params {
            match *key {
                "file" => file = Some(*value),
                _ => {
                    return Err(DummyError::InvalidParameter {
                        name: key.to_string(),
                        message: format!("unknown option (value '{}')", value),
                    })
                }
            }
        }

        let config = match file {
            Some(path) => BusConfig::from_file(Path::new(path))?,
            None => {
                log::warn!("dummy: no file= given, bus is empty");
                BusConfig::default()
            }
        };

        log::info!("dummy: {} emulated device(s)", config.devices.len());
        Ok(Self::from_config(config))
    }

    /// All devices, in enumeration order
    pub fn devices(&self) -> &[DummyDevice] {
        &self.devices
    }
}

impl Bus for DummyBus {
    fn find_devices(&mut self, specs: &[CompatSpec]) -> Vec<&mut dyn Device> {
        self.devices
            .iter_mut()
            .filter(|d| CompatSpec::any_matches(specs, d.config.compatible.as_slice()))
            .map(|d| d as &mut dyn Device)
            .collect()
    }
}
