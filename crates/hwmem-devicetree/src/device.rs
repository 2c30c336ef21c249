//! Device tree bus and `/dev/mem` backed devices

use crate::error::{DevicetreeError, Result};
use crate::physmap::PhysMap;
use crate::tree::{self, DtNode};
use hwmem_core::{Bus, CompatSpec, Device, DeviceError};
use std::path::{Path, PathBuf};

/// Physical memory device used by default
pub const DEFAULT_MEM: &str = "/dev/mem";

/// Configuration for opening the device tree bus
#[derive(Debug, Clone)]
pub struct DevicetreeConfig {
    /// Device tree root; searched in the default locations when unset
    pub root: Option<PathBuf>,
    /// File mapped for register access
    pub mem: PathBuf,
}

impl Default for DevicetreeConfig {
    fn default() -> Self {
        Self {
            root: None,
            mem: PathBuf::from(DEFAULT_MEM),
        }
    }
}

/// Parse `key=value` bus parameters
///
/// Supported keys:
/// - `root=<dir>` - device tree root (default: `/proc/device-tree`)
/// - `mem=<path>` - memory device (default: `/dev/mem`)
pub fn parse_options(options: &[(&str, &str)]) -> Result<DevicetreeConfig> {
    let mut config = DevicetreeConfig::default();

    for (key, value) in options {
        if value.is_empty() {
            return Err(DevicetreeError::InvalidParameter {
                name: key.to_string(),
                message: "empty value".to_string(),
            });
        }
        match *key {
            "root" => config.root = Some(PathBuf::from(value)),
            "mem" => config.mem = PathBuf::from(value),
            _ => {
                return Err(DevicetreeError::InvalidParameter {
                    name: key.to_string(),
                    message: format!("unknown option (value '{}')", value),
                })
            }
        }
    }

    Ok(config)
}

/// A device tree node whose register window is mapped on attach
pub struct DtDevice {
    node: DtNode,
    mem: PathBuf,
    map: Option<PhysMap>,
}

impl DtDevice {
    /// Create an unattached device for `node`, mapping from `mem`
    pub fn new(node: DtNode, mem: &Path) -> Self {
        Self {
            node,
            mem: mem.to_path_buf(),
            map: None,
        }
    }

    /// The device tree node
    pub fn node(&self) -> &DtNode {
        &self.node
    }

    /// True once the register window is mapped
    pub fn is_attached(&self) -> bool {
        self.map.is_some()
    }

    /// Mapped window and the in-window offset of an access
    fn window(&self, address: u64, len: usize) -> core::result::Result<(&PhysMap, usize), DeviceError> {
        let map = self.map.as_ref().ok_or(DeviceError::NotAttached)?;
        let fits = address
            .checked_add(len as u64)
            .is_some_and(|end| end <= self.node.size);
        if !fits {
            return Err(DeviceError::OutOfBounds {
                address,
                len,
                size: self.node.size,
            });
        }
        Ok((map, address as usize))
    }
}

impl Device for DtDevice {
    fn attach(&mut self) -> core::result::Result<(), DeviceError> {
        if self.map.is_some() {
            return Ok(());
        }
        let size = usize::try_from(self.node.size).map_err(|_| {
            DeviceError::Attach(format!("window of {:#x} bytes is too large", self.node.size).into())
        })?;
        let map = PhysMap::new(&self.mem, self.node.base, size)
            .map_err(|e| DeviceError::Attach(Box::new(e)))?;
        log::debug!("Attached {} at {:#x}", self.node.path, self.node.base);
        self.map = Some(map);
        Ok(())
    }

    fn read(&mut self, address: u64, buf: &mut [u8]) -> core::result::Result<(), DeviceError> {
        let (map, offset) = self.window(address, buf.len())?;
        map.read(offset, buf).map_err(|e| DeviceError::Read {
            address,
            len: buf.len(),
            source: Box::new(e),
        })
    }

    fn write(&mut self, address: u64, data: &[u8]) -> core::result::Result<(), DeviceError> {
        let (map, offset) = self.window(address, data.len())?;
        map.write(offset, data).map_err(|e| DeviceError::Write {
            address,
            len: data.len(),
            source: Box::new(e),
        })
    }

    fn describe(&self) -> String {
        format!(
            "name: {}\npath: {}\ncompatible: {}\nreg: {:#x} + {:#x}",
            self.node.name,
            self.node.path,
            self.node.compatible.join(" "),
            self.node.base,
            self.node.size
        )
    }
}

/// All memory-mapped nodes of a device tree
pub struct DevicetreeBus {
    root: PathBuf,
    devices: Vec<DtDevice>,
}

impl DevicetreeBus {
    /// Scan the device tree described by `config`
    pub fn open(config: &DevicetreeConfig) -> Result<Self> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None => tree::default_root()?,
        };
        let devices = tree::scan(&root)?
            .into_iter()
            .map(|node| DtDevice::new(node, &config.mem))
            .collect::<Vec<_>>();

        log::info!(
            "Opened device tree {} ({} mapped nodes)",
            root.display(),
            devices.len()
        );
        Ok(Self { root, devices })
    }

    /// Device tree root in use
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All devices, in enumeration order
    pub fn devices(&self) -> &[DtDevice] {
        &self.devices
    }
}

impl Bus for DevicetreeBus {
    fn find_devices(&mut self, specs: &[CompatSpec]) -> Vec<&mut dyn Device> {
        let found: Vec<&mut dyn Device> = self
            .devices
            .iter_mut()
            .filter(|d| CompatSpec::any_matches(specs, d.node.compatible.as_slice()))
            .map(|d| d as &mut dyn Device)
            .collect();
        log::debug!("{} device(s) match {:?}", found.len(), specs);
        found
    }
}
