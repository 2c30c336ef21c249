//! RON description of a dummy bus
//!
//! ```ron
//! (
//!     devices: [
//!         (
//!             name: "gpio@a0000000",
//!             compatible: ["xlnx,axi-gpio-2.0", "xlnx,xps-gpio-1.00.a"],
//!             base: 0xa0000000,
//!             size: KiB(4),
//!             fill: 0xff,
//!         ),
//!     ],
//! )
//! ```

use crate::error::{DummyError, Result};
use serde::Deserialize;
use std::path::Path;

/// Window size with human-readable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Size {
    /// Size in bytes
    B(usize),
    /// Size in kibibytes (1024 bytes)
    KiB(usize),
    /// Size in mebibytes (1024 * 1024 bytes)
    MiB(usize),
}

impl Size {
    /// Convert to bytes, `None` if the size does not fit in `usize`
    pub fn to_bytes(self) -> Option<usize> {
        match self {
            Size::B(n) => Some(n),
            Size::KiB(n) => n.checked_mul(1024),
            Size::MiB(n) => n.checked_mul(1024 * 1024),
        }
    }
}

/// One emulated device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DummyConfig {
    /// Node name shown in listings
    pub name: String,
    /// Compatibility strings the device answers to
    pub compatible: Vec<String>,
    /// Base address shown in listings
    #[serde(default)]
    pub base: u64,
    /// Register window size
    pub size: Size,
    /// Initial value of every byte
    #[serde(default)]
    pub fill: u8,
}

impl DummyConfig {
    /// A zero-filled device with a single compatibility string
    pub fn new(name: &str, compatible: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            compatible: vec![compatible.to_string()],
            base: 0,
            size: Size::B(size),
            fill: 0,
        }
    }

    fn validate(&self) -> Result<()> {
        match self.size.to_bytes() {
            Some(0) => return Err(DummyError::EmptyWindow(self.name.clone())),
            None => return Err(DummyError::WindowTooLarge(self.name.clone())),
            Some(_) => {}
        }
        if self.compatible.is_empty() {
            return Err(DummyError::NoCompatible(self.name.clone()));
        }
        Ok(())
    }
}

/// Top-level bus description
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BusConfig {
    /// Devices in enumeration order
    #[serde(default)]
    pub devices: Vec<DummyConfig>,
}

impl BusConfig {
    /// Parse and validate a RON bus description
    pub fn from_ron(content: &str) -> Result<Self> {
        let config: BusConfig = ron::from_str(content)?;
        for device in &config.devices {
            device.validate()?;
        }
        Ok(config)
    }

    /// Load a RON bus description from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DummyError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_ron(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bus() {
        let ron = r#"
        (
            devices: [
                (
                    name: "gpio@a0000000",
                    compatible: ["xlnx,axi-gpio-2.0", "xlnx,xps-gpio-1.00.a"],
                    base: 0xa0000000,
                    size: KiB(4),
                    fill: 0xff,
                ),
                (
                    name: "scratch",
                    compatible: ["hwmem,scratch"],
                    size: B(64),
                ),
            ],
        )
        "#;
        let bus = BusConfig::from_ron(ron).unwrap();
        assert_eq!(bus.devices.len(), 2);
        assert_eq!(bus.devices[0].base, 0xa000_0000);
        assert_eq!(bus.devices[0].size.to_bytes(), Some(4096));
        assert_eq!(bus.devices[0].fill, 0xff);
        assert_eq!(bus.devices[1].base, 0);
        assert_eq!(bus.devices[1].fill, 0);
    }

    #[test]
    fn test_empty_bus() {
        assert_eq!(BusConfig::from_ron("()").unwrap(), BusConfig::default());
    }

    #[test]
    fn test_rejects_empty_window() {
        let ron = r#"(devices: [(name: "x", compatible: ["a,b"], size: B(0))])"#;
        assert!(matches!(
            BusConfig::from_ron(ron),
            Err(DummyError::EmptyWindow(name)) if name == "x"
        ));
    }

    #[test]
    fn test_rejects_oversized_window() {
        let ron = format!(
            r#"(devices: [(name: "huge", compatible: ["a,b"], size: MiB({}))])"#,
            usize::MAX / 1024
        );
        assert!(matches!(
            BusConfig::from_ron(&ron),
            Err(DummyError::WindowTooLarge(name)) if name == "huge"
        ));
    }

    #[test]
    fn test_rejects_no_compatible() {
        let ron = r#"(devices: [(name: "x", compatible: [], size: B(4))])"#;
        assert!(matches!(
            BusConfig::from_ron(ron),
            Err(DummyError::NoCompatible(_))
        ));
    }

    #[test]
    fn test_rejects_bad_ron() {
        assert!(matches!(
            BusConfig::from_ron("(devices: [(name: 1)])"),
            Err(DummyError::Parse(_))
        ));
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(Size::B(256).to_bytes(), Some(256));
        assert_eq!(Size::KiB(4).to_bytes(), Some(4096));
        assert_eq!(Size::MiB(1).to_bytes(), Some(1048576));
        assert_eq!(Size::MiB(usize::MAX).to_bytes(), None);
        assert_eq!(Size::KiB(usize::MAX / 1024 + 1).to_bytes(), None);
    }
}
