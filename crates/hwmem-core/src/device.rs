//! Device and bus capability traits
//!
//! The core never sees a concrete device type. Backends (device tree +
//! `/dev/mem`, the in-memory dummy bus, ...) implement these traits and the
//! selector and dispatcher work against `&mut dyn Device`.

use crate::error::DeviceError;

/// Device-tree style compatibility query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompatSpec {
    /// Compatibility string, e.g. `"xlnx,axi-gpio-2.0"`
    pub compatible: String,
}

impl CompatSpec {
    /// Create a spec matching one compatibility string
    pub fn new(compatible: impl Into<String>) -> Self {
        Self {
            compatible: compatible.into(),
        }
    }

    /// Check whether a device advertising `compatible` satisfies this spec
    pub fn matches<S: AsRef<str>>(&self, compatible: &[S]) -> bool {
        compatible.iter().any(|c| c.as_ref() == self.compatible)
    }

    /// Check whether any of `specs` matches
    pub fn any_matches<S: AsRef<str>>(specs: &[CompatSpec], compatible: &[S]) -> bool {
        specs.iter().any(|spec| spec.matches(compatible))
    }
}

/// A memory-mapped hardware device
///
/// Addresses are offsets into the device's register window. Buffers carry
/// bytes in host order.
pub trait Device {
    /// Activate the device; must precede any read or write
    fn attach(&mut self) -> Result<(), DeviceError>;

    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Write all of `data` starting at `address`
    fn write(&mut self, address: u64, data: &[u8]) -> Result<(), DeviceError>;

    /// Human-readable description, used by device listing
    fn describe(&self) -> String;
}

/// Owner of all devices discovered on a platform
///
/// Devices returned by [`Bus::find_devices`] borrow the bus, so none can
/// outlive it; dropping the bus releases every device.
pub trait Bus {
    /// All devices matching any of `specs`, in enumeration order
    fn find_devices(&mut self, specs: &[CompatSpec]) -> Vec<&mut dyn Device>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any_entry() {
        let spec = CompatSpec::new("xlnx,xps-gpio-1.00.a");
        assert!(spec.matches(&["xlnx,axi-gpio-2.0", "xlnx,xps-gpio-1.00.a"]));
        assert!(!spec.matches(&["xlnx,axi-gpio-2.0"]));
        assert!(!spec.matches::<&str>(&[]));
    }

    #[test]
    fn test_matches_is_exact() {
        let spec = CompatSpec::new("foo,bar");
        assert!(!spec.matches(&["foo,bar2"]));
        assert!(!spec.matches(&["FOO,BAR"]));
        assert!(!spec.matches(&["foo"]));
    }

    #[test]
    fn test_any_matches() {
        let specs = [CompatSpec::new("a,b"), CompatSpec::new("c,d")];
        assert!(CompatSpec::any_matches(&specs, &["c,d"]));
        assert!(!CompatSpec::any_matches(&specs, &["e,f"]));
        assert!(!CompatSpec::any_matches(&[], &["a,b"]));
    }
}
