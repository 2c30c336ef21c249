//! Operation dispatch over the selected devices
//!
//! Every device is attached and then read or written independently. A
//! failing device does not stop the loop; each outcome is recorded in a
//! [`DispatchReport`] and turned into an aggregate error at the end.

use crate::device::Device;
use crate::error::{DeviceError, DeviceFailure, DispatchError};
use crate::operation::{Access, Operation};
use std::fmt::Write as _;
use std::io;

/// A matched device together with its position in enumeration order
pub struct Target<'a> {
    /// Index in the bus's enumeration order (the `-d` index)
    pub index: usize,
    /// The device, borrowed from its bus
    pub device: &'a mut dyn Device,
}

impl<'a> Target<'a> {
    /// Number devices in the order the bus returned them
    pub fn enumerate(devices: Vec<&'a mut dyn Device>) -> Vec<Self> {
        devices
            .into_iter()
            .enumerate()
            .map(|(index, device)| Self { index, device })
            .collect()
    }
}

/// Result of the operation on one device
#[derive(Debug)]
pub struct DeviceOutcome {
    /// Index of the device in enumeration order
    pub index: usize,
    /// Read data (`Some` for reads, `None` for writes) or the failure
    pub result: Result<Option<Vec<u8>>, DeviceError>,
}

/// Per-device outcomes of one dispatch, in dispatch order
#[derive(Debug, Default)]
pub struct DispatchReport {
    outcomes: Vec<DeviceOutcome>,
}

impl DispatchReport {
    /// All outcomes
    pub fn outcomes(&self) -> &[DeviceOutcome] {
        &self.outcomes
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// True when every device succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Collapse into an aggregate error naming each failed device
    pub fn into_result(self) -> Result<(), DispatchError> {
        let total = self.outcomes.len();
        let failures: Vec<DeviceFailure> = self
            .outcomes
            .into_iter()
            .filter_map(|o| match o.result {
                Ok(_) => None,
                Err(error) => Some(DeviceFailure {
                    index: o.index,
                    error,
                }),
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Failed { total, failures })
        }
    }
}

/// Render read data as `0x` followed by two hex digits per byte, the byte at
/// the highest index first
pub fn format_read(buf: &[u8]) -> String {
    let mut s = String::with_capacity(2 + buf.len() * 2);
    s.push_str("0x");
    for byte in buf.iter().rev() {
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Apply `op` to every target in order
///
/// Each target is attached exactly once, right before its access. Read
/// results are written to `out` as one line per device as soon as they are
/// available. Only a failure to write `out` aborts the loop.
pub fn dispatch<W: io::Write + ?Sized>(
    targets: &mut [Target<'_>],
    op: &Operation,
    out: &mut W,
) -> io::Result<DispatchReport> {
    let payload = op.payload();
    let mut report = DispatchReport::default();

    for target in targets.iter_mut() {
        let result = run_one(&mut *target.device, op, payload.as_deref());

        match &result {
            Ok(Some(data)) => writeln!(out, "{}", format_read(data))?,
            Ok(None) => {}
            Err(e) => log::warn!("Device #{}: {}", target.index, e),
        }

        report.outcomes.push(DeviceOutcome {
            index: target.index,
            result,
        });
    }

    Ok(report)
}

fn run_one(
    device: &mut dyn Device,
    op: &Operation,
    payload: Option<&[u8]>,
) -> Result<Option<Vec<u8>>, DeviceError> {
    device.attach()?;

    match (op.access, payload) {
        (Access::Write { .. }, Some(data)) => {
            log::trace!("write {:02x?} at {:#x}", data, op.address);
            device.write(op.address, data)?;
            Ok(None)
        }
        _ => {
            let mut buf = Vec::new();
            buf.try_reserve_exact(op.width)
                .map_err(|_| DeviceError::Allocation { len: op.width })?;
            buf.resize(op.width, 0);
            device.read(op.address, &mut buf)?;
            log::trace!("read {:02x?} at {:#x}", buf, op.address);
            Ok(Some(buf))
        }
    }
}
