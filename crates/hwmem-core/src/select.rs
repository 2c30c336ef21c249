//! Device selection
//!
//! Decides which of the matched devices an operation is applied to. The
//! decision table is:
//!
//! | mode          | 0 matched    | 1 matched | N matched             |
//! |---------------|--------------|-----------|-----------------------|
//! | `AllMatching` | `EmptyMatch` | `[d0]`    | `[d0, .., dN-1]`      |
//! | `ByIndex(i)`  | out of range | `[di]`    | `[di]`                |
//! | `Auto`        | `NoDevice`   | `[d0]`    | `AmbiguousSelection`  |
//!
//! An ambiguous match is always an error; there is no implicit fallback to
//! the first device.

use crate::error::SelectionError;

/// How to pick devices out of the matched set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Every matched device, in enumeration order
    AllMatching,
    /// Exactly one device by its index in enumeration order
    ByIndex(i64),
    /// The only matched device; ambiguity is an error
    Auto,
}

impl SelectionMode {
    /// Build the mode from the `-A` and `-d` command line flags
    ///
    /// The two flags are mutually exclusive.
    pub fn from_flags(all: bool, index: Option<i64>) -> Result<Self, SelectionError> {
        match (all, index) {
            (true, None) => Ok(Self::AllMatching),
            (true, Some(_)) => Err(SelectionError::ConflictingModes),
            (false, Some(i)) => Ok(Self::ByIndex(i)),
            (false, None) => Ok(Self::Auto),
        }
    }
}

/// Reduce `devices` to the set the operation is applied to
///
/// The returned set is never empty and keeps the input order.
pub fn select<T>(devices: Vec<T>, mode: SelectionMode) -> Result<Vec<T>, SelectionError> {
    let count = devices.len();

    match mode {
        SelectionMode::AllMatching => {
            if devices.is_empty() {
                return Err(SelectionError::EmptyMatch);
            }
            Ok(devices)
        }
        SelectionMode::ByIndex(index) => {
            let position = usize::try_from(index)
                .ok()
                .filter(|&i| i < count)
                .ok_or(SelectionError::IndexOutOfRange { index, count })?;
            Ok(devices.into_iter().nth(position).into_iter().collect())
        }
        SelectionMode::Auto => match count {
            0 => Err(SelectionError::NoDevice),
            1 => Ok(devices),
            _ => Err(SelectionError::AmbiguousSelection { count }),
        },
    }
}
