//! `ADDRESS [WIDTH [VALUE]]` operand parsing
//!
//! All operands accept C integer literal syntax: `0x`/`0X` hexadecimal,
//! a leading `0` for octal, otherwise decimal, with an optional sign.

use crate::error::ParseError;

/// Transfer width used when WIDTH is omitted
pub const DEFAULT_WIDTH_BITS: u32 = 32;

/// Widest write payload (the VALUE operand is a 64-bit integer)
pub const MAX_WRITE_BYTES: usize = 8;

/// Direction of an access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read the register and print it
    Read,
    /// Write the low `width` bytes of `value`
    Write {
        /// Value to write
        value: u64,
    },
}

/// A validated read or write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Offset into each device's register window
    pub address: u64,
    /// Transfer size in bytes, always > 0 (and <= 8 for writes)
    pub width: usize,
    /// Read or write
    pub access: Access,
}

impl Operation {
    /// Parse the operands following the compatibility string
    ///
    /// `tokens` is `[ADDRESS]`, `[ADDRESS, WIDTH]` or
    /// `[ADDRESS, WIDTH, VALUE]`; WIDTH is in bits.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ParseError> {
        let (address, width, value) = match tokens {
            [a] => (a.as_ref(), None, None),
            [a, w] => (a.as_ref(), Some(w.as_ref()), None),
            [a, w, v] => (a.as_ref(), Some(w.as_ref()), Some(v.as_ref())),
            _ => return Err(ParseError::TokenCount(tokens.len())),
        };

        let address = parse_address(address)?;
        let width = match width {
            Some(w) => parse_width(w)?,
            None => (DEFAULT_WIDTH_BITS / 8) as usize,
        };
        let access = match value {
            Some(v) => {
                let value = parse_value(v)?;
                if width > MAX_WRITE_BYTES {
                    return Err(ParseError::UnsupportedWidth { bytes: width });
                }
                Access::Write { value }
            }
            None => Access::Read,
        };

        log::debug!("Parsed operation: {:?} of {} bytes at {:#x}", access, width, address);

        Ok(Self {
            address,
            width,
            access,
        })
    }

    /// True for writes
    pub fn is_write(&self) -> bool {
        matches!(self.access, Access::Write { .. })
    }

    /// Bytes a write puts on the bus: the `width` least-significant bytes of
    /// the value, in host order
    pub fn payload(&self) -> Option<Vec<u8>> {
        match self.access {
            Access::Read => None,
            Access::Write { value } => {
                let bytes = if cfg!(target_endian = "little") {
                    value.to_le_bytes()[..self.width].to_vec()
                } else {
                    value.to_be_bytes()[MAX_WRITE_BYTES - self.width..].to_vec()
                };
                Some(bytes)
            }
        }
    }
}

fn parse_address(s: &str) -> Result<u64, ParseError> {
    match parse_literal(s) {
        Some((false, magnitude)) | Some((true, magnitude @ 0)) => Ok(magnitude),
        _ => Err(ParseError::InvalidAddress(s.to_string())),
    }
}

fn parse_width(s: &str) -> Result<usize, ParseError> {
    let invalid = || ParseError::InvalidWidth(s.to_string());
    let bits = match parse_literal(s) {
        Some((false, magnitude)) => magnitude,
        _ => return Err(invalid()),
    };
    if bits == 0 || bits % 8 != 0 {
        return Err(invalid());
    }
    usize::try_from(bits / 8).map_err(|_| invalid())
}

fn parse_value(s: &str) -> Result<u64, ParseError> {
    match parse_literal(s) {
        Some((false, magnitude)) => Ok(magnitude),
        // Negative values are taken as two's complement
        Some((true, magnitude)) if magnitude <= 1 << 63 => Ok(magnitude.wrapping_neg()),
        _ => Err(ParseError::InvalidValue(s.to_string())),
    }
}

/// Split a C integer literal into sign and magnitude
///
/// Surrounding whitespace is ignored; anything else after the digits is
/// rejected.
fn parse_literal(s: &str) -> Option<(bool, u64)> {
    let s = s.trim();
    let (negative, rest) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(s))
    };

    let (digits, radix) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
    {
        (hex, 16)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (&rest[1..], 8)
    } else {
        (rest, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix)
        .ok()
        .map(|magnitude| (negative, magnitude))
}
