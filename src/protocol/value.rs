//! Value encoding
//!
//! Payload samples and palette entries travel as ASCII text in one of two
//! radixes. Decimal values use the minimal number of digits. Hex values use
//! exactly two upper-case digits, so only 0..=255 is representable; larger
//! values are rejected, never truncated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Malformed, Result};

/// Radix used for ASCII payload values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Base {
    Decimal,
    Hex,
}

impl Base {
    /// Numeric radix as transmitted in command headers
    pub fn radix(self) -> u32 {
        match self {
            Base::Decimal => 10,
            Base::Hex => 16,
        }
    }

    /// Check that `value` is representable in this base
    pub fn check(self, value: u32) -> std::result::Result<(), Malformed> {
        match self {
            Base::Hex if value > 0xFF => Err(Malformed::HexOverflow(value)),
            _ => Ok(()),
        }
    }

    /// Value of a single ASCII digit in this base
    pub fn digit(self, byte: u8) -> Option<u32> {
        (byte as char).to_digit(self.radix())
    }
}

impl TryFrom<u32> for Base {
    type Error = Error;

    fn try_from(radix: u32) -> Result<Self> {
        match radix {
            10 => Ok(Base::Decimal),
            16 => Ok(Base::Hex),
            other => Err(Error::InvalidBase(other)),
        }
    }
}

impl From<Base> for u32 {
    fn from(base: Base) -> u32 {
        base.radix()
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.radix())
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Append the text form of `value` to `out`
///
/// The caller must have checked the value with [`Base::check`]; in hex
/// only the low byte is rendered.
pub fn write_value(out: &mut Vec<u8>, value: u32, base: Base) {
    match base {
        Base::Decimal => write_decimal(out, i64::from(value)),
        Base::Hex => {
            let byte = (value & 0xFF) as usize;
            out.push(HEX_DIGITS[byte >> 4]);
            out.push(HEX_DIGITS[byte & 0x0F]);
        },
    }
}

/// Append a signed decimal integer with no leading zeros
pub fn write_decimal(out: &mut Vec<u8>, value: i64) {
    if value < 0 {
        out.push(b'-');
    }
    let mut n = value.unsigned_abs();
    let mut digits = [0u8; 20];
    let mut len = 0;
    loop {
        digits[len] = b'0' + (n % 10) as u8;
        len += 1;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    out.extend(digits[..len].iter().rev());
}

/// Render `value` in the given radix, checking both radix and range
pub fn format_value(value: u32, radix: u32) -> Result<String> {
    let base = Base::try_from(radix)?;
    base.check(value)?;
    let mut out = Vec::with_capacity(10);
    write_value(&mut out, value, base);
    // Only ASCII digits were written
    Ok(out.into_iter().map(char::from).collect())
}
