//! Parsing of user-supplied values and files

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::protocol::Base;

/// Errors in user input, reported before any command is built
#[derive(Error, Debug)]
pub enum InputError {
    #[error("'{text}' is not a valid base-{base} value")]
    BadNumber { text: String, base: Base },

    #[error("value list is empty")]
    EmptyList,

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse a comma-separated value list
///
/// In base 16 each value may carry an optional `0x` prefix.
pub fn parse_values(text: &str, base: Base) -> Result<Vec<u32>, InputError> {
    if text.trim().is_empty() {
        return Err(InputError::EmptyList);
    }
    text.split(',').map(|item| parse_value(item, base)).collect()
}

fn parse_value(item: &str, base: Base) -> Result<u32, InputError> {
    let trimmed = item.trim();
    let digits = match base {
        Base::Hex => trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed),
        Base::Decimal => trimmed,
    };
    // from_str_radix accepts a leading '+', the device never sends one
    if digits.is_empty() || !digits.bytes().all(|b| base.digit(b).is_some()) {
        return Err(InputError::BadNumber {
            text: item.to_string(),
            base,
        });
    }
    u32::from_str_radix(digits, base.radix()).map_err(|_| InputError::BadNumber {
        text: item.to_string(),
        base,
    })
}

/// Read a raw binary payload
pub fn read_payload(path: &Path) -> Result<Vec<u8>, InputError> {
    std::fs::read(path).map_err(|source| InputError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a radix argument, accepting only 10 and 16
pub fn parse_base(text: &str) -> Result<Base, String> {
    let radix: u32 = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))?;
    Base::try_from(radix).map_err(|e| e.to_string())
}
