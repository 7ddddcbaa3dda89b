//! Escape sequence headers
//!
//! Every command starts with a header of the form
//!
//! ```text
//! ESC [ [marker] param ; param ; ... ; param final
//! ```
//!
//! Parameters are always decimal text, whatever base the payload uses.
//! The header is self-delimiting: the first byte that is neither a digit,
//! a sign nor `;` is the final character.

use std::fmt;

use super::value::write_decimal;

/// Escape byte that opens every command
pub const ESC: u8 = 0x1B;

/// Control sequence introducer following ESC
pub const CSI: u8 = b'[';

/// Separator between header parameters and between payload values
pub const SEPARATOR: u8 = b';';

/// Private marker used by palette commands
pub const PALETTE_MARKER: u8 = b'=';

/// One-byte opcode carried by the final character of a header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `a` - load bitmap, ASCII samples
    LoadAscii,
    /// `A` - load bitmap, ASCII (value, count) pairs
    LoadAsciiRle,
    /// `b` - load bitmap, raw bytes
    LoadBinary,
    /// `B` - load bitmap, raw bytes in the device's RLE format
    LoadBinaryRle,
    /// `d` - blit a loaded bitmap
    Blit,
    /// `p` - palette select or upload, told apart by parameter count
    Palette,
}

impl Opcode {
    pub const ALL: [Opcode; 6] = [
        Opcode::LoadAscii,
        Opcode::LoadAsciiRle,
        Opcode::LoadBinary,
        Opcode::LoadBinaryRle,
        Opcode::Blit,
        Opcode::Palette,
    ];

    /// Final character on the wire
    pub fn as_byte(self) -> u8 {
        match self {
            Opcode::LoadAscii => b'a',
            Opcode::LoadAsciiRle => b'A',
            Opcode::LoadBinary => b'b',
            Opcode::LoadBinaryRle => b'B',
            Opcode::Blit => b'd',
            Opcode::Palette => b'p',
        }
    }

    /// Look up the opcode for a final character
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'a' => Some(Opcode::LoadAscii),
            b'A' => Some(Opcode::LoadAsciiRle),
            b'b' => Some(Opcode::LoadBinary),
            b'B' => Some(Opcode::LoadBinaryRle),
            b'd' => Some(Opcode::Blit),
            b'p' => Some(Opcode::Palette),
            _ => None,
        }
    }

    /// Private marker expected before the parameters
    pub fn marker(self) -> Option<u8> {
        match self {
            Opcode::Palette => Some(PALETTE_MARKER),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

/// A command header ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeSequence {
    pub opcode: Opcode,
    pub params: Vec<i64>,
}

impl EscapeSequence {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            params: Vec::with_capacity(4),
        }
    }

    /// Append a parameter
    pub fn param(mut self, value: impl Into<i64>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Append the rendered header to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(ESC);
        out.push(CSI);
        if let Some(marker) = self.opcode.marker() {
            out.push(marker);
        }
        for (i, &param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(SEPARATOR);
            }
            write_decimal(out, param);
        }
        out.push(self.opcode.as_byte());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.params.len() * 6);
        self.write_to(&mut out);
        out
    }
}
