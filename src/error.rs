//! Error types for encoding and sending commands

use std::fmt;
use std::io;

use thiserror::Error;

use crate::app::ConfigError;
use crate::cli::InputError;

/// Reasons a command is rejected before any byte is emitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    /// RLE ASCII loads carry (value, run-count) pairs
    #[error("RLE sample list has odd length {0}; expected (value, count) pairs")]
    OddRleSamples(usize),

    /// Base 16 values are rendered as exactly two hex digits
    #[error("value {0} does not fit in two hex digits")]
    HexOverflow(u32),

    /// Only the built-in palettes 0..=3 can be selected
    #[error("palette index {0} out of range 0..=3")]
    PaletteIndex(u8),
}

/// Transport operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Write,
    Flush,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportOp::Write => f.write_str("write"),
            TransportOp::Flush => f.write_str("flush"),
        }
    }
}

/// Crate error type
#[derive(Error, Debug)]
pub enum Error {
    /// Radix other than 10 or 16
    #[error("invalid base {0}: expected 10 or 16")]
    InvalidBase(u32),

    /// Command violates a construction-time invariant
    #[error("malformed command: {0}")]
    Malformed(#[from] Malformed),

    /// I/O failure while transmitting a command
    #[error("{op} to {target} failed: {source}")]
    Transport {
        target: String,
        op: TransportOp,
        #[source]
        source: io::Error,
    },

    /// Serial port could not be opened
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Serial port enumeration failed
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: {0}")]
    Input(#[from] InputError),
}

impl Error {
    /// True for errors raised before any byte reached the transport
    pub fn is_construction(&self) -> bool {
        matches!(self, Error::InvalidBase(_) | Error::Malformed(_))
    }
}

/// Result type for encoding and transport operations
pub type Result<T> = std::result::Result<T, Error>;
