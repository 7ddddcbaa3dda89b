//! PiGFX Link
//!
//! Encoder and sender for the escape-sequence command protocol spoken by
//! PiGFX graphics terminals over a serial line. This crate provides:
//!
//! - `protocol`: value encoding, escape sequence headers, commands, the
//!   command codec and a device-side reference decoder
//! - `sink`: destinations for encoded commands (serial port, dry run, memory)
//! - `app`: configuration
//! - `cli`: the `pigfx-send` command line surface

pub mod app;
pub mod cli;
pub mod error;
pub mod protocol;
pub mod sink;

pub use error::{Error, Malformed, Result};
pub use protocol::{send, Base, Command};
pub use sink::Sink;
