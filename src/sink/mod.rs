//! Byte sinks that commands are sent to
//!
//! A sink receives one complete command per `write` and is flushed right
//! after it. Implementations:
//!
//! - `SerialSink`: a serial port connected to the device
//! - `DryRunSink`: any writer, raw or with control bytes escaped
//! - `MemorySink`: an in-memory capture

mod dry_run;
mod memory;
mod serial;

use std::io;

pub use dry_run::{escape_bytes, DryRunFormat, DryRunSink};
pub use memory::MemorySink;
pub use serial::{list_ports, PortInfo, SerialSink};

/// Destination for encoded commands
pub trait Sink {
    /// Write all of `bytes`
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Block until everything written has been transmitted
    fn flush(&mut self) -> io::Result<()>;

    /// Name used in logs and error messages
    fn target(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn target(&self) -> &str {
        (**self).target()
    }
}
