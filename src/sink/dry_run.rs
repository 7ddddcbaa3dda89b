//! Dry-run sink
//!
//! Writes commands to any `io::Write` instead of a device. `Raw` output is
//! byte-identical to what the device would receive; `Escaped` output is
//! meant for reading on a terminal.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use super::Sink;
use crate::protocol::ESC;

/// How a dry run renders bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DryRunFormat {
    /// Exact bytes
    Raw,
    /// Printable ASCII as-is, ESC as `\e`, other bytes as `\xHH`,
    /// one line per flushed command
    #[default]
    Escaped,
}

/// Sink that writes to a writer such as stdout
#[derive(Debug)]
pub struct DryRunSink<W: Write> {
    inner: W,
    format: DryRunFormat,
    name: String,
}

impl<W: Write> DryRunSink<W> {
    pub fn new(inner: W, format: DryRunFormat) -> Self {
        Self {
            inner,
            format,
            name: "dry-run".to_string(),
        }
    }

    /// Override the name shown in logs and errors
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Render bytes in the escaped dry-run notation
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            ESC => out.push_str("\\e"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02X}", byte)),
        }
    }
    out
}

impl<W: Write> Sink for DryRunSink<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.format {
            DryRunFormat::Raw => self.inner.write_all(bytes),
            DryRunFormat::Escaped => self.inner.write_all(escape_bytes(bytes).as_bytes()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.format == DryRunFormat::Escaped {
            self.inner.write_all(b"\n")?;
        }
        self.inner.flush()
    }

    fn target(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_bytes() {
        assert_eq!(escape_bytes(b"\x1b[=3p"), "\\e[=3p");
        assert_eq!(escape_bytes(&[0x00, 0xFF, b'\\']), "\\x00\\xFF\\\\");
    }

    #[test]
    fn test_raw_is_byte_exact() {
        let mut sink = DryRunSink::new(Vec::new(), DryRunFormat::Raw);
        sink.write(b"\x1b[0;1;1b\x00").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.into_inner(), b"\x1b[0;1;1b\x00");
    }

    #[test]
    fn test_escaped_adds_newline_per_flush() {
        let mut sink = DryRunSink::new(Vec::new(), DryRunFormat::Escaped).with_name("stdout");
        assert_eq!(sink.target(), "stdout");
        sink.write(b"\x1b[2;-5;100d").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.into_inner(), b"\\e[2;-5;100d\n");
    }
}
