//! In-memory sink

use std::io;

use super::Sink;

/// Captures everything written to it
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    bytes: Vec<u8>,
    writes: usize,
    flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes written so far
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of `write` calls
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of `flush` calls
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.writes = 0;
        self.flushes = 0;
    }
}

impl Sink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.bytes.extend_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn target(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_counts() {
        let mut sink = MemorySink::new();
        sink.write(b"ab").unwrap();
        sink.write(b"c").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.bytes(), b"abc");
        assert_eq!(sink.writes(), 2);
        assert_eq!(sink.flushes(), 1);

        sink.clear();
        assert!(sink.bytes().is_empty());
        assert_eq!(sink.writes(), 0);
    }
}
