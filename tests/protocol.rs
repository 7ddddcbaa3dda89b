//! Wire-level tests for the command protocol
//!
//! Each test builds a command, sends it through a sink and checks the exact
//! bytes that reach the device.

use std::io;

use pigfx_link::error::TransportOp;
use pigfx_link::protocol::{format_value, DecodeError, Decoder, Frame};
use pigfx_link::sink::MemorySink;
use pigfx_link::{send, Base, Command, Error, Malformed, Sink};

/// Sink that fails on a chosen operation
struct FailingSink {
    fail_on: TransportOp,
    written: Vec<u8>,
    writes: usize,
    flushes: usize,
}

impl FailingSink {
    fn new(fail_on: TransportOp) -> Self {
        Self {
            fail_on,
            written: Vec::new(),
            writes: 0,
            flushes: 0,
        }
    }
}

impl Sink for FailingSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writes += 1;
        if self.fail_on == TransportOp::Write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable unplugged"));
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        if self.fail_on == TransportOp::Flush {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "flush timed out"));
        }
        Ok(())
    }

    fn target(&self) -> &str {
        "/dev/ttyTEST"
    }
}

fn sent(command: &Command) -> Vec<u8> {
    let mut sink = MemorySink::new();
    send(command, &mut sink).unwrap();
    assert_eq!(sink.flushes(), 1);
    sink.into_bytes()
}

#[test]
fn ascii_load_header_is_all_decimal() {
    let cmd = Command::load_bitmap_ascii(12, 320, 240, Base::Hex, false, vec![]).unwrap();
    assert_eq!(sent(&cmd), b"\x1b[12;320;240;16a");
}

#[test]
fn ascii_load_payload_is_separator_terminated() {
    let cmd = Command::load_bitmap_ascii(0, 3, 1, Base::Hex, false, vec![10, 255, 0]).unwrap();
    assert_eq!(sent(&cmd), b"\x1b[0;3;1;16a0A;FF;00;");
}

#[test]
fn hex_values_are_two_upper_case_digits() {
    assert_eq!(format_value(10, 16).unwrap(), "0A");
    assert_eq!(format_value(255, 16).unwrap(), "FF");
    for value in 0..=255 {
        let text = format_value(value, 16).unwrap();
        assert_eq!(text.len(), 2);
        assert_eq!(text, text.to_uppercase());
    }
}

#[test]
fn odd_rle_samples_rejected_before_any_byte() {
    let cmd = Command::LoadBitmapAscii {
        index: 0,
        width: 3,
        height: 1,
        base: Base::Decimal,
        rle: true,
        samples: vec![1, 2, 3],
    };
    let mut sink = MemorySink::new();
    let err = send(&cmd, &mut sink).unwrap_err();
    assert!(matches!(err, Error::Malformed(Malformed::OddRleSamples(3))));
    assert!(err.is_construction());
    assert!(sink.bytes().is_empty());
    assert_eq!(sink.writes(), 0);
}

#[test]
fn binary_load_is_header_then_raw_bytes() {
    let payload: Vec<u8> = (0..64).collect();
    let cmd = Command::load_bitmap_binary(0, 8, 8, false, payload.clone());
    let bytes = sent(&cmd);

    let header = b"\x1b[0;8;8b";
    assert_eq!(&bytes[..header.len()], header);
    assert_eq!(&bytes[header.len()..], payload.as_slice());
    assert_eq!(bytes.len(), header.len() + 64);
}

#[test]
fn blit_with_negative_coordinate() {
    assert_eq!(sent(&Command::blit(2, -5, 100)), b"\x1b[2;-5;100d");
}

#[test]
fn palette_select() {
    assert_eq!(sent(&Command::palette_select(3).unwrap()), b"\x1b[=3p");
}

#[test]
fn palette_upload_decimal() {
    let cmd = Command::palette_upload(Base::Decimal, vec![255, 0, 128]).unwrap();
    assert_eq!(sent(&cmd), b"\x1b[=10;3p255;0;128;");
}

#[test]
fn encoding_twice_is_identical() {
    let commands = [
        Command::load_bitmap_ascii(1, 2, 2, Base::Decimal, true, vec![7, 4]).unwrap(),
        Command::load_bitmap_binary(3, 1, 2, false, vec![0xFF, 0x1B]),
        Command::blit(0, 0, 0),
        Command::palette_upload(Base::Hex, vec![0x12, 0x34]).unwrap(),
    ];
    for cmd in &commands {
        assert_eq!(sent(cmd), sent(cmd));
    }
}

#[test]
fn flush_failure_is_surfaced_without_retry() {
    let cmd = Command::palette_upload(Base::Decimal, vec![1, 2]).unwrap();
    let before = cmd.clone();
    let mut sink = FailingSink::new(TransportOp::Flush);

    let err = send(&cmd, &mut sink).unwrap_err();
    match &err {
        Error::Transport { target, op, source } => {
            assert_eq!(target, "/dev/ttyTEST");
            assert_eq!(*op, TransportOp::Flush);
            assert_eq!(source.kind(), io::ErrorKind::TimedOut);
        },
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(sink.writes, 1);
    assert_eq!(sink.flushes, 1);
    assert_eq!(sink.written, b"\x1b[=10;2p1;2;");
    assert_eq!(cmd, before);
}

#[test]
fn write_failure_skips_flush() {
    let mut sink = FailingSink::new(TransportOp::Write);
    let err = send(&Command::blit(1, 2, 3), &mut sink).unwrap_err();
    assert!(matches!(err, Error::Transport { op: TransportOp::Write, .. }));
    assert_eq!(sink.writes, 1);
    assert_eq!(sink.flushes, 0);
}

#[test]
fn commands_on_one_link_decode_in_order() {
    let commands = vec![
        Command::palette_select(1).unwrap(),
        Command::load_bitmap_ascii(0, 2, 2, Base::Hex, true, vec![0xAA, 4]).unwrap(),
        Command::load_bitmap_binary(1, 2, 1, false, vec![b';', 0x1B]),
        Command::blit(1, -3, 7),
        Command::palette_upload(Base::Decimal, vec![255, 0, 128]).unwrap(),
    ];

    let mut sink = MemorySink::new();
    for cmd in &commands {
        send(cmd, &mut sink).unwrap();
    }
    assert_eq!(sink.flushes(), commands.len());

    let mut decoder = Decoder::new();
    let frames = decoder.feed(sink.bytes());
    let expected: Vec<Frame> = commands.into_iter().map(Frame::Command).collect();
    assert_eq!(frames, expected);
    assert!(decoder.is_idle());
}

#[test]
fn rle_loads_covering_their_pixels_decode_back_to_back() {
    let commands = vec![
        Command::load_bitmap_ascii(0, 2, 2, Base::Decimal, true, vec![1, 3, 2, 1]).unwrap(),
        Command::load_bitmap_ascii(1, 3, 1, Base::Hex, true, vec![0x7F, 3]).unwrap(),
        Command::blit(0, 10, 10),
    ];
    for cmd in &commands {
        assert_eq!(cmd.payload_pixels(), cmd.pixel_count());
    }

    let mut sink = MemorySink::new();
    for cmd in &commands {
        send(cmd, &mut sink).unwrap();
    }

    let mut decoder = Decoder::new();
    let frames = decoder.feed(sink.bytes());
    let expected: Vec<Frame> = commands.into_iter().map(Frame::Command).collect();
    assert_eq!(frames, expected);
    assert!(decoder.is_idle());
}

#[test]
fn hex_values_wider_than_a_byte_are_not_decoded() {
    let mut decoder = Decoder::new();
    let frames = decoder.feed(b"\x1b[=16;1p1FF;");
    assert_eq!(frames, vec![Frame::Invalid(DecodeError::HexWidth), Frame::Text(b';')]);
    assert!(decoder.is_idle());

    // Anything the decoder accepts must encode again
    let frames = decoder.feed(b"\x1b[=16;2pff;0A;");
    let [Frame::Command(cmd)] = frames.as_slice() else {
        panic!("expected one command, got {frames:?}");
    };
    assert_eq!(cmd.encode().unwrap(), b"\x1b[=16;2pFF;0A;");
}
