//! Command encoding
//!
//! Each command is validated, rendered completely in memory and only then
//! handed to a [`Sink`] as one write followed by one flush. A command that
//! fails validation never produces a byte.

use tracing::{debug, warn};

use super::command::Command;
use super::escape::{EscapeSequence, Opcode, SEPARATOR};
use super::value::{write_value, Base};
use crate::error::{Error, Result, TransportOp};
use crate::sink::Sink;

impl Command {
    /// Full byte image of this command
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len_hint());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append the byte image of this command to `out`
    ///
    /// On error `out` is left unchanged.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        warn_on_pixel_mismatch(self);

        match self {
            Command::LoadBitmapAscii {
                index,
                width,
                height,
                base,
                rle,
                samples,
            } => encode_load_ascii(out, *index, *width, *height, *base, *rle, samples),
            Command::LoadBitmapBinary {
                index,
                width,
                height,
                rle,
                payload,
            } => encode_load_binary(out, *index, *width, *height, *rle, payload),
            Command::BlitBitmap { index, x, y } => encode_blit(out, *index, *x, *y),
            Command::PaletteSelect { index } => encode_palette_select(out, *index),
            Command::PaletteUpload { base, entries } => encode_palette_upload(out, *base, entries),
        }

        Ok(())
    }

    fn encoded_len_hint(&self) -> usize {
        let payload = match self {
            Command::LoadBitmapAscii { samples, .. } => samples.len() * 4,
            Command::LoadBitmapBinary { payload, .. } => payload.len(),
            Command::PaletteUpload { entries, .. } => entries.len() * 4,
            Command::BlitBitmap { .. } | Command::PaletteSelect { .. } => 0,
        };
        24 + payload
    }
}

/// Log when a bitmap payload will not cover exactly width x height
///
/// The device ends an ASCII load once the declared pixels are covered, so
/// a short or long payload leaves it out of step with the stream.
fn warn_on_pixel_mismatch(command: &Command) {
    let (Some(pixels), Some(covered)) = (command.pixel_count(), command.payload_pixels()) else {
        return;
    };
    if covered != pixels {
        warn!(
            kind = command.kind(),
            opcode = %command.opcode(),
            covered,
            pixels,
            "bitmap payload does not cover width x height"
        );
    }
}

/// `ESC[index;width;height;base` then `a` or `A`, then `value;` per sample
fn encode_load_ascii(
    out: &mut Vec<u8>,
    index: u16,
    width: u16,
    height: u16,
    base: Base,
    rle: bool,
    samples: &[u32],
) {
    let opcode = if rle { Opcode::LoadAsciiRle } else { Opcode::LoadAscii };
    EscapeSequence::new(opcode)
        .param(index)
        .param(width)
        .param(height)
        .param(base.radix())
        .write_to(out);
    write_values(out, samples, base);
}

/// `ESC[index;width;height` then `b` or `B`, then the payload verbatim
fn encode_load_binary(
    out: &mut Vec<u8>,
    index: u16,
    width: u16,
    height: u16,
    rle: bool,
    payload: &[u8],
) {
    let opcode = if rle { Opcode::LoadBinaryRle } else { Opcode::LoadBinary };
    EscapeSequence::new(opcode)
        .param(index)
        .param(width)
        .param(height)
        .write_to(out);
    out.extend_from_slice(payload);
}

fn encode_blit(out: &mut Vec<u8>, index: u16, x: i32, y: i32) {
    EscapeSequence::new(Opcode::Blit)
        .param(index)
        .param(x)
        .param(y)
        .write_to(out);
}

fn encode_palette_select(out: &mut Vec<u8>, index: u8) {
    EscapeSequence::new(Opcode::Palette).param(index).write_to(out);
}

/// `ESC[=base;count p` then `value;` per entry
fn encode_palette_upload(out: &mut Vec<u8>, base: Base, entries: &[u32]) {
    EscapeSequence::new(Opcode::Palette)
        .param(base.radix())
        .param(entries.len() as i64)
        .write_to(out);
    write_values(out, entries, base);
}

/// Every value is followed by a separator, including the last
fn write_values(out: &mut Vec<u8>, values: &[u32], base: Base) {
    for &value in values {
        write_value(out, value, base);
        out.push(SEPARATOR);
    }
}

/// Encode `command` and transmit it through `sink`
///
/// The command is fully encoded before the sink is touched, so a
/// construction error leaves the sink untouched. Transport errors are
/// returned as-is; nothing is retried.
pub fn send<S: Sink + ?Sized>(command: &Command, sink: &mut S) -> Result<()> {
    let bytes = command.encode()?;

    debug!(
        kind = command.kind(),
        opcode = %command.opcode(),
        len = bytes.len(),
        sink = sink.target(),
        "sending command"
    );

    sink.write(&bytes).map_err(|source| Error::Transport {
        target: sink.target().to_string(),
        op: TransportOp::Write,
        source,
    })?;
    sink.flush().map_err(|source| Error::Transport {
        target: sink.target().to_string(),
        op: TransportOp::Flush,
        source,
    })?;

    Ok(())
}
