//! Device-side decoder
//!
//! A streaming decoder for the command stream, following the state machine
//! the receiving device runs:
//!
//! - Ground: plain bytes, passed through as text
//! - Escape: after ESC, waiting for `[`
//! - Params: collecting an optional private marker and `;`-separated
//!   decimal parameters until a final character
//! - AsciiPayload: collecting `;`-terminated values in the declared base
//! - BinaryPayload: collecting a declared number of raw bytes
//!
//! A header is only treated as a device command when its final character,
//! private marker and parameter count all match the catalogue. Anything
//! else is reported as a plain [`Frame::Sequence`], so ordinary terminal
//! sequences such as `ESC[5A` (cursor up) pass through untouched.
//!
//! Input may be split at arbitrary chunk boundaries.

use thiserror::Error;
use tracing::trace;

use super::command::{Command, BUILTIN_PALETTES};
use super::escape::{Opcode, CSI, ESC, PALETTE_MARKER, SEPARATOR};
use super::value::Base;

/// Upper bound on header parameters kept per sequence
pub const MAX_PARAMS: usize = 16;

/// Errors found while decoding a stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Header parameter does not fit its field
    #[error("parameter {field} = {value} out of range")]
    ParamRange { field: &'static str, value: i64 },

    /// Header parameter too large to represent
    #[error("parameter overflow")]
    ParamOverflow,

    /// Byte that cannot appear inside a header
    #[error("unexpected byte 0x{0:02X} in escape sequence")]
    HeaderByte(u8),

    /// Declared payload base is neither 10 nor 16
    #[error("invalid payload base {0}")]
    Base(i64),

    /// Byte that is not a digit of the declared base nor a separator
    #[error("unexpected byte 0x{0:02X} in ASCII payload")]
    PayloadByte(u8),

    /// ASCII payload value too large to represent
    #[error("payload value overflow")]
    ValueOverflow,

    /// Base 16 value with more than two digits
    #[error("hex payload value wider than two digits")]
    HexWidth,

    /// ESC arrived before the payload was complete
    #[error("payload interrupted after {received} values")]
    Interrupted { received: usize },

    /// Binary RLE loads do not declare their payload length
    #[error("binary RLE payload length cannot be derived from header")]
    UnframedPayload,
}

/// One decoded unit of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete device command
    Command(Command),

    /// A byte outside any escape sequence
    Text(u8),

    /// A well-formed escape sequence that is not a device command
    Sequence {
        marker: Option<u8>,
        params: Vec<i64>,
        final_byte: u8,
    },

    /// A malformed header or payload; the decoder is back in ground state
    Invalid(DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Params,
    AsciiPayload,
    BinaryPayload,
}

/// When an ASCII payload is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// A fixed number of values
    Values(usize),
    /// (value, count) pairs whose counts cover this many pixels
    Pixels(usize),
}

/// The decoder
#[derive(Debug)]
pub struct Decoder {
    state: State,
    /// Private marker seen right after `ESC[`
    marker: Option<u8>,
    params: Vec<i64>,
    current_param: i64,
    negative: bool,
    has_digit: bool,
    /// A parameter slot is open (digit, sign or separator seen)
    param_started: bool,
    overflowed: bool,
    /// Command whose payload is being collected
    pending: Option<Command>,
    base: Base,
    expect: Expect,
    covered: usize,
    current_value: u32,
    /// Digits seen in the current payload value
    value_digits: u8,
    remaining: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder in the ground state
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            marker: None,
            params: Vec::with_capacity(MAX_PARAMS),
            current_param: 0,
            negative: false,
            has_digit: false,
            param_started: false,
            overflowed: false,
            pending: None,
            base: Base::Decimal,
            expect: Expect::Values(0),
            covered: 0,
            current_value: 0,
            value_digits: 0,
            remaining: 0,
        }
    }

    /// Return to the ground state, discarding any partial command
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_params();
        self.pending = None;
        self.current_value = 0;
        self.value_digits = 0;
        self.remaining = 0;
        self.covered = 0;
    }

    /// True when no sequence or payload is in progress
    pub fn is_idle(&self) -> bool {
        self.state == State::Ground
    }

    /// Forget the header collected so far
    fn clear_params(&mut self) {
        self.marker = None;
        self.params.clear();
        self.current_param = 0;
        self.negative = false;
        self.has_digit = false;
        self.param_started = false;
        self.overflowed = false;
    }

    /// Decode a chunk of bytes
    pub fn feed(&mut self, data: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        for &byte in data {
            self.process_byte(byte, &mut frames);
        }
        frames
    }

    /// Process a single byte
    fn process_byte(&mut self, byte: u8, frames: &mut Vec<Frame>) {
        match self.state {
            State::Ground => self.process_ground(byte, frames),
            State::Escape => self.process_escape(byte, frames),
            State::Params => self.process_param(byte, frames),
            State::AsciiPayload => self.process_ascii(byte, frames),
            State::BinaryPayload => self.process_binary(byte, frames),
        }
    }

    /// Process byte in ground state
    fn process_ground(&mut self, byte: u8, frames: &mut Vec<Frame>) {
        if byte == ESC {
            self.state = State::Escape;
        } else {
            frames.push(Frame::Text(byte));
        }
    }

    /// Process byte after ESC
    fn process_escape(&mut self, byte: u8, frames: &mut Vec<Frame>) {
        match byte {
            CSI => {
                self.clear_params();
                self.state = State::Params;
            },
            // ESC ESC stands for a literal ESC
            ESC => {
                frames.push(Frame::Text(ESC));
                self.state = State::Ground;
            },
            _ => {
                trace!(byte, "dropping byte after ESC");
                self.state = State::Ground;
            },
        }
    }

    /// Process byte inside a header: marker, digits, separators, final byte
    fn process_param(&mut self, byte: u8, frames: &mut Vec<Frame>) {
        match byte {
            b'0'..=b'9' => {
                self.param_started = true;
                self.has_digit = true;
                let digit = i64::from(byte - b'0');
                match self.current_param.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                    Some(v) => self.current_param = v,
                    None => self.overflowed = true,
                }
            },
            b'-' if !self.negative && !self.has_digit => {
                self.param_started = true;
                self.negative = true;
            },
            SEPARATOR => {
                self.push_param();
                // `1;d` carries two parameters, the second one empty
                self.param_started = true;
            },
            PALETTE_MARKER | b'?' | b'#'
                if self.marker.is_none() && self.params.is_empty() && !self.param_started =>
            {
                self.marker = Some(byte);
            },
            ESC => {
                frames.push(Frame::Invalid(DecodeError::HeaderByte(byte)));
                self.clear_params();
                self.state = State::Escape;
            },
            0x40..=0x7E => {
                if self.param_started {
                    self.push_param();
                }
                self.state = State::Ground;
                if self.overflowed {
                    frames.push(Frame::Invalid(DecodeError::ParamOverflow));
                    self.clear_params();
                    return;
                }
                self.dispatch(byte, frames);
                self.clear_params();
            },
            _ => {
                frames.push(Frame::Invalid(DecodeError::HeaderByte(byte)));
                self.clear_params();
                self.state = State::Ground;
            },
        }
    }

    /// Close the current parameter, keeping at most `MAX_PARAMS`
    fn push_param(&mut self) {
        let value = if self.negative {
            -self.current_param
        } else {
            self.current_param
        };
        if self.params.len() < MAX_PARAMS {
            self.params.push(value);
        }
        self.current_param = 0;
        self.negative = false;
        self.has_digit = false;
        self.param_started = false;
    }

    /// Interpret a complete header
    fn dispatch(&mut self, final_byte: u8, frames: &mut Vec<Frame>) {
        let opcode = Opcode::from_byte(final_byte).filter(|op| op.marker() == self.marker);
        let params = std::mem::take(&mut self.params);

        let result = match (opcode, params.as_slice()) {
            (
                Some(op @ (Opcode::LoadAscii | Opcode::LoadAsciiRle)),
                &[index, width, height, base],
            ) => {
                let rle = op == Opcode::LoadAsciiRle;
                Some(self.begin_ascii_load(rle, index, width, height, base))
            },
            (Some(Opcode::LoadBinary), &[index, width, height]) => {
                Some(self.begin_binary_load(index, width, height))
            },
            (Some(Opcode::LoadBinaryRle), &[_, _, _]) => Some(Err(DecodeError::UnframedPayload)),
            (Some(Opcode::Blit), &[index, x, y]) => Some(blit(index, x, y)),
            (Some(Opcode::Palette), &[index]) => Some(self.palette_select(index)),
            (Some(Opcode::Palette), &[base, count]) => Some(self.begin_palette_upload(base, count)),
            _ => None,
        };

        let Some(result) = result else {
            frames.push(Frame::Sequence {
                marker: self.marker,
                params,
                final_byte,
            });
            return;
        };

        match result {
            Ok(Some(command)) => frames.push(Frame::Command(command)),
            Ok(None) => {}
            Err(err) => {
                self.state = State::Ground;
                frames.push(Frame::Invalid(err));
            },
        }
    }

    /// Header of an `a` or `A` load
    fn begin_ascii_load(
        &mut self,
        rle: bool,
        index: i64,
        width: i64,
        height: i64,
        base: i64,
    ) -> Result<Option<Command>, DecodeError> {
        let index = field(index, "index")?;
        let width: u16 = field(width, "width")?;
        let height: u16 = field(height, "height")?;
        let base = payload_base(base)?;
        let pixels = usize::from(width) * usize::from(height);

        let command = Command::LoadBitmapAscii {
            index,
            width,
            height,
            base,
            rle,
            samples: Vec::new(),
        };
        let expect = if rle {
            Expect::Pixels(pixels)
        } else {
            Expect::Values(pixels)
        };
        Ok(self.begin_ascii(command, base, expect))
    }

    /// Header of a palette upload
    fn begin_palette_upload(
        &mut self,
        base: i64,
        count: i64,
    ) -> Result<Option<Command>, DecodeError> {
        let base = payload_base(base)?;
        let count: u32 = field(count, "count")?;
        let command = Command::PaletteUpload {
            base,
            entries: Vec::new(),
        };
        Ok(self.begin_ascii(command, base, Expect::Values(count as usize)))
    }

    fn palette_select(&mut self, index: i64) -> Result<Option<Command>, DecodeError> {
        let index: u8 = field(index, "palette")?;
        if index >= BUILTIN_PALETTES {
            return Err(DecodeError::ParamRange {
                field: "palette",
                value: i64::from(index),
            });
        }
        Ok(Some(Command::PaletteSelect { index }))
    }

    /// Start collecting an ASCII payload, or finish at once if none is due
    fn begin_ascii(&mut self, command: Command, base: Base, expect: Expect) -> Option<Command> {
        self.base = base;
        self.expect = expect;
        self.covered = 0;
        self.current_value = 0;
        self.value_digits = 0;
        self.pending = Some(command);
        if self.ascii_complete() {
            return self.pending.take();
        }
        self.state = State::AsciiPayload;
        None
    }

    /// Header of a `b` load
    fn begin_binary_load(
        &mut self,
        index: i64,
        width: i64,
        height: i64,
    ) -> Result<Option<Command>, DecodeError> {
        let index = field(index, "index")?;
        let width: u16 = field(width, "width")?;
        let height: u16 = field(height, "height")?;
        self.remaining = usize::from(width) * usize::from(height);

        let command = Command::LoadBitmapBinary {
            index,
            width,
            height,
            rle: false,
            payload: Vec::with_capacity(self.remaining),
        };
        if self.remaining == 0 {
            return Ok(Some(command));
        }
        self.pending = Some(command);
        self.state = State::BinaryPayload;
        Ok(None)
    }

    /// Process byte of an ASCII payload
    fn process_ascii(&mut self, byte: u8, frames: &mut Vec<Frame>) {
        if byte == SEPARATOR {
            let value = self.current_value;
            self.current_value = 0;
            self.value_digits = 0;
            self.push_value(value);
            if self.ascii_complete() {
                self.state = State::Ground;
                if let Some(command) = self.pending.take() {
                    frames.push(Frame::Command(command));
                }
            }
            return;
        }

        if byte == ESC {
            let received = self.values().map_or(0, <[u32]>::len);
            frames.push(Frame::Invalid(DecodeError::Interrupted { received }));
            self.pending = None;
            self.state = State::Escape;
            return;
        }

        let Some(digit) = self.base.digit(byte) else {
            frames.push(Frame::Invalid(DecodeError::PayloadByte(byte)));
            self.pending = None;
            self.state = State::Ground;
            return;
        };

        self.value_digits = self.value_digits.saturating_add(1);
        if self.base == Base::Hex && self.value_digits > 2 {
            frames.push(Frame::Invalid(DecodeError::HexWidth));
            self.pending = None;
            self.state = State::Ground;
            return;
        }

        match self
            .current_value
            .checked_mul(self.base.radix())
            .and_then(|v| v.checked_add(digit))
        {
            Some(v) => self.current_value = v,
            None => {
                frames.push(Frame::Invalid(DecodeError::ValueOverflow));
                self.pending = None;
                self.state = State::Ground;
            },
        }
    }

    /// Process byte of a binary payload; every byte value is data
    fn process_binary(&mut self, byte: u8, frames: &mut Vec<Frame>) {
        if let Some(Command::LoadBitmapBinary { payload, .. }) = self.pending.as_mut() {
            payload.push(byte);
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.state = State::Ground;
            if let Some(command) = self.pending.take() {
                frames.push(Frame::Command(command));
            }
        }
    }

    /// Values collected so far for the pending ASCII command
    fn values(&self) -> Option<&[u32]> {
        match self.pending.as_ref()? {
            Command::LoadBitmapAscii { samples, .. } => Some(samples),
            Command::PaletteUpload { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Append a payload value, adding run counts to the covered pixels
    fn push_value(&mut self, value: u32) {
        let values = match self.pending.as_mut() {
            Some(Command::LoadBitmapAscii { samples, .. }) => samples,
            Some(Command::PaletteUpload { entries, .. }) => entries,
            _ => return,
        };
        values.push(value);
        // Odd positions of an RLE stream are run counts
        if matches!(self.expect, Expect::Pixels(_)) && values.len() % 2 == 0 {
            self.covered = self.covered.saturating_add(value as usize);
        }
    }

    /// True once the declared values or pixels are all in
    fn ascii_complete(&self) -> bool {
        let received = self.values().map_or(0, <[u32]>::len);
        match self.expect {
            Expect::Values(n) => received >= n,
            Expect::Pixels(n) => received % 2 == 0 && self.covered >= n,
        }
    }
}

/// Header of a blit; all fields are checked against their types
fn blit(index: i64, x: i64, y: i64) -> Result<Option<Command>, DecodeError> {
    Ok(Some(Command::BlitBitmap {
        index: field(index, "index")?,
        x: field(x, "x")?,
        y: field(y, "y")?,
    }))
}

/// Narrow a header parameter to its field type
fn field<T: TryFrom<i64>>(value: i64, field: &'static str) -> Result<T, DecodeError> {
    T::try_from(value).map_err(|_| DecodeError::ParamRange { field, value })
}

/// Declared payload radix
fn payload_base(value: i64) -> Result<Base, DecodeError> {
    match value {
        10 => Ok(Base::Decimal),
        16 => Ok(Base::Hex),
        other => Err(DecodeError::Base(other)),
    }
}
