//! Commands understood by the device
//!
//! A `Command` is built from validated user input, encoded once and then
//! dropped. All checks that must happen before transmission live in
//! [`Command::validate`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::escape::Opcode;
use super::value::Base;
use crate::error::{Malformed, Result};

/// Number of built-in palettes on the device
pub const BUILTIN_PALETTES: u8 = 4;

/// A single device command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Load a bitmap from ASCII samples, or (value, count) pairs when `rle`
    LoadBitmapAscii {
        index: u16,
        width: u16,
        height: u16,
        base: Base,
        rle: bool,
        samples: Vec<u32>,
    },

    /// Load a bitmap from raw bytes
    ///
    /// With `rle` set the payload must already be in the device's
    /// run-length format; it is forwarded verbatim.
    LoadBitmapBinary {
        index: u16,
        width: u16,
        height: u16,
        rle: bool,
        payload: Vec<u8>,
    },

    /// Draw a loaded bitmap at screen coordinates
    BlitBitmap { index: u16, x: i32, y: i32 },

    /// Switch to one of the built-in palettes
    PaletteSelect { index: u8 },

    /// Replace the active palette
    PaletteUpload { base: Base, entries: Vec<u32> },
}

impl Command {
    /// Checked constructor for ASCII bitmap loads
    pub fn load_bitmap_ascii(
        index: u16,
        width: u16,
        height: u16,
        base: Base,
        rle: bool,
        samples: Vec<u32>,
    ) -> Result<Self> {
        let cmd = Command::LoadBitmapAscii {
            index,
            width,
            height,
            base,
            rle,
            samples,
        };
        cmd.validate()?;
        Ok(cmd)
    }

    /// Binary loads carry no construction-time invariants
    pub fn load_bitmap_binary(
        index: u16,
        width: u16,
        height: u16,
        rle: bool,
        payload: Vec<u8>,
    ) -> Self {
        Command::LoadBitmapBinary {
            index,
            width,
            height,
            rle,
            payload,
        }
    }

    pub fn blit(index: u16, x: i32, y: i32) -> Self {
        Command::BlitBitmap { index, x, y }
    }

    pub fn palette_select(index: u8) -> Result<Self> {
        let cmd = Command::PaletteSelect { index };
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn palette_upload(base: Base, entries: Vec<u32>) -> Result<Self> {
        let cmd = Command::PaletteUpload { base, entries };
        cmd.validate()?;
        Ok(cmd)
    }

    /// Final character this command is sent with
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::LoadBitmapAscii { rle: false, .. } => Opcode::LoadAscii,
            Command::LoadBitmapAscii { rle: true, .. } => Opcode::LoadAsciiRle,
            Command::LoadBitmapBinary { rle: false, .. } => Opcode::LoadBinary,
            Command::LoadBitmapBinary { rle: true, .. } => Opcode::LoadBinaryRle,
            Command::BlitBitmap { .. } => Opcode::Blit,
            Command::PaletteSelect { .. } | Command::PaletteUpload { .. } => Opcode::Palette,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::LoadBitmapAscii { .. } => "load-ascii",
            Command::LoadBitmapBinary { .. } => "load-bin",
            Command::BlitBitmap { .. } => "blit",
            Command::PaletteSelect { .. } => "palette-select",
            Command::PaletteUpload { .. } => "palette-upload",
        }
    }

    /// Check every invariant that must hold before a byte is sent
    pub fn validate(&self) -> std::result::Result<(), Malformed> {
        match self {
            Command::LoadBitmapAscii {
                base, rle, samples, ..
            } => {
                if *rle && samples.len() % 2 != 0 {
                    return Err(Malformed::OddRleSamples(samples.len()));
                }
                samples.iter().try_for_each(|&v| base.check(v))
            },
            Command::PaletteSelect { index } if *index >= BUILTIN_PALETTES => {
                Err(Malformed::PaletteIndex(*index))
            },
            Command::PaletteUpload { base, entries } => {
                entries.iter().try_for_each(|&v| base.check(v))
            },
            Command::LoadBitmapBinary { .. }
            | Command::BlitBitmap { .. }
            | Command::PaletteSelect { .. } => Ok(()),
        }
    }

    /// Pixel count implied by the header, for bitmap loads
    pub fn pixel_count(&self) -> Option<usize> {
        match self {
            Command::LoadBitmapAscii { width, height, .. }
            | Command::LoadBitmapBinary { width, height, .. } => {
                Some(usize::from(*width) * usize::from(*height))
            },
            _ => None,
        }
    }

    /// Pixels the payload itself covers, for bitmap loads
    ///
    /// RLE ASCII loads cover the sum of their run counts. Binary RLE
    /// payloads are opaque, so they report `None`.
    pub fn payload_pixels(&self) -> Option<usize> {
        match self {
            Command::LoadBitmapAscii {
                rle: false, samples, ..
            } => Some(samples.len()),
            Command::LoadBitmapAscii {
                rle: true, samples, ..
            } => Some(
                samples
                    .iter()
                    .skip(1)
                    .step_by(2)
                    .fold(0usize, |total, &count| total.saturating_add(count as usize)),
            ),
            Command::LoadBitmapBinary {
                rle: false, payload, ..
            } => Some(payload.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::LoadBitmapAscii {
                index,
                width,
                height,
                base,
                rle,
                samples,
            } => write!(
                f,
                "{} index={} size={}x{} base={} rle={} values={}",
                self.kind(),
                index,
                width,
                height,
                base,
                rle,
                samples.len()
            ),
            Command::LoadBitmapBinary {
                index,
                width,
                height,
                rle,
                payload,
            } => write!(
                f,
                "{} index={} size={}x{} rle={} bytes={}",
                self.kind(),
                index,
                width,
                height,
                rle,
                payload.len()
            ),
            Command::BlitBitmap { index, x, y } => {
                write!(f, "{} index={} x={} y={}", self.kind(), index, x, y)
            },
            Command::PaletteSelect { index } => write!(f, "{} index={}", self.kind(), index),
            Command::PaletteUpload { base, entries } => {
                write!(f, "{} base={} entries={}", self.kind(), base, entries.len())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_rle_rejected() {
        let err = Command::load_bitmap_ascii(0, 2, 2, Base::Decimal, true, vec![1, 2, 3])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Malformed(Malformed::OddRleSamples(3))
        ));
    }

    #[test]
    fn test_odd_samples_fine_without_rle() {
        assert!(Command::load_bitmap_ascii(0, 3, 1, Base::Decimal, false, vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn test_hex_overflow_rejected() {
        let err = Command::palette_upload(Base::Hex, vec![0x10, 0x1FF]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Malformed(Malformed::HexOverflow(0x1FF))
        ));
        assert!(Command::palette_upload(Base::Decimal, vec![0x1FF]).is_ok());
    }

    #[test]
    fn test_palette_index_range() {
        assert!(Command::palette_select(3).is_ok());
        assert!(matches!(
            Command::palette_select(4),
            Err(crate::Error::Malformed(Malformed::PaletteIndex(4)))
        ));
    }

    #[test]
    fn test_opcodes() {
        assert_eq!(Command::blit(0, 0, 0).opcode(), Opcode::Blit);
        assert_eq!(
            Command::load_bitmap_binary(0, 1, 1, true, vec![0]).opcode(),
            Opcode::LoadBinaryRle
        );
        assert_eq!(
            Command::PaletteUpload {
                base: Base::Decimal,
                entries: vec![]
            }
            .opcode(),
            Opcode::Palette
        );
    }

    #[test]
    fn test_pixel_count() {
        let cmd = Command::load_bitmap_binary(0, 300, 300, false, Vec::new());
        assert_eq!(cmd.pixel_count(), Some(90_000));
        assert_eq!(Command::blit(0, 1, 1).pixel_count(), None);
    }

    #[test]
    fn test_payload_pixels() {
        let rle = Command::load_bitmap_ascii(0, 2, 2, Base::Decimal, true, vec![1, 3, 2, 1])
            .unwrap();
        assert_eq!(rle.payload_pixels(), Some(4));
        let plain = Command::load_bitmap_ascii(0, 2, 2, Base::Decimal, false, vec![1, 3, 2])
            .unwrap();
        assert_eq!(plain.payload_pixels(), Some(3));
        let binary = Command::load_bitmap_binary(0, 2, 2, true, vec![9, 9, 9]);
        assert_eq!(binary.payload_pixels(), None);
        assert_eq!(Command::blit(0, 0, 0).payload_pixels(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::blit(2, -5, 100).to_string(), "blit index=2 x=-5 y=100");
        let cmd = Command::palette_upload(Base::Hex, vec![1, 2]).unwrap();
        assert_eq!(cmd.to_string(), "palette-upload base=16 entries=2");
    }

    #[test]
    fn test_command_serialization() {
        let cmd = Command::load_bitmap_ascii(1, 2, 1, Base::Hex, false, vec![0xAB, 0x01]).unwrap();
        let json = serde_json::to_string(&cmd).unwrap();
        let restored: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, restored);
    }
}
