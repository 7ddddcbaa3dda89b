//! PiGFX graphics command protocol
//!
//! Commands are ANSI-style escape sequences (`ESC [ params final`) followed
//! by an optional payload. The final character acts as a one-byte opcode.
//!
//! | Final | Command | Header params | Payload |
//! |---|---|---|---|
//! | `a` | load bitmap, ASCII | index;width;height;base | `value;` per sample |
//! | `A` | load bitmap, ASCII RLE | index;width;height;base | `value;count;` pairs |
//! | `b` | load bitmap, binary | index;width;height | width×height raw bytes |
//! | `B` | load bitmap, binary RLE | index;width;height | raw bytes, device RLE format |
//! | `d` | blit | index;x;y | none |
//! | `p` | palette select | `=`index | none |
//! | `p` | palette upload | `=`base;count | `value;` per entry |

mod codec;
mod command;
mod decoder;
mod escape;
mod value;

pub use codec::send;
pub use command::{Command, BUILTIN_PALETTES};
pub use decoder::{DecodeError, Decoder, Frame, MAX_PARAMS};
pub use escape::{EscapeSequence, Opcode, CSI, ESC, PALETTE_MARKER, SEPARATOR};
pub use value::{format_value, write_decimal, write_value, Base};
