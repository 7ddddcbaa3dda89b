//! Command line interface
//!
//! Maps each subcommand to exactly one protocol command, or to one of the
//! local helper actions (listing ports, decoding a capture).

mod input;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

pub use input::{parse_base, parse_values, read_payload, InputError};

use crate::app::{default_config_path, Config};
use crate::error::{Error, Result, TransportOp};
use crate::protocol::{send, Base, Command, Decoder, Frame};
use crate::sink::{escape_bytes, list_ports, DryRunFormat, DryRunSink, SerialSink};

/// CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "pigfx-send")]
#[command(version)]
#[command(
    about = "Send graphics commands to a PiGFX terminal over a serial port",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a JSON config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial port (e.g. /dev/ttyUSB0)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<String>,

    /// Baud rate (default: 115200)
    #[arg(short, long, value_name = "BAUD")]
    pub baud: Option<u32>,

    /// Read timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Print commands to stdout instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// With --dry-run, print exact bytes instead of escaped text
    #[arg(long, requires = "dry_run")]
    pub raw: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Load a bitmap via an ASCII value stream
    LoadAscii {
        index: u16,
        width: u16,
        height: u16,
        /// Payload base, 10 or 16
        #[arg(value_parser = parse_base)]
        base: Base,
        /// Comma-separated values; with --rle use value,count pairs
        pixels: String,
        #[arg(long)]
        rle: bool,
    },

    /// Load a bitmap via raw bytes
    LoadBin {
        index: u16,
        width: u16,
        height: u16,
        /// Raw bytes file (width*height bytes)
        file: PathBuf,
        /// File is already in the device's RLE format
        #[arg(long)]
        rle: bool,
    },

    /// Blit a loaded bitmap
    #[command(allow_negative_numbers = true)]
    Blit { index: u16, x: i32, y: i32 },

    /// Select a built-in palette (0..3)
    PaletteSelect { index: u8 },

    /// Upload custom palette entries as ASCII values
    PaletteUpload {
        /// Payload base, 10 or 16
        #[arg(value_parser = parse_base)]
        base: Base,
        /// Comma-separated values in the given base
        values: String,
    },

    /// List available serial ports
    ListPorts,

    /// Decode a captured byte stream and print its frames
    Decode { file: PathBuf },
}

/// What a parsed command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Send(Command),
    ListPorts,
    Decode(PathBuf),
}

impl CliCommand {
    /// Validate user input and build the request
    pub fn into_request(self) -> Result<Request> {
        let command = match self {
            CliCommand::LoadAscii {
                index,
                width,
                height,
                base,
                pixels,
                rle,
            } => {
                let samples = parse_values(&pixels, base)?;
                Command::load_bitmap_ascii(index, width, height, base, rle, samples)?
            },
            CliCommand::LoadBin {
                index,
                width,
                height,
                file,
                rle,
            } => {
                let payload = read_payload(&file)?;
                Command::load_bitmap_binary(index, width, height, rle, payload)
            },
            CliCommand::Blit { index, x, y } => Command::blit(index, x, y),
            CliCommand::PaletteSelect { index } => Command::palette_select(index)?,
            CliCommand::PaletteUpload { base, values } => {
                let entries = parse_values(&values, base)?;
                Command::palette_upload(base, entries)?
            },
            CliCommand::ListPorts => return Ok(Request::ListPorts),
            CliCommand::Decode { file } => return Ok(Request::Decode(file)),
        };
        Ok(Request::Send(command))
    }
}

impl CliArgs {
    /// Build the effective config: CLI > env > file > defaults
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default()?,
        };
        if self.config.is_none() {
            debug!(path = ?default_config_path(), "using default config location");
        }
        config.apply_env()?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply command line flags on top of `config`
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.serial.timeout_ms = timeout_ms;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.raw {
            config.dry_run_format = DryRunFormat::Raw;
        }
    }
}

/// Run a parsed command line, printing to stdout
pub fn run(args: CliArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with(args, &mut out)
}

/// Run a parsed command line, printing to `out`
///
/// Only sending reads the config; listing ports and decoding work even
/// when the config file is broken.
pub fn run_with<W: Write>(args: CliArgs, out: &mut W) -> Result<()> {
    let request = args.command.clone().into_request()?;
    let config = match &request {
        Request::Send(_) => args.resolve_config()?,
        Request::ListPorts | Request::Decode(_) => Config::default(),
    };
    execute(request, &config, out)
}

/// Carry out a request; dry runs, port lists and decodes go to `out`
pub fn execute<W: Write>(request: Request, config: &Config, out: &mut W) -> Result<()> {
    match request {
        Request::Send(command) if config.dry_run => {
            let mut sink = DryRunSink::new(out, config.dry_run_format).with_name("stdout");
            send(&command, &mut sink)
        },
        Request::Send(command) => {
            let mut sink = SerialSink::open(&config.serial)?;
            send(&command, &mut sink)
        },
        Request::ListPorts => {
            let ports = list_ports()?;
            if ports.is_empty() {
                return print(out, "No serial ports found.\n");
            }
            let mut text = String::new();
            for port in ports {
                text.push_str(&format!("{}\t{}\n", port.name, port.description));
            }
            print(out, &text)
        },
        Request::Decode(path) => {
            let data = read_payload(&path)?;
            let mut decoder = Decoder::new();
            let frames = decoder.feed(&data);
            let mut text = render_frames(&frames);
            if !decoder.is_idle() {
                text.push_str("incomplete: stream ended inside a command\n");
            }
            print(out, &text)
        },
    }
}

/// One line per frame, with consecutive text bytes merged
pub fn render_frames(frames: &[Frame]) -> String {
    let mut text = String::new();
    let mut run = Vec::new();

    for frame in frames {
        if let Frame::Text(byte) = frame {
            run.push(*byte);
            continue;
        }
        if !run.is_empty() {
            text.push_str(&format!("text: {}\n", escape_bytes(&run)));
            run.clear();
        }
        match frame {
            Frame::Command(command) => text.push_str(&format!("command: {}\n", command)),
            Frame::Sequence {
                marker,
                params,
                final_byte,
            } => {
                let marker = marker.map(|m| (m as char).to_string()).unwrap_or_default();
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                text.push_str(&format!(
                    "sequence: \\e[{}{}{}\n",
                    marker,
                    params.join(";"),
                    *final_byte as char
                ));
            },
            Frame::Invalid(err) => text.push_str(&format!("invalid: {}\n", err)),
            Frame::Text(_) => {}
        }
    }
    if !run.is_empty() {
        text.push_str(&format!("text: {}\n", escape_bytes(&run)));
    }
    text
}

fn print<W: Write>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|source| Error::Transport {
            target: "stdout".to_string(),
            op: TransportOp::Write,
            source,
        })
}
