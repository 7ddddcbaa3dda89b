//! Serial port sink

use std::io::{self, Write};
use std::time::Duration;

use serialport::{available_ports, SerialPort, SerialPortType};
use tracing::{debug, info};

use super::Sink;
use crate::app::SerialConfig;
use crate::error::{Error, Result};

/// Sink backed by a serial port
pub struct SerialSink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialSink {
    /// Open the port described by `config`
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|source| Error::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(port = %config.port, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }
}

impl std::fmt::Debug for SerialSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSink").field("port", &self.name).finish()
    }
}

impl Sink for SerialSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        debug!(port = %self.name, len = bytes.len(), "serial write");
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn target(&self) -> &str {
        &self.name
    }
}

/// A serial port found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// Enumerate serial ports
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = available_ports().map_err(Error::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            description: describe(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("USB serial");
            format!("{} ({:04x}:{:04x})", product, usb.vid, usb.pid)
        },
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}
