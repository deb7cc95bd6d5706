use std::io::{self, Write};

use log::{debug, info};
use serialport::{SerialPort, SerialPortInfo};

use crate::config::SerialConfig;
use crate::error::{ForwardError, Result};

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let mut port = Self {
            port_name: info.port_name,
            port_type: String::new(),
            vid: None,
            pid: None,
            serial_number: None,
            manufacturer: None,
            product: None,
        };
        let port_type = match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
                port.serial_number = usb.serial_number;
                port.manufacturer = usb.manufacturer;
                port.product = usb.product;
                "USB"
            }
            serialport::SerialPortType::PciPort => "PCI",
            serialport::SerialPortType::BluetoothPort => "Bluetooth",
            serialport::SerialPortType::Unknown => "Unknown",
        };
        port.port_type = port_type.to_string();
        port
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.port_name, self.port_type)?;
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, " {vid:04X}:{pid:04X}")?;
        }
        if let Some(product) = &self.product {
            write!(f, " {product}")?;
        }
        Ok(())
    }
}

/// Serial ports the OS currently knows about. Enumeration failures yield an empty list.
pub fn list_ports() -> Vec<PortInfo> {
    serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect()
}

/// Exclusive handle on an open link.
///
/// The underlying port is released when the connection is dropped, whichever
/// way the owning scope is left.
pub struct Connection<P: Write> {
    name: String,
    port: P,
}

impl Connection<Box<dyn SerialPort>> {
    pub fn open(cfg: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.timeout)
            .open()
            .map_err(|source| ForwardError::Open {
                port: cfg.port_name.clone(),
                source,
            })?;

        info!("opened {} at {} baud", cfg.port_name, cfg.baud_rate);
        Ok(Self::new(cfg.port_name.clone(), port))
    }
}

impl<P: Write> Connection<P> {
    pub fn new(name: impl Into<String>, port: P) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<P: Write> Write for Connection<P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl<P: Write> Drop for Connection<P> {
    fn drop(&mut self) {
        debug!("closed {}", self.name);
    }
}
