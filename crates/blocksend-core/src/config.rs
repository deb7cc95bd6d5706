use std::fmt::Display;
use std::num::{NonZeroU32, NonZeroUsize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ForwardError, Result};

/// Pause between the two final flushes.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// How long one port write waits before handing control back to the forwarder.
///
/// This is a polling slice, not a deadline: a timed out write is retried
/// unless [`ForwardConfig::write_timeout`] is set and has run out.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Largest accepted block size (64 MiB).
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 115_200,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything a single forwarding run needs. Built once at startup.
#[derive(Debug, Clone)]
pub struct ForwardConfig {
    pub serial: SerialConfig,
    pub block_size: NonZeroUsize,
    pub settle: Duration,
    /// Give up on a block that could not be written within this long.
    /// `None` blocks until the device accepts the data.
    pub write_timeout: Option<Duration>,
}

impl ForwardConfig {
    pub fn new(serial: SerialConfig, block_size: NonZeroUsize) -> Self {
        Self {
            serial,
            block_size,
            settle: DEFAULT_SETTLE,
            write_timeout: None,
        }
    }

    /// Builds a config from the three textual command line values.
    ///
    /// Baud rate and block size must both be positive integers, and the block
    /// size may not exceed [`MAX_BLOCK_SIZE`].
    pub fn from_args(port: &str, baud_rate: &str, block_size: &str) -> Result<Self> {
        let baud_rate: NonZeroU32 = parse_arg("baud rate", baud_rate)?;
        let block_size: NonZeroUsize = parse_arg("block size", block_size)?;
        if block_size.get() > MAX_BLOCK_SIZE {
            return Err(ForwardError::InvalidArgument {
                name: "block size",
                value: block_size.to_string(),
                reason: format!("larger than {MAX_BLOCK_SIZE} bytes"),
            });
        }

        let serial = SerialConfig {
            port_name: port.to_string(),
            baud_rate: baud_rate.get(),
            ..Default::default()
        };
        Ok(Self::new(serial, block_size))
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Sets a per-block write deadline and shortens the port's polling slice to fit.
    pub fn with_write_timeout(mut self, limit: Duration) -> Self {
        self.write_timeout = Some(limit);
        self.serial.timeout = limit.min(DEFAULT_TIMEOUT);
        self
    }
}

fn parse_arg<T>(name: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ForwardError::InvalidArgument {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
