use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Send standard input to a serial port in fixed-size blocks.
#[derive(Debug, Clone, Parser)]
#[command(name = "blocksend", version)]
pub struct Args {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(required_unless_present = "list")]
    pub serial_port: Option<String>,

    /// Line speed in bits per second
    #[arg(required_unless_present = "list", allow_negative_numbers = true)]
    pub baud_rate: Option<String>,

    /// Bytes per read and per write
    #[arg(required_unless_present = "list", allow_negative_numbers = true)]
    pub block_size: Option<String>,

    /// Print the available serial ports and exit
    #[arg(long, conflicts_with_all = ["serial_port", "baud_rate", "block_size"])]
    pub list: bool,

    /// JSON settings file (defaults to <config dir>/blocksend/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pause between the final two flushes, in milliseconds
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// The three positional values, present unless `--list` was given.
    pub fn positional(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.serial_port.as_deref()?,
            self.baud_rate.as_deref()?,
            self.block_size.as_deref()?,
        ))
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
