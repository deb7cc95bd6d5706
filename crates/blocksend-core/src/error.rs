use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Every way a forwarding run can fail.
///
/// Messages do not repeat the underlying cause; walk `source()` for it.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid {name} '{value}': {reason}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not open port '{port}'")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("could not allocate a {size}-byte block buffer")]
    Buffer {
        size: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("read from input failed")]
    Read(#[source] io::Error),

    #[error("write to port failed")]
    Write(#[source] io::Error),

    #[error("flush of port failed")]
    Flush(#[source] io::Error),

    /// The background worker went away without reporting an outcome.
    #[error("transfer worker stopped unexpectedly")]
    Worker,
}

pub type Result<T> = std::result::Result<T, ForwardError>;
