//! Core functionalities: connection parameters, serial connection, block forwarding.

pub mod config;
pub mod connection;
pub mod error;
pub mod forwarder;
pub mod service;

pub use config::{ForwardConfig, SerialConfig, DEFAULT_SETTLE, DEFAULT_TIMEOUT, MAX_BLOCK_SIZE};
pub use connection::{list_ports, Connection, PortInfo};
pub use error::{ForwardError, Result};
pub use forwarder::{forward, Forwarder, TransferEvent, TransferReport};
pub use service::{ForwardEvent, ForwardService};
