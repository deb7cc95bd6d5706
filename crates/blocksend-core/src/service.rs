//! Runs a transfer on a worker thread and reports progress over a channel.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::thread::{self, JoinHandle};

use crate::config::ForwardConfig;
use crate::connection::Connection;
use crate::error::{ForwardError, Result};
use crate::forwarder::{Forwarder, TransferEvent, TransferReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardEvent {
    Opened(String),
    Tx(usize),
    Settling,
    Done(TransferReport),
    Error(String),
    /// Always the last event; the link has been released.
    Closed,
}

pub struct ForwardService {
    rx_evt: Receiver<ForwardEvent>,
    worker: JoinHandle<Result<TransferReport>>,
}

impl ForwardService {
    /// Opens the configured serial port on a worker thread and sends `input` to it.
    pub fn spawn<R>(cfg: ForwardConfig, input: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let forwarder = Forwarder::from_config(&cfg);
        let open = move || -> Result<Connection<Box<dyn SerialPort>>> { Connection::open(&cfg.serial) };
        Self::spawn_with(forwarder, input, open)
    }

    pub fn spawn_with<R, W, F>(forwarder: Forwarder, mut input: R, open: F) -> Self
    where
        R: Read + Send + 'static,
        W: Write + 'static,
        F: FnOnce() -> Result<Connection<W>> + Send + 'static,
    {
        let (tx_evt, rx_evt) = unbounded::<ForwardEvent>();

        let worker = thread::spawn(move || {
            let result = run(&forwarder, &mut input, open, &tx_evt);
            match &result {
                Ok(report) => {
                    let _ = tx_evt.send(ForwardEvent::Done(*report));
                }
                Err(e) => {
                    let _ = tx_evt.send(ForwardEvent::Error(e.to_string()));
                }
            }
            let _ = tx_evt.send(ForwardEvent::Closed);
            result
        });

        Self { rx_evt, worker }
    }

    pub fn events(&self) -> &Receiver<ForwardEvent> {
        &self.rx_evt
    }

    /// Blocks until the worker finishes and returns its outcome.
    pub fn wait(self) -> Result<TransferReport> {
        self.worker.join().map_err(|_| ForwardError::Worker)?
    }
}

fn run<R, W, F>(
    forwarder: &Forwarder,
    input: &mut R,
    open: F,
    tx_evt: &Sender<ForwardEvent>,
) -> Result<TransferReport>
where
    R: Read,
    W: Write,
    F: FnOnce() -> Result<Connection<W>>,
{
    let mut conn = open()?;
    let _ = tx_evt.send(ForwardEvent::Opened(conn.name().to_string()));

    forwarder.transfer_with(input, &mut conn, |event| {
        let _ = tx_evt.send(match event {
            TransferEvent::Block(n) => ForwardEvent::Tx(n),
            TransferEvent::Settling => ForwardEvent::Settling,
        });
    })
}
