//! Block-wise copy from an input stream to an output link.

use std::io::{self, Read, Write};
use std::num::NonZeroUsize;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, log_enabled, trace, Level};

use crate::config::{ForwardConfig, DEFAULT_SETTLE};
use crate::connection::Connection;
use crate::error::{ForwardError, Result};

/// Outcome of a completed transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Number of blocks written, one write per block.
    pub blocks: usize,
    pub bytes: u64,
}

/// Progress notifications emitted by [`Forwarder::transfer_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// A block of this many bytes reached the link.
    Block(usize),
    /// Input is exhausted and the first flush completed.
    Settling,
}

#[derive(Debug, Clone, Copy)]
pub struct Forwarder {
    block_size: NonZeroUsize,
    settle: Duration,
    write_timeout: Option<Duration>,
}

impl Forwarder {
    pub fn new(block_size: NonZeroUsize) -> Self {
        Self {
            block_size,
            settle: DEFAULT_SETTLE,
            write_timeout: None,
        }
    }

    pub fn from_config(cfg: &ForwardConfig) -> Self {
        Self {
            block_size: cfg.block_size,
            settle: cfg.settle,
            write_timeout: cfg.write_timeout,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Without a write timeout a block write waits for the device indefinitely.
    pub fn with_write_timeout(mut self, limit: Option<Duration>) -> Self {
        self.write_timeout = limit;
        self
    }

    pub fn block_size(&self) -> NonZeroUsize {
        self.block_size
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    pub fn transfer<R, W>(&self, input: &mut R, link: &mut W) -> Result<TransferReport>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        self.transfer_with(input, link, |_| {})
    }

    /// Copies `input` to `link` until end of input, then flushes, waits the
    /// settle delay and flushes again.
    ///
    /// Each block is filled completely before it is written, so only the last
    /// block may be short. The first failing read, write or flush ends the
    /// transfer; blocks already written are not taken back.
    pub fn transfer_with<R, W, F>(
        &self,
        input: &mut R,
        link: &mut W,
        mut on_event: F,
    ) -> Result<TransferReport>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
        F: FnMut(TransferEvent),
    {
        let size = self.block_size.get();
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|source| ForwardError::Buffer { size, source })?;
        buf.resize(size, 0);
        let mut report = TransferReport::default();

        loop {
            let n = read_block(input, &mut buf).map_err(ForwardError::Read)?;
            if n == 0 {
                break;
            }

            let block = &buf[..n];
            self.write_block(link, block).map_err(ForwardError::Write)?;
            if log_enabled!(Level::Trace) {
                trace!("tx {}", hex::encode(block));
            }

            report.blocks += 1;
            report.bytes += n as u64;
            on_event(TransferEvent::Block(n));
        }
        debug!(
            "input exhausted after {} blocks ({} bytes)",
            report.blocks, report.bytes
        );

        link.flush().map_err(ForwardError::Flush)?;
        on_event(TransferEvent::Settling);
        thread::sleep(self.settle);
        link.flush().map_err(ForwardError::Flush)?;

        Ok(report)
    }

    // Like `write_all`, but a port timeout only means the device is not
    // draining yet. It ends the write once `write_timeout` has passed.
    fn write_block<W: Write + ?Sized>(&self, link: &mut W, mut block: &[u8]) -> io::Result<()> {
        let started = Instant::now();
        while !block.is_empty() {
            match link.write(block) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => block = &block[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut && self.may_wait(started) => {
                    debug!("port busy, {} bytes of block pending", block.len());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn may_wait(&self, started: Instant) -> bool {
        match self.write_timeout {
            Some(limit) => started.elapsed() < limit,
            None => true,
        }
    }
}

/// Opens the configured serial port and sends all of `input` to it.
///
/// The port is closed before this returns, on success and on error alike.
/// When the port cannot be opened nothing is read from `input`.
pub fn forward<R>(cfg: &ForwardConfig, input: &mut R) -> Result<TransferReport>
where
    R: Read + ?Sized,
{
    let mut conn = Connection::open(&cfg.serial)?;
    Forwarder::from_config(cfg).transfer(input, &mut conn)
}

// Reads until `buf` is full or input ends. Returns 0 only at end of input.
fn read_block<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hands out at most `step` bytes per read and fails once with Interrupted.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn read_block_fills_across_short_reads() {
        let mut input = Trickle {
            data: b"0123456789".to_vec(),
            pos: 0,
            step: 3,
            interrupted: false,
        };
        let mut buf = [0u8; 4];

        assert_eq!(read_block(&mut input, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(read_block(&mut input, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(read_block(&mut input, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(read_block(&mut input, &mut buf).unwrap(), 0);
    }

    #[test]
    fn events_follow_blocks_then_settle() {
        let fwd = Forwarder::new(NonZeroUsize::new(2).unwrap()).with_settle(Duration::ZERO);
        let mut out = Vec::new();
        let mut events = Vec::new();

        let report = fwd
            .transfer_with(&mut &b"abcde"[..], &mut out, |e| events.push(e))
            .unwrap();

        assert_eq!(out, b"abcde");
        assert_eq!(report, TransferReport { blocks: 3, bytes: 5 });
        assert_eq!(
            events,
            vec![
                TransferEvent::Block(2),
                TransferEvent::Block(2),
                TransferEvent::Block(1),
                TransferEvent::Settling,
            ]
        );
    }

    // Reports a timeout `stalls` times before it starts accepting data.
    struct Stalling {
        stalls: usize,
        written: Vec<u8>,
    }

    impl Write for Stalling {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(io::ErrorKind::TimedOut.into());
            }
            let n = buf.len().min(3);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn port_timeouts_are_waited_out() {
        let fwd = Forwarder::new(NonZeroUsize::new(8).unwrap()).with_settle(Duration::ZERO);
        let mut link = Stalling {
            stalls: 5,
            written: Vec::new(),
        };

        let report = fwd.transfer(&mut &b"slow device"[..], &mut link).unwrap();

        assert_eq!(link.written, b"slow device");
        assert_eq!(report, TransferReport { blocks: 2, bytes: 11 });
    }

    #[test]
    fn write_timeout_gives_up() {
        let fwd = Forwarder::new(NonZeroUsize::new(8).unwrap())
            .with_settle(Duration::ZERO)
            .with_write_timeout(Some(Duration::ZERO));
        let mut link = Stalling {
            stalls: 1,
            written: Vec::new(),
        };

        match fwd.transfer(&mut &b"abc"[..], &mut link) {
            Err(ForwardError::Write(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected a write timeout, got {other:?}"),
        }
        assert!(link.written.is_empty());
    }

    #[test]
    fn oversized_block_is_an_error() {
        let fwd = Forwarder::new(NonZeroUsize::MAX).with_settle(Duration::ZERO);
        match fwd.transfer(&mut io::empty(), &mut io::sink()) {
            Err(ForwardError::Buffer { size, .. }) => assert_eq!(size, usize::MAX),
            other => panic!("expected an allocation error, got {other:?}"),
        }
    }

    #[test]
    fn settle_delay_is_observed() {
        let settle = Duration::from_millis(30);
        let fwd = Forwarder::new(NonZeroUsize::new(8).unwrap()).with_settle(settle);
        let started = std::time::Instant::now();
        fwd.transfer(&mut io::empty(), &mut io::sink()).unwrap();
        assert!(started.elapsed() >= settle);
    }
}
