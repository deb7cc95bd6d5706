#![cfg(unix)]

use std::io::Read;
use std::thread;
use std::time::Duration;

use blocksend_core::{forward, ForwardConfig};
use serialport::{SerialPort, TTYPort};

/// Opens a pseudo terminal pair. The slave handle stays open, without the
/// exclusive lock, so the master does not see a hangup while the forwarder
/// opens the slave again by its path.
fn pty() -> (TTYPort, TTYPort, String) {
    let (master, mut slave) = TTYPort::pair().unwrap();
    let name = slave.name().unwrap();
    slave.set_exclusive(false).unwrap();
    (master, slave, name)
}

/// A receiver that stops reading for longer than the port timeout must only
/// slow the transfer down, not abort it.
#[test]
fn stalled_receiver_does_not_abort_transfer() {
    let (mut master, _slave, name) = pty();
    master.set_timeout(Duration::from_secs(10)).unwrap();

    let data: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let len = data.len();
    let receiver = thread::spawn(move || {
        thread::sleep(Duration::from_secs(2));
        let mut received = vec![0u8; len];
        master.read_exact(&mut received).unwrap();
        received
    });

    let mut cfg = ForwardConfig::from_args(&name, "115200", "4096")
        .unwrap()
        .with_settle(Duration::ZERO);
    cfg.serial.timeout = Duration::from_millis(50);

    let report = forward(&cfg, &mut data.as_slice()).unwrap();
    assert_eq!(report.bytes, len as u64);
    assert_eq!(report.blocks, len / 4096);

    let received = receiver.join().unwrap();
    assert!(received == data, "bytes arrived altered or out of order");
}

#[test]
fn write_timeout_aborts_stalled_transfer() {
    let (_master, _slave, name) = pty();

    let data = vec![0x55u8; 256 * 1024];
    let cfg = ForwardConfig::from_args(&name, "115200", "4096")
        .unwrap()
        .with_settle(Duration::ZERO)
        .with_write_timeout(Duration::from_millis(200));

    let err = forward(&cfg, &mut data.as_slice()).unwrap_err();
    assert!(matches!(err, blocksend_core::ForwardError::Write(_)), "{err:?}");
}
