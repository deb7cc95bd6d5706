mod args;
mod settings;

use std::io;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use blocksend_core::{forward, list_ports, ForwardConfig, TransferReport};
use clap::{error::ErrorKind, Parser};
use log::info;

use args::Args;
use settings::Settings;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            print!("{}", e.render());
            process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    if args.list {
        print_ports();
        return;
    }

    // Failures are reported, not turned into a crash or a distinct exit code.
    match run(&args) {
        Ok(report) => {
            info!("sent {} bytes in {} blocks", report.bytes, report.blocks);
            println!("Data sent successfully.");
        }
        Err(e) => println!("An error occurred: {e:#}"),
    }
}

fn run(args: &Args) -> Result<TransferReport> {
    let (port, baud_rate, block_size) = args
        .positional()
        .context("serial port, baud rate and block size are required")?;

    let mut cfg = ForwardConfig::from_args(port, baud_rate, block_size)?;
    Settings::load(args.config.as_deref())?.apply(&mut cfg)?;
    if let Some(ms) = args.settle_ms {
        cfg.settle = Duration::from_millis(ms);
    }
    info!(
        "forwarding stdin to {} at {} baud in {}-byte blocks",
        cfg.serial.port_name, cfg.serial.baud_rate, cfg.block_size
    );

    let stdin = io::stdin();
    let mut input = stdin.lock();
    Ok(forward(&cfg, &mut input)?)
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{port}");
    }
}
