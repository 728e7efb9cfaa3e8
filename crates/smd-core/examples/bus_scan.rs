//! SMD Bus Scan Tool
//!
//! Scans the bus for Red drivers and prints what each one reports.
//!
//! Usage:
//!   cargo run --example bus_scan -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (required unless set in the config file)
//!   --baud RATE       Baud rate (default: 115200)
//!   --config FILE     JSON master configuration; flags override it

use anyhow::{bail, Context, Result};
use smd_core::master::{Master, MasterConfig};
use smd_core::register::Index;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = MasterConfig::default();
    let mut port_name: Option<String> = None;
    let mut baud_rate: Option<u32> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                port_name = args.get(i).cloned();
            }
            "--baud" | "-b" => {
                i += 1;
                let raw = args.get(i).context("--baud needs a value")?;
                baud_rate = Some(raw.parse().with_context(|| format!("invalid baud rate '{}'", raw))?);
            }
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).context("--config needs a file")?;
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path))?;
                config = MasterConfig::from_json(&json)
                    .with_context(|| format!("parsing {}", path))?;
            }
            "--help" | "-h" => {
                println!("Usage: bus_scan [--port PORT] [--baud RATE] [--config FILE]");
                return Ok(());
            }
            other if !other.starts_with('-') => port_name = Some(other.to_string()),
            other => bail!("unknown option '{}'", other),
        }
        i += 1;
    }

    if let Some(name) = port_name {
        config.port_name = name;
    }
    if let Some(baud) = baud_rate {
        config.baud_rate = baud;
    }
    if config.port_name.is_empty() {
        bail!("no serial port given, pass --port or set port_name in --config");
    }

    println!("Scanning {} at {} baud...", config.port_name, config.baud_rate);
    let mut master = Master::open(config.clone())
        .with_context(|| format!("opening {}", config.port_name))?;

    let found = master.scan().context("bus scan failed")?;
    if found.is_empty() {
        println!("No drivers answered.");
        return Ok(());
    }

    for id in found {
        let info = master
            .get_driver_info(id)
            .with_context(|| format!("reading versions of driver {}", id))?;
        let position = master.get_variables(id, &[Index::PresentPosition, Index::OperationMode])?;
        println!(
            "  id {:3}  {}  position {}  mode {}",
            id, info, position[0], position[1]
        );
    }

    Ok(())
}
