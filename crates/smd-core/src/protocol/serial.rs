//! Serial port handling
//!
//! Opening and configuring the port a bus master runs on.

use serialport::SerialPort;
use std::time::Duration;

use super::{ProtocolError, MAX_BAUD_RATE, MIN_BAUD_RATE};

/// Check a baud rate against the range the drivers accept
pub fn validate_baud_rate(baud_rate: u32) -> Result<(), ProtocolError> {
    if !(MIN_BAUD_RATE..=MAX_BAUD_RATE).contains(&baud_rate) {
        return Err(ProtocolError::Validation(format!(
            "baud rate {} is outside {}..={}",
            baud_rate, MIN_BAUD_RATE, MAX_BAUD_RATE
        )));
    }
    Ok(())
}

fn port_error(e: serialport::Error) -> ProtocolError {
    ProtocolError::SerialError(e.to_string())
}

/// Open a serial port for the bus
pub fn open_port(
    name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    validate_baud_rate(baud_rate)?;

    let mut port = serialport::new(name, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(port_error)?;
    configure_port(port.as_mut())?;

    tracing::debug!(port = name, baud_rate, "opened serial port");
    Ok(port)
}

/// Configure a serial port for the bus: 8N1, no flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight).map_err(port_error)?;
    port.set_parity(serialport::Parity::None).map_err(port_error)?;
    port.set_stop_bits(serialport::StopBits::One).map_err(port_error)?;
    port.set_flow_control(serialport::FlowControl::None).map_err(port_error)?;
    Ok(())
}
