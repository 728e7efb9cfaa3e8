//! Bus master
//!
//! Runs one request/acknowledgment transaction at a time over a
//! [`Transport`] and keeps the [`DeviceRegistry`] in step with what the
//! drivers report.
//!
//! Every transaction takes `&mut self`; share a master between threads by
//! wrapping it in a mutex.

mod config;
mod control;

pub use config::MasterConfig;
pub use control::{ControlLoop, ControlParameters};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::device::{DeviceRegistry, DriverInfo};
use crate::protocol::command_builder::validate_device_id;
use crate::protocol::serial::{open_port, validate_baud_rate};
use crate::protocol::{
    AckLength, Command, CommandBuilder, Frame, ProtocolError, Request, SerialTransport, Transport,
    MAX_DEVICE_ID, SENSOR_SCAN_DELAY_MS,
};
use crate::register::{Index, RegisterTable, RegisterValue};

/// Progress of the current transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Nothing on the wire
    Idle,
    /// Request written, bus settling
    FrameSent,
    /// Waiting for the acknowledgment bytes
    AwaitingAck,
    /// Acknowledgment validated and applied
    Applied,
    /// Acknowledgment failed validation
    Rejected,
}

/// Time for 10 bits at `baud_rate`
pub fn settle_interval(baud_rate: u32) -> Duration {
    Duration::from_nanos(10_000_000_000 / u64::from(baud_rate.max(1)))
}

/// Host side of the driver bus
pub struct Master<T: Transport> {
    transport: T,
    registry: DeviceRegistry,
    config: MasterConfig,
    baud_rate: u32,
    settle: Duration,
    state: TransactionState,
}

impl Master<SerialTransport> {
    /// Open the serial port named in `config`
    pub fn open(config: MasterConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        let port = open_port(&config.port_name, config.baud_rate, config.timeout())?;
        Self::new(SerialTransport::new(port), config)
    }
}

impl<T: Transport> Master<T> {
    /// Create a master over an already open transport running at
    /// `config.baud_rate`
    pub fn new(mut transport: T, config: MasterConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        transport.set_timeout(config.timeout())?;

        Ok(Self {
            transport,
            registry: DeviceRegistry::new(),
            baud_rate: config.baud_rate,
            settle: settle_interval(config.baud_rate),
            config,
            state: TransactionState::Idle,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Current local baud rate
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Pause observed after every frame written
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// State of the last transaction
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Attached drivers and their register mirrors
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Mutable access to the registry, e.g. to rebind a readdressed driver
    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Attach a driver at `id` with a fresh register table
    pub fn attach(&mut self, id: u8) -> Result<(), ProtocolError> {
        self.registry.attach(id, RegisterTable::new(id))
    }

    /// Attach a driver with a prepared register table
    pub fn attach_table(&mut self, id: u8, table: RegisterTable) -> Result<(), ProtocolError> {
        self.registry.attach(id, table)
    }

    /// Forget the driver at `id`
    pub fn detach(&mut self, id: u8) {
        self.registry.detach(id);
    }

    /// Write registers on a driver
    ///
    /// With `ack`, the driver's acknowledgment is awaited and the written
    /// values are returned; without it nothing is read back and `None` is
    /// returned.
    pub fn set_variables(
        &mut self,
        id: u8,
        pairs: &[(Index, RegisterValue)],
        ack: bool,
    ) -> Result<Option<Vec<RegisterValue>>, ProtocolError> {
        validate_device_id(id)?;
        if pairs.is_empty() {
            return Err(ProtocolError::Validation(
                "index/value list is empty".to_string(),
            ));
        }

        let request = CommandBuilder::write(self.registry.lookup_mut(id)?, pairs, ack)?;
        if self.transact(request)?.is_none() {
            return Ok(None);
        }

        let table = self.registry.lookup(id)?;
        Ok(Some(pairs.iter().map(|(index, _)| table.get(*index)).collect()))
    }

    /// Read registers from a driver, returning them in request order
    pub fn get_variables(&mut self, id: u8, indices: &[Index]) -> Result<Vec<RegisterValue>, ProtocolError> {
        validate_device_id(id)?;
        if indices.is_empty() {
            return Err(ProtocolError::Validation("index list is empty".to_string()));
        }

        let request = CommandBuilder::read(self.registry.lookup(id)?, indices)?;
        self.transact(request)?;

        let table = self.registry.lookup(id)?;
        Ok(indices.iter().map(|index| table.get(*index)).collect())
    }

    /// Write one register on several drivers with a single broadcast frame
    pub fn set_variables_sync(&mut self, index: Index, targets: &[(u8, RegisterValue)]) -> Result<(), ProtocolError> {
        let request = CommandBuilder::sync_write(index, targets)?;
        self.transact(request)?;
        Ok(())
    }

    /// Check whether the driver at `id` answers
    pub fn ping(&mut self, id: u8) -> Result<bool, ProtocolError> {
        let result = self.maintenance(id, Command::Ping);
        acknowledged(result)
    }

    /// Probe every address and keep the drivers that answer
    pub fn scan(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let normal_timeout = self.transport.timeout();
        self.transport.set_timeout(self.config.scan_timeout())?;

        let result = self.probe_all();
        let restored = self.transport.set_timeout(normal_timeout);

        let found = result?;
        restored?;
        info!(?found, "bus scan complete");
        Ok(found)
    }

    fn probe_all(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut found = Vec::new();
        for id in 0..=MAX_DEVICE_ID {
            self.registry.attach(id, RegisterTable::new(id))?;
            match self.ping(id) {
                Ok(true) => found.push(id),
                Ok(false) => {
                    self.registry.detach(id);
                }
                Err(e) => {
                    self.registry.detach(id);
                    return Err(e);
                }
            }
        }
        Ok(found)
    }

    /// Restart the driver; no acknowledgment
    pub fn reboot(&mut self, id: u8) -> Result<(), ProtocolError> {
        self.maintenance(id, Command::Reboot).map(|_| ())
    }

    /// Clear the driver's persisted configuration; no acknowledgment
    pub fn factory_reset(&mut self, id: u8) -> Result<(), ProtocolError> {
        self.maintenance(id, Command::HardReset).map(|_| ())
    }

    /// Persist the driver's configuration without waiting for an answer
    pub fn eeprom_write(&mut self, id: u8) -> Result<(), ProtocolError> {
        self.maintenance(id, Command::EepromWrite).map(|_| ())
    }

    /// Persist the driver's configuration and wait for the acknowledgment
    pub fn eeprom_write_ack(&mut self, id: u8) -> Result<bool, ProtocolError> {
        let result = self.maintenance(id, Command::EepromWriteAck);
        acknowledged(result)
    }

    /// Zero the encoder count
    pub fn reset_encoder(&mut self, id: u8) -> Result<bool, ProtocolError> {
        let result = self.maintenance(id, Command::ResetEncoder);
        acknowledged(result)
    }

    /// Put the driver into its bootloader; no acknowledgment
    pub fn enter_bootloader(&mut self, id: u8) -> Result<(), ProtocolError> {
        self.maintenance(id, Command::EnterBootloader).map(|_| ())
    }

    /// List the sensor IDs found on the driver's sub-bus
    ///
    /// The first request starts the scan on the driver; the answer is
    /// collected by repeating the request once the scan has had time to run.
    pub fn scan_sensors(&mut self, id: u8) -> Result<Vec<u8>, ProtocolError> {
        validate_device_id(id)?;
        let request = CommandBuilder::maintenance(self.registry.lookup(id)?, Command::ScanSensors)?;

        self.transport.clear_input()?;
        self.transport.write(&request.bytes)?;
        self.transport.sleep(Duration::from_millis(SENSOR_SCAN_DELAY_MS));

        let frame = self.transact(request)?.ok_or(ProtocolError::InvalidResponse)?;
        Ok(frame.payload)
    }

    /// Read and cache the driver's hardware and software versions
    pub fn get_driver_info(&mut self, id: u8) -> Result<DriverInfo, ProtocolError> {
        let values = self.get_variables(id, &[Index::HardwareVersion, Index::SoftwareVersion])?;
        let hardware = values.first().and_then(RegisterValue::as_u32);
        let software = values.get(1).and_then(RegisterValue::as_u32);
        let (Some(hardware), Some(software)) = (hardware, software) else {
            return Err(ProtocolError::InvalidResponse);
        };

        let info = DriverInfo::from_raw(hardware, software);
        self.registry.device_mut(id)?.info = Some(info.clone());
        Ok(info)
    }

    /// Readdress the driver at `id`
    ///
    /// The registry is not updated; call
    /// [`DeviceRegistry::rebind`] once the driver answers at `new_id`.
    pub fn update_driver_id(&mut self, id: u8, new_id: u8) -> Result<(), ProtocolError> {
        validate_device_id(id)?;
        let request = CommandBuilder::update_device_id(self.registry.lookup(id)?, new_id)?;
        self.transact(request)?;
        Ok(())
    }

    /// Change the driver's baud rate: write the register, persist it, reboot.
    ///
    /// The local port keeps its rate; follow with
    /// [`Master::update_master_baudrate`] to talk to the driver again.
    pub fn update_driver_baudrate(&mut self, id: u8, baud_rate: u32) -> Result<(), ProtocolError> {
        validate_baud_rate(baud_rate)?;

        self.set_variables(id, &[(Index::Baudrate, RegisterValue::U32(baud_rate))], false)?;
        self.transport.sleep(self.settle);
        self.eeprom_write(id)?;
        self.transport.sleep(self.settle);
        self.reboot(id)?;

        info!(id, baud_rate, "driver baud rate updated");
        Ok(())
    }

    /// Change the local port's baud rate
    pub fn update_master_baudrate(&mut self, baud_rate: u32) -> Result<(), ProtocolError> {
        validate_baud_rate(baud_rate)?;

        self.transport.clear_input()?;
        self.transport.set_baud_rate(baud_rate)?;
        self.baud_rate = baud_rate;
        self.config.baud_rate = baud_rate;
        self.settle = settle_interval(baud_rate);

        info!(baud_rate, settle_ns = self.settle.as_nanos() as u64, "master baud rate updated");
        Ok(())
    }

    fn maintenance(&mut self, id: u8, command: Command) -> Result<Option<Frame>, ProtocolError> {
        validate_device_id(id)?;
        let request = CommandBuilder::maintenance(self.registry.lookup(id)?, command)?;
        self.transact(request)
    }

    /// Send a request and, if it solicits one, read and apply the acknowledgment
    fn transact(&mut self, request: Request) -> Result<Option<Frame>, ProtocolError> {
        self.state = TransactionState::Idle;

        self.transport.clear_input()?;
        debug!(
            command = ?request.command,
            id = request.device_id,
            "sending {} bytes: {:02x?}",
            request.bytes.len(),
            request.bytes
        );
        self.transport.write(&request.bytes)?;
        self.state = TransactionState::FrameSent;

        trace!(settle_ns = self.settle.as_nanos() as u64, "settling bus");
        self.transport.sleep(self.settle);

        let Some(read_len) = request.ack.read_len() else {
            self.state = TransactionState::Idle;
            return Ok(None);
        };

        self.state = TransactionState::AwaitingAck;
        let raw = self.transport.read(read_len)?;
        debug!(
            id = request.device_id,
            "received {} of {} bytes: {:02x?}",
            raw.len(),
            read_len,
            raw
        );

        match self.accept(&request, &raw) {
            Ok(frame) => {
                self.state = TransactionState::Applied;
                Ok(Some(frame))
            }
            Err(e) => {
                self.state = TransactionState::Rejected;
                warn!(command = ?request.command, id = request.device_id, "acknowledgment rejected: {}", e);
                Err(e)
            }
        }
    }

    fn accept(&mut self, request: &Request, raw: &[u8]) -> Result<Frame, ProtocolError> {
        let frame = match request.ack {
            AckLength::Exact(len) => Frame::decode_and_validate(raw, len)?,
            AckLength::UpTo(_) => Frame::decode(raw)?,
            AckLength::None => return Err(ProtocolError::InvalidResponse),
        };

        if frame.header.device_id != request.device_id
            || frame.header.command != request.command.opcode()
        {
            return Err(ProtocolError::InvalidResponse);
        }

        if !frame.has_data() || request.command == Command::ScanSensors {
            return Ok(frame);
        }

        let pairs = frame.register_pairs()?;
        // A READ must answer exactly the requested registers, in request order
        if request.command == Command::Read
            && !pairs.iter().map(|(index, _)| *index).eq(request.indices.iter().copied())
        {
            return Err(ProtocolError::InvalidResponse);
        }

        let table = self.registry.lookup_mut(request.device_id)?;
        for (index, value) in pairs {
            table.apply(index, value)?;
        }

        Ok(frame)
    }
}

impl<T: Transport> Drop for Master<T> {
    fn drop(&mut self) {
        let _ = self.transport.clear_input();
    }
}

/// Fold acknowledgment integrity failures into `false`
fn acknowledged(result: Result<Option<Frame>, ProtocolError>) -> Result<bool, ProtocolError> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_integrity_failure() => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_interval() {
        assert_eq!(settle_interval(115200), Duration::from_nanos(86_805));
        assert_eq!(settle_interval(1_000_000), Duration::from_micros(10));
        assert_eq!(settle_interval(10_000), Duration::from_millis(1));
    }

    #[test]
    fn test_acknowledged() {
        assert!(acknowledged(Ok(None)).unwrap());
        assert!(!acknowledged(Err(ProtocolError::ChecksumMismatch { expected: 1, actual: 2 })).unwrap());
        assert!(!acknowledged(Err(ProtocolError::LengthMismatch { expected: 10, actual: 0 })).unwrap());
        assert!(acknowledged(Err(ProtocolError::UnknownDevice(3))).is_err());
    }
}
