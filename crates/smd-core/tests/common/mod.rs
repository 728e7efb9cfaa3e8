//! Simulated driver bus shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use smd_core::master::{Master, MasterConfig};
use smd_core::protocol::packet::{decode_pairs, Frame, PacketBuilder};
use smd_core::protocol::{Command, Transport, BROADCAST_ID};
use smd_core::register::{Index, RegisterTable, RegisterValue};

/// Something the master did to the bus
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Write(Vec<u8>),
    Read(usize),
    Sleep(Duration),
    ClearInput,
    SetTimeout(Duration),
    SetBaud(u32),
}

/// A driver on the simulated bus
#[derive(Debug, Clone)]
pub struct SimDriver {
    pub table: RegisterTable,
    pub sensors: Vec<u8>,
    pub persisted: usize,
    pub reboots: usize,
    pub factory_resets: usize,
    pub bootloader: bool,
}

impl SimDriver {
    fn new(id: u8) -> Self {
        Self {
            table: RegisterTable::new(id),
            sensors: Vec::new(),
            persisted: 0,
            reboots: 0,
            factory_resets: 0,
            bootloader: false,
        }
    }
}

/// In-memory bus answering like Red drivers would
#[derive(Debug, Default)]
pub struct SimBus {
    drivers: BTreeMap<u8, SimDriver>,
    pending: Vec<u8>,
    events: Vec<Event>,
    timeout: Duration,
    baud_rate: u32,
    next_reply: Option<Vec<u8>>,
    flip_bit: Option<usize>,
}

impl SimBus {
    pub fn with_drivers(ids: &[u8]) -> Self {
        let mut bus = Self {
            baud_rate: 115200,
            ..Self::default()
        };
        for &id in ids {
            bus.drivers.insert(id, SimDriver::new(id));
        }
        bus
    }

    pub fn driver(&self, id: u8) -> &SimDriver {
        &self.drivers[&id]
    }

    pub fn driver_mut(&mut self, id: u8) -> &mut SimDriver {
        self.drivers.get_mut(&id).expect("no simulated driver at that id")
    }

    pub fn has_driver(&self, id: u8) -> bool {
        self.drivers.contains_key(&id)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Frames the master has written, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Commands the master has written, in order
    pub fn commands(&self) -> Vec<Command> {
        self.writes()
            .iter()
            .filter_map(|bytes| Frame::decode(bytes).ok()?.command())
            .collect()
    }

    /// Answer the next acknowledged request with `bytes` instead
    pub fn reply_with(&mut self, bytes: Vec<u8>) {
        self.next_reply = Some(bytes);
    }

    /// Flip one bit of the next reply
    pub fn corrupt_next_reply(&mut self, bit: usize) {
        self.flip_bit = Some(bit);
    }

    fn handle(&mut self, frame: Frame) -> Option<Vec<u8>> {
        let command = frame.command()?;
        let id = frame.header.device_id;

        if id == BROADCAST_ID {
            if command == Command::SyncWrite {
                self.sync_write(&frame.payload);
            }
            return None;
        }

        let driver = self.drivers.get_mut(&id)?;
        let reply = match command {
            Command::Ping | Command::EepromWriteAck => Some(Vec::new()),
            Command::Write | Command::WriteAck => {
                for (index, value) in decode_pairs(&frame.payload).ok()? {
                    let _ = driver.table.set(index, value);
                }
                (command == Command::WriteAck).then(Vec::new)
            }
            Command::Read => {
                let mut body = Vec::new();
                for &raw in &frame.payload {
                    let index = Index::try_from(raw).ok()?;
                    body.push(raw);
                    driver.table.get(index).write_le(&mut body);
                }
                Some(body)
            }
            Command::EepromWrite => {
                driver.persisted += 1;
                None
            }
            Command::Reboot => {
                driver.reboots += 1;
                None
            }
            Command::HardReset => {
                driver.factory_resets += 1;
                None
            }
            Command::EnterBootloader => {
                driver.bootloader = true;
                None
            }
            Command::ResetEncoder => {
                let _ = driver.table.set(Index::PresentPosition, RegisterValue::F32(0.0));
                Some(Vec::new())
            }
            Command::ScanSensors => Some(driver.sensors.clone()),
            _ => None,
        };

        let body = reply?;
        PacketBuilder::new(&driver.table, command)
            .bytes(&body)
            .build()
            .ok()
    }

    fn readdress(&mut self, id: u8) {
        let Some(driver) = self.drivers.get(&id) else {
            return;
        };
        let new_id = driver.table.device_id();
        if new_id != id {
            if let Some(moved) = self.drivers.remove(&id) {
                self.drivers.insert(new_id, moved);
            }
        }
    }

    fn sync_write(&mut self, payload: &[u8]) {
        let Some((&raw, rest)) = payload.split_first() else {
            return;
        };
        let Ok(index) = Index::try_from(raw) else {
            return;
        };

        for chunk in rest.chunks(1 + index.byte_width()) {
            let Ok(value) = index.encoding().decode(&chunk[1..]) else {
                return;
            };
            if let Some(driver) = self.drivers.get_mut(&chunk[0]) {
                let _ = driver.table.set(index, value);
            }
        }
    }
}

impl Transport for SimBus {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.events.push(Event::Write(data.to_vec()));

        let Ok(frame) = Frame::decode(data) else {
            return Ok(());
        };
        let id = frame.header.device_id;
        let reply = self.handle(frame);
        self.readdress(id);

        if let Some(reply) = reply {
            let mut reply = self.next_reply.take().unwrap_or(reply);
            if let Some(bit) = self.flip_bit.take() {
                reply[bit / 8] ^= 1 << (bit % 8);
            }
            self.pending.extend_from_slice(&reply);
        }
        Ok(())
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        self.events.push(Event::Read(max_bytes));
        let n = max_bytes.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn sleep(&mut self, duration: Duration) {
        self.events.push(Event::Sleep(duration));
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.events.push(Event::ClearInput);
        self.pending.clear();
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.events.push(Event::SetTimeout(timeout));
        self.timeout = timeout;
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        self.events.push(Event::SetBaud(baud_rate));
        self.baud_rate = baud_rate;
        Ok(())
    }
}

/// Route library logs to the test output; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A master over a simulated bus with `ids` present and attached
pub fn master_with(ids: &[u8]) -> Master<SimBus> {
    init_tracing();
    let mut master = Master::new(SimBus::with_drivers(ids), MasterConfig::default())
        .expect("default config is valid");
    for &id in ids {
        master.attach(id).expect("valid id");
    }
    master.transport_mut().clear_events();
    master
}
