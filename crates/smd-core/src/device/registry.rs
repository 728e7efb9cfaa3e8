//! Device registry
//!
//! One slot per bus address. A slot is either unattached or owns the
//! register table mirroring the driver at that address.

use super::DriverInfo;
use crate::protocol::command_builder::validate_device_id;
use crate::protocol::ProtocolError;
use crate::register::{Index, RegisterTable, RegisterValue};

/// Number of addressable slots, broadcast sentinel included
pub const SLOT_COUNT: usize = 256;

/// An attached driver
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Last known register state
    pub table: RegisterTable,
    /// Versions, once queried
    pub info: Option<DriverInfo>,
}

impl Device {
    fn new(table: RegisterTable) -> Self {
        Self { table, info: None }
    }
}

/// Per-ID register mirrors held by the master
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    slots: Vec<Option<Device>>,
}

impl DeviceRegistry {
    /// Registry with every slot unattached
    pub fn new() -> Self {
        Self {
            slots: vec![None; SLOT_COUNT],
        }
    }

    /// Attach `table` at `id`, replacing whatever was there
    ///
    /// The table's device-ID register is set to `id` so frames built from it
    /// address the right driver.
    pub fn attach(&mut self, id: u8, mut table: RegisterTable) -> Result<(), ProtocolError> {
        validate_device_id(id)?;
        table.set(Index::DeviceId, RegisterValue::U8(id))?;
        self.slots[id as usize] = Some(Device::new(table));
        Ok(())
    }

    /// Reset the slot at `id` to unattached
    pub fn detach(&mut self, id: u8) -> Option<Device> {
        self.slots[id as usize].take()
    }

    /// Check if a driver is attached at `id`
    pub fn is_attached(&self, id: u8) -> bool {
        self.slots[id as usize].is_some()
    }

    /// Attached driver at `id`
    pub fn device(&self, id: u8) -> Result<&Device, ProtocolError> {
        self.slots[id as usize]
            .as_ref()
            .ok_or(ProtocolError::UnknownDevice(id))
    }

    /// Mutable access to the driver at `id`
    pub fn device_mut(&mut self, id: u8) -> Result<&mut Device, ProtocolError> {
        self.slots[id as usize]
            .as_mut()
            .ok_or(ProtocolError::UnknownDevice(id))
    }

    /// Register table of the driver at `id`
    pub fn lookup(&self, id: u8) -> Result<&RegisterTable, ProtocolError> {
        self.device(id).map(|d| &d.table)
    }

    /// Mutable register table of the driver at `id`
    pub fn lookup_mut(&mut self, id: u8) -> Result<&mut RegisterTable, ProtocolError> {
        self.device_mut(id).map(|d| &mut d.table)
    }

    /// Move the driver at `old_id` to `new_id` after it has been readdressed
    pub fn rebind(&mut self, old_id: u8, new_id: u8) -> Result<(), ProtocolError> {
        validate_device_id(new_id)?;
        let mut device = self
            .slots[old_id as usize]
            .take()
            .ok_or(ProtocolError::UnknownDevice(old_id))?;
        device.table.set(Index::DeviceId, RegisterValue::U8(new_id))?;
        self.slots[new_id as usize] = Some(device);
        Ok(())
    }

    /// IDs of every attached driver, ascending
    pub fn attached_ids(&self) -> Vec<u8> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| id as u8)
            .collect()
    }

    /// Number of attached drivers
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when nothing is attached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_starts_empty() {
        let registry = DeviceRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.lookup(0),
            Err(ProtocolError::UnknownDevice(0))
        ));
        assert!(registry.lookup(255).is_err());
    }

    #[test]
    fn test_attach_detach() {
        let mut registry = DeviceRegistry::new();
        registry.attach(3, RegisterTable::new(3)).unwrap();
        registry.attach(42, RegisterTable::new(42)).unwrap();

        assert_eq!(registry.attached_ids(), vec![3, 42]);
        assert_eq!(registry.lookup(42).unwrap().device_id(), 42);

        let removed = registry.detach(3).unwrap();
        assert_eq!(removed.table.device_id(), 3);
        assert!(!registry.is_attached(3));
        assert!(registry.detach(3).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_attach_readdresses_table() {
        let mut registry = DeviceRegistry::new();
        registry.attach(8, RegisterTable::broadcast()).unwrap();
        assert_eq!(registry.lookup(8).unwrap().device_id(), 8);
    }

    #[test]
    fn test_attach_rejects_broadcast() {
        let mut registry = DeviceRegistry::new();
        assert!(matches!(
            registry.attach(255, RegisterTable::new(255)),
            Err(ProtocolError::Validation(_))
        ));
    }

    #[test]
    fn test_rebind() {
        let mut registry = DeviceRegistry::new();
        let mut table = RegisterTable::new(1);
        table.set(Index::TorqueLimit, RegisterValue::U16(500)).unwrap();
        registry.attach(1, table).unwrap();

        registry.rebind(1, 9).unwrap();

        assert!(!registry.is_attached(1));
        let moved = registry.lookup(9).unwrap();
        assert_eq!(moved.device_id(), 9);
        assert_eq!(moved.get(Index::TorqueLimit), RegisterValue::U16(500));
        assert!(matches!(
            registry.rebind(1, 2),
            Err(ProtocolError::UnknownDevice(1))
        ));
    }
}
