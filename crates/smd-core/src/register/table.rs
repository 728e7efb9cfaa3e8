//! Per-device register table
//!
//! Holds the host's mirror of one driver's registers.

use super::{FieldEncoding, Index, RegisterError, RegisterValue, REGISTER_COUNT};
use crate::protocol::{BROADCAST_ID, HEADER, PRODUCT_TYPE};

/// Mirror of a single driver's register set
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterTable {
    values: Vec<RegisterValue>,
}

impl RegisterTable {
    /// Create a table for the driver at `device_id`, every register zeroed
    /// except the fixed header and product constants
    pub fn new(device_id: u8) -> Self {
        let mut values: Vec<RegisterValue> = Index::ALL.iter().map(|i| i.encoding().zero()).collect();
        values[Index::Header as usize] = RegisterValue::U8(HEADER);
        values[Index::DeviceFamily as usize] = RegisterValue::U8(PRODUCT_TYPE);
        values[Index::DeviceId as usize] = RegisterValue::U8(device_id);
        debug_assert_eq!(values.len(), REGISTER_COUNT);
        Self { values }
    }

    /// Table addressed to the broadcast sentinel
    pub fn broadcast() -> Self {
        Self::new(BROADCAST_ID)
    }

    /// Device ID this table is addressed to
    pub fn device_id(&self) -> u8 {
        self.values[Index::DeviceId as usize].as_u8().unwrap_or(BROADCAST_ID)
    }

    /// Current value of a register
    pub fn get(&self, index: Index) -> RegisterValue {
        self.values[index as usize]
    }

    /// Current value of a register addressed by raw ordinal
    pub fn get_by_ordinal(&self, ordinal: u8) -> Result<RegisterValue, RegisterError> {
        let index = Index::try_from(ordinal)?;
        Ok(self.get(index))
    }

    /// Write a register locally
    ///
    /// Fixed constants are rejected, as is a value of the wrong encoding.
    pub fn set(&mut self, index: Index, value: RegisterValue) -> Result<(), RegisterError> {
        if index.is_fixed() {
            return Err(RegisterError::ReadOnly(index));
        }
        self.check_encoding(index, &value)?;
        self.values[index as usize] = value;
        Ok(())
    }

    /// Store a value decoded from a validated acknowledgment.
    /// Fixed constants are left as they are.
    pub(crate) fn apply(&mut self, index: Index, value: RegisterValue) -> Result<(), RegisterError> {
        self.check_encoding(index, &value)?;
        if !index.is_fixed() {
            self.values[index as usize] = value;
        }
        Ok(())
    }

    /// Width in bytes of a register
    pub fn byte_width(&self, index: Index) -> usize {
        index.byte_width()
    }

    /// Encoding of a register
    pub fn encoding(&self, index: Index) -> FieldEncoding {
        index.encoding()
    }

    /// Iterate over every register and its value, in address order
    pub fn iter(&self) -> impl Iterator<Item = (Index, RegisterValue)> + '_ {
        Index::ALL.iter().copied().zip(self.values.iter().copied())
    }

    fn check_encoding(&self, index: Index, value: &RegisterValue) -> Result<(), RegisterError> {
        let expected = index.encoding();
        let actual = value.encoding();
        if expected != actual {
            return Err(RegisterError::TypeMismatch {
                index,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for RegisterTable {
    fn default() -> Self {
        Self::broadcast()
    }
}
