//! Typed register values
//!
//! Every register carries one of five fixed little-endian encodings.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::RegisterError;

/// Wire encoding of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldEncoding {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 32-bit integer
    I32,
    /// 32-bit IEEE float
    F32,
}

impl FieldEncoding {
    /// Number of bytes this encoding occupies on the wire
    pub const fn byte_width(self) -> usize {
        match self {
            FieldEncoding::U8 => 1,
            FieldEncoding::U16 => 2,
            FieldEncoding::U32 | FieldEncoding::I32 | FieldEncoding::F32 => 4,
        }
    }

    /// The zero value of this encoding
    pub const fn zero(self) -> RegisterValue {
        match self {
            FieldEncoding::U8 => RegisterValue::U8(0),
            FieldEncoding::U16 => RegisterValue::U16(0),
            FieldEncoding::U32 => RegisterValue::U32(0),
            FieldEncoding::I32 => RegisterValue::I32(0),
            FieldEncoding::F32 => RegisterValue::F32(0.0),
        }
    }

    /// Decode a value from the start of `bytes`
    pub fn decode(self, bytes: &[u8]) -> Result<RegisterValue, RegisterError> {
        let width = self.byte_width();
        if bytes.len() < width {
            return Err(RegisterError::Truncated {
                needed: width,
                available: bytes.len(),
            });
        }

        let value = match self {
            FieldEncoding::U8 => RegisterValue::U8(bytes[0]),
            FieldEncoding::U16 => RegisterValue::U16(LittleEndian::read_u16(bytes)),
            FieldEncoding::U32 => RegisterValue::U32(LittleEndian::read_u32(bytes)),
            FieldEncoding::I32 => RegisterValue::I32(LittleEndian::read_i32(bytes)),
            FieldEncoding::F32 => RegisterValue::F32(LittleEndian::read_f32(bytes)),
        };
        Ok(value)
    }
}

impl fmt::Display for FieldEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldEncoding::U8 => "u8",
            FieldEncoding::U16 => "u16",
            FieldEncoding::U32 => "u32",
            FieldEncoding::I32 => "i32",
            FieldEncoding::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// A value held by a register
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegisterValue {
    /// Unsigned byte
    U8(u8),
    /// Unsigned 16-bit
    U16(u16),
    /// Unsigned 32-bit
    U32(u32),
    /// Signed 32-bit
    I32(i32),
    /// IEEE-754 single
    F32(f32),
}

impl RegisterValue {
    /// The encoding this value serializes with
    pub fn encoding(&self) -> FieldEncoding {
        match self {
            RegisterValue::U8(_) => FieldEncoding::U8,
            RegisterValue::U16(_) => FieldEncoding::U16,
            RegisterValue::U32(_) => FieldEncoding::U32,
            RegisterValue::I32(_) => FieldEncoding::I32,
            RegisterValue::F32(_) => FieldEncoding::F32,
        }
    }

    /// Append the little-endian bytes of this value to `out`
    pub fn write_le(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        let width = self.encoding().byte_width();
        match *self {
            RegisterValue::U8(v) => buf[0] = v,
            RegisterValue::U16(v) => LittleEndian::write_u16(&mut buf, v),
            RegisterValue::U32(v) => LittleEndian::write_u32(&mut buf, v),
            RegisterValue::I32(v) => LittleEndian::write_i32(&mut buf, v),
            RegisterValue::F32(v) => LittleEndian::write_f32(&mut buf, v),
        }
        out.extend_from_slice(&buf[..width]);
    }

    /// The value if it is a `U8`
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            RegisterValue::U8(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is a `U16`
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            RegisterValue::U16(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is a `U32`
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            RegisterValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is an `I32`
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            RegisterValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The value if it is an `F32`
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            RegisterValue::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<u8> for RegisterValue {
    fn from(v: u8) -> Self {
        RegisterValue::U8(v)
    }
}

impl From<bool> for RegisterValue {
    fn from(v: bool) -> Self {
        RegisterValue::U8(v as u8)
    }
}

impl From<u16> for RegisterValue {
    fn from(v: u16) -> Self {
        RegisterValue::U16(v)
    }
}

impl From<u32> for RegisterValue {
    fn from(v: u32) -> Self {
        RegisterValue::U32(v)
    }
}

impl From<i32> for RegisterValue {
    fn from(v: i32) -> Self {
        RegisterValue::I32(v)
    }
}

impl From<f32> for RegisterValue {
    fn from(v: f32) -> Self {
        RegisterValue::F32(v)
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::U8(v) => write!(f, "{v}"),
            RegisterValue::U16(v) => write!(f, "{v}"),
            RegisterValue::U32(v) => write!(f, "{v}"),
            RegisterValue::I32(v) => write!(f, "{v}"),
            RegisterValue::F32(v) => write!(f, "{v}"),
        }
    }
}
