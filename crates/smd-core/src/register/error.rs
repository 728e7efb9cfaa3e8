//! Register model errors

use thiserror::Error;

use super::{FieldEncoding, Index};

/// Errors raised by the register table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegisterError {
    /// Ordinal outside the layout
    #[error("Register index {0} is not defined for this product")]
    UnknownIndex(u8),

    /// Fixed register
    #[error("Register {0:?} is a fixed constant and cannot be written")]
    ReadOnly(Index),

    /// Value encoding differs from the register's
    #[error("Register {index:?} holds {expected}, got {actual}")]
    TypeMismatch {
        /// Register written
        index: Index,
        /// Encoding of the register
        expected: FieldEncoding,
        /// Encoding of the value given
        actual: FieldEncoding,
    },

    /// Not enough bytes left for the value
    #[error("Truncated register value: need {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the encoding needs
        needed: usize,
        /// Bytes left in the payload
        available: usize,
    },
}
