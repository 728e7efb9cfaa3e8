//! Register Model
//!
//! Typed, indexed view of a driver's register set. The register layout is
//! fixed per product type; the host keeps one [`RegisterTable`] per driver.

mod error;
mod layout;
mod modes;
mod table;
mod values;

pub use error::RegisterError;
pub use layout::{Index, REGISTER_COUNT};
pub use modes::{OperationMode, TuningMethod};
pub use table::RegisterTable;
pub use values::{FieldEncoding, RegisterValue};
