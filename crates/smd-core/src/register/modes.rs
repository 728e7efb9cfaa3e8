//! Enumerated register values

use serde::{Deserialize, Serialize};

use super::RegisterValue;

/// Control mode selected through [`Index::OperationMode`](super::Index::OperationMode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationMode {
    /// Open-loop duty cycle
    Pwm = 0,
    /// Closed-loop position
    Position = 1,
    /// Closed-loop velocity
    Velocity = 2,
    /// Closed-loop torque (motor current)
    Torque = 3,
}

impl OperationMode {
    /// Decode the register value
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(OperationMode::Pwm),
            1 => Some(OperationMode::Position),
            2 => Some(OperationMode::Velocity),
            3 => Some(OperationMode::Torque),
            _ => None,
        }
    }
}

impl From<OperationMode> for RegisterValue {
    fn from(mode: OperationMode) -> Self {
        RegisterValue::U8(mode as u8)
    }
}

/// PID auto-tuning rule selected through [`Index::TunerMethod`](super::Index::TunerMethod)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TuningMethod {
    /// Ziegler-Nichols rule
    ZieglerNichols = 0,
    /// Cohen-Coon rule
    #[default]
    CohenCoon = 1,
}

impl From<TuningMethod> for RegisterValue {
    fn from(method: TuningMethod) -> Self {
        RegisterValue::U8(method as u8)
    }
}
