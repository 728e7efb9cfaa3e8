//! Register layout of the Red motor driver
//!
//! The ordinal of each [`Index`] variant is the wire-level register address.
//! Declaration order below must match the firmware's register table exactly.

use serde::{Deserialize, Serialize};

use super::{FieldEncoding, RegisterError};

macro_rules! register_layout {
    ($($name:ident : $enc:ident),+ $(,)?) => {
        /// Register addresses, in firmware order
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum Index {
            $(
                #[allow(missing_docs)]
                $name,
            )+
        }

        impl Index {
            /// Every register, ordered by address
            pub const ALL: &'static [Index] = &[$(Index::$name),+];

            /// Wire encoding of the register
            pub const fn encoding(self) -> FieldEncoding {
                match self {
                    $(Index::$name => FieldEncoding::$enc,)+
                }
            }

            /// Register name as used in logs
            pub const fn name(self) -> &'static str {
                match self {
                    $(Index::$name => stringify!($name),)+
                }
            }
        }
    };
}

register_layout! {
    Header: U8,
    DeviceId: U8,
    DeviceFamily: U8,
    PackageSize: U8,
    Command: U8,
    Status: U8,
    HardwareVersion: U32,
    SoftwareVersion: U32,
    Baudrate: U32,
    OperationMode: U8,
    TorqueEnable: U8,
    TunerEnable: U8,
    TunerMethod: U8,
    OutputShaftCpr: F32,
    OutputShaftRpm: F32,
    UserIndicator: U8,
    MinimumPositionLimit: I32,
    MaximumPositionLimit: I32,
    TorqueLimit: U16,
    VelocityLimit: U16,
    PositionFf: F32,
    VelocityFf: F32,
    TorqueFf: F32,
    PositionDeadband: F32,
    VelocityDeadband: F32,
    TorqueDeadband: F32,
    PositionOutputLimit: F32,
    VelocityOutputLimit: F32,
    TorqueOutputLimit: F32,
    PositionScalerGain: F32,
    PositionPGain: F32,
    PositionIGain: F32,
    PositionDGain: F32,
    VelocityScalerGain: F32,
    VelocityPGain: F32,
    VelocityIGain: F32,
    VelocityDGain: F32,
    TorqueScalerGain: F32,
    TorquePGain: F32,
    TorqueIGain: F32,
    TorqueDGain: F32,
    SetPosition: F32,
    SetVelocity: F32,
    SetTorque: F32,
    SetDutyCycle: F32,
    Id11Buzzer: U8,
    Id12Buzzer: U8,
    Id13Buzzer: U8,
    Id14Buzzer: U8,
    Id15Buzzer: U8,
    PresentPosition: F32,
    PresentVelocity: F32,
    MotorCurrent: F32,
    AnalogPort: U16,
    RollAngle: F32,
    PitchAngle: F32,
    Id1Button: U8,
    Id2Button: U8,
    Id3Button: U8,
    Id4Button: U8,
    Id5Button: U8,
    Id6Light: U16,
    Id7Light: U16,
    Id8Light: U16,
    Id9Light: U16,
    Id10Light: U16,
    Id16JoystickX: F32,
    Id16JoystickY: F32,
    Id16JoystickButton: U8,
    Id17JoystickX: F32,
    Id17JoystickY: F32,
    Id17JoystickButton: U8,
    Id18JoystickX: F32,
    Id18JoystickY: F32,
    Id18JoystickButton: U8,
    Id19JoystickX: F32,
    Id19JoystickY: F32,
    Id19JoystickButton: U8,
    Id20JoystickX: F32,
    Id20JoystickY: F32,
    Id20JoystickButton: U8,
    Id21Distance: U16,
    Id22Distance: U16,
    Id23Distance: U16,
    Id24Distance: U16,
    Id25Distance: U16,
    Id26Qtr: U8,
    Id27Qtr: U8,
    Id28Qtr: U8,
    Id29Qtr: U8,
    Id30Qtr: U8,
    Id31Servo: U8,
    Id32Servo: U8,
    Id33Servo: U8,
    Id34Servo: U8,
    Id35Servo: U8,
    Id36Pot: U16,
    Id37Pot: U16,
    Id38Pot: U16,
    Id39Pot: U16,
    Id40Pot: U16,
    CrcValue: U32,
}

/// Number of registers in the layout
pub const REGISTER_COUNT: usize = Index::ALL.len();

impl Index {
    /// Wire address of the register
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Width in bytes of the register's encoding
    pub const fn byte_width(self) -> usize {
        self.encoding().byte_width()
    }

    /// Fixed constants cannot be set by the host
    pub const fn is_fixed(self) -> bool {
        matches!(self, Index::Header | Index::DeviceFamily)
    }

    /// Registers serialised into every frame header
    pub const fn is_header(self) -> bool {
        (self as u8) <= Index::Status as u8
    }
}

impl TryFrom<u8> for Index {
    type Error = RegisterError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        Index::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or(RegisterError::UnknownIndex(ordinal))
    }
}

impl From<Index> for u8 {
    fn from(index: Index) -> u8 {
        index.ordinal()
    }
}
