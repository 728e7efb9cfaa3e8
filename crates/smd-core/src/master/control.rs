//! Motor control helpers
//!
//! Thin wrappers over [`Master::set_variables`] and
//! [`Master::get_variables`] for the registers applications use most.

use serde::{Deserialize, Serialize};

use super::Master;
use crate::protocol::{ProtocolError, Transport};
use crate::register::{Index, OperationMode, RegisterValue, TuningMethod};

/// Closed control loop on the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlLoop {
    /// Position loop
    Position,
    /// Velocity loop
    Velocity,
    /// Torque (current) loop
    Torque,
}

/// Tuning of one control loop; `None` fields are left untouched when writing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    /// Proportional gain
    pub p: Option<f32>,
    /// Integral gain
    pub i: Option<f32>,
    /// Derivative gain
    pub d: Option<f32>,
    /// Error band treated as zero
    pub deadband: Option<f32>,
    /// Feed-forward term
    pub ff: Option<f32>,
    /// Output clamp
    pub output_limit: Option<f32>,
}

impl ControlLoop {
    /// Registers holding P, I, D, deadband, feed-forward and output limit
    pub const fn registers(self) -> [Index; 6] {
        match self {
            ControlLoop::Position => [
                Index::PositionPGain,
                Index::PositionIGain,
                Index::PositionDGain,
                Index::PositionDeadband,
                Index::PositionFf,
                Index::PositionOutputLimit,
            ],
            ControlLoop::Velocity => [
                Index::VelocityPGain,
                Index::VelocityIGain,
                Index::VelocityDGain,
                Index::VelocityDeadband,
                Index::VelocityFf,
                Index::VelocityOutputLimit,
            ],
            ControlLoop::Torque => [
                Index::TorquePGain,
                Index::TorqueIGain,
                Index::TorqueDGain,
                Index::TorqueDeadband,
                Index::TorqueFf,
                Index::TorqueOutputLimit,
            ],
        }
    }
}

impl ControlParameters {
    fn fields(&self) -> [Option<f32>; 6] {
        [self.p, self.i, self.d, self.deadband, self.ff, self.output_limit]
    }

    /// Register writes for the fields that are set
    pub fn pairs(&self, control: ControlLoop) -> Vec<(Index, RegisterValue)> {
        control
            .registers()
            .into_iter()
            .zip(self.fields())
            .filter_map(|(index, value)| value.map(|v| (index, RegisterValue::F32(v))))
            .collect()
    }

    fn from_values(values: &[RegisterValue]) -> Self {
        let at = |n: usize| values.get(n).and_then(RegisterValue::as_f32);
        Self {
            p: at(0),
            i: at(1),
            d: at(2),
            deadband: at(3),
            ff: at(4),
            output_limit: at(5),
        }
    }
}

impl<T: Transport> Master<T> {
    fn set_one(&mut self, id: u8, index: Index, value: impl Into<RegisterValue>) -> Result<(), ProtocolError> {
        self.set_variables(id, &[(index, value.into())], false)?;
        Ok(())
    }

    fn get_one(&mut self, id: u8, index: Index) -> Result<RegisterValue, ProtocolError> {
        self.get_variables(id, &[index])?
            .into_iter()
            .next()
            .ok_or(ProtocolError::InvalidResponse)
    }

    fn get_f32(&mut self, id: u8, index: Index) -> Result<f32, ProtocolError> {
        self.get_one(id, index)?
            .as_f32()
            .ok_or(ProtocolError::InvalidResponse)
    }

    /// Enable or disable the motor output stage
    pub fn enable_torque(&mut self, id: u8, enable: bool) -> Result<(), ProtocolError> {
        self.set_one(id, Index::TorqueEnable, enable)
    }

    /// Start PID auto-tuning with `method`
    pub fn pid_tuner(&mut self, id: u8, method: TuningMethod) -> Result<(), ProtocolError> {
        self.set_one(id, Index::TunerMethod, method)?;
        self.set_one(id, Index::TunerEnable, true)
    }

    /// Select the control mode
    pub fn set_operation_mode(&mut self, id: u8, mode: OperationMode) -> Result<(), ProtocolError> {
        self.set_one(id, Index::OperationMode, mode)
    }

    /// Read back the control mode
    pub fn get_operation_mode(&mut self, id: u8) -> Result<OperationMode, ProtocolError> {
        let raw = self
            .get_one(id, Index::OperationMode)?
            .as_u8()
            .ok_or(ProtocolError::InvalidResponse)?;
        OperationMode::from_raw(raw).ok_or_else(|| {
            ProtocolError::Validation(format!("driver {} reports unknown operation mode {}", id, raw))
        })
    }

    /// Encoder counts per output shaft revolution
    pub fn set_shaft_cpr(&mut self, id: u8, cpr: f32) -> Result<(), ProtocolError> {
        self.set_one(id, Index::OutputShaftCpr, cpr)
    }

    /// Rated output shaft speed
    pub fn set_shaft_rpm(&mut self, id: u8, rpm: f32) -> Result<(), ProtocolError> {
        self.set_one(id, Index::OutputShaftRpm, rpm)
    }

    /// Flash the driver's user LED
    pub fn set_user_indicator(&mut self, id: u8) -> Result<(), ProtocolError> {
        self.set_one(id, Index::UserIndicator, 1u8)
    }

    /// Write the minimum and maximum position limits
    pub fn set_position_limits(&mut self, id: u8, min: i32, max: i32) -> Result<(), ProtocolError> {
        if min > max {
            return Err(ProtocolError::Validation(format!(
                "position limits inverted: {} > {}",
                min, max
            )));
        }
        self.set_variables(
            id,
            &[
                (Index::MinimumPositionLimit, RegisterValue::I32(min)),
                (Index::MaximumPositionLimit, RegisterValue::I32(max)),
            ],
            false,
        )?;
        Ok(())
    }

    /// Returns `(min, max)`
    pub fn get_position_limits(&mut self, id: u8) -> Result<(i32, i32), ProtocolError> {
        let values = self.get_variables(id, &[Index::MinimumPositionLimit, Index::MaximumPositionLimit])?;
        match (
            values.first().and_then(RegisterValue::as_i32),
            values.get(1).and_then(RegisterValue::as_i32),
        ) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(ProtocolError::InvalidResponse),
        }
    }

    /// Torque limit in milliamps
    /// Torque setpoint
    pub fn set_torque_limit(&mut self, id: u8, milliamps: u16) -> Result<(), ProtocolError> {
        self.set_one(id, Index::TorqueLimit, milliamps)
    }

    /// Torque limit in milliamps
    pub fn get_torque_limit(&mut self, id: u8) -> Result<u16, ProtocolError> {
        self.get_one(id, Index::TorqueLimit)?
            .as_u16()
            .ok_or(ProtocolError::InvalidResponse)
    }

    /// Velocity limit in RPM
    /// Velocity setpoint
    pub fn set_velocity_limit(&mut self, id: u8, rpm: u16) -> Result<(), ProtocolError> {
        self.set_one(id, Index::VelocityLimit, rpm)
    }

    /// Velocity limit in RPM
    pub fn get_velocity_limit(&mut self, id: u8) -> Result<u16, ProtocolError> {
        self.get_one(id, Index::VelocityLimit)?
            .as_u16()
            .ok_or(ProtocolError::InvalidResponse)
    }

    /// Position setpoint
    pub fn set_position(&mut self, id: u8, position: f32) -> Result<(), ProtocolError> {
        self.set_one(id, Index::SetPosition, position)
    }

    /// Present position
    pub fn get_position(&mut self, id: u8) -> Result<f32, ProtocolError> {
        self.get_f32(id, Index::PresentPosition)
    }

    pub fn set_velocity(&mut self, id: u8, velocity: f32) -> Result<(), ProtocolError> {
        self.set_one(id, Index::SetVelocity, velocity)
    }

    /// Present velocity
    pub fn get_velocity(&mut self, id: u8) -> Result<f32, ProtocolError> {
        self.get_f32(id, Index::PresentVelocity)
    }

    pub fn set_torque(&mut self, id: u8, torque: f32) -> Result<(), ProtocolError> {
        self.set_one(id, Index::SetTorque, torque)
    }

    /// Measured motor current
    pub fn get_torque(&mut self, id: u8) -> Result<f32, ProtocolError> {
        self.get_f32(id, Index::MotorCurrent)
    }

    /// Open-loop duty cycle, used in [`OperationMode::Pwm`]
    pub fn set_duty_cycle(&mut self, id: u8, duty_cycle: f32) -> Result<(), ProtocolError> {
        self.set_one(id, Index::SetDutyCycle, duty_cycle)
    }

    /// Raw reading of the analog input
    pub fn get_analog_port(&mut self, id: u8) -> Result<u16, ProtocolError> {
        self.get_one(id, Index::AnalogPort)?
            .as_u16()
            .ok_or(ProtocolError::InvalidResponse)
    }

    /// Write the `Some` fields of `params` to `control`
    pub fn set_control_parameters(
        &mut self,
        id: u8,
        control: ControlLoop,
        params: ControlParameters,
    ) -> Result<(), ProtocolError> {
        let pairs = params.pairs(control);
        if pairs.is_empty() {
            return Err(ProtocolError::Validation(format!(
                "no {:?} loop parameters given",
                control
            )));
        }
        self.set_variables(id, &pairs, false)?;
        Ok(())
    }

    /// Read all six parameters of `control`
    pub fn get_control_parameters(&mut self, id: u8, control: ControlLoop) -> Result<ControlParameters, ProtocolError> {
        let values = self.get_variables(id, &control.registers())?;
        Ok(ControlParameters::from_values(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_skip_unset_fields() {
        let params = ControlParameters {
            p: Some(1.5),
            d: Some(0.25),
            output_limit: Some(95.0),
            ..Default::default()
        };

        assert_eq!(
            params.pairs(ControlLoop::Velocity),
            vec![
                (Index::VelocityPGain, RegisterValue::F32(1.5)),
                (Index::VelocityDGain, RegisterValue::F32(0.25)),
                (Index::VelocityOutputLimit, RegisterValue::F32(95.0)),
            ]
        );
        assert!(ControlParameters::default().pairs(ControlLoop::Torque).is_empty());
    }

    #[test]
    fn test_loop_registers_are_f32() {
        for control in [ControlLoop::Position, ControlLoop::Velocity, ControlLoop::Torque] {
            assert!(control
                .registers()
                .iter()
                .all(|index| index.encoding() == crate::register::FieldEncoding::F32));
        }
    }
}
