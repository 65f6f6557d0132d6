//! Hardware abstraction traits
//!
//! The motor controller SDKs live outside this crate. These traits are the
//! seams the subsystem drives, so the same code runs on real hardware or
//! against [`crate::sim::SimulatedFlywheel`].

use crate::error::SensorError;

/// Source of flywheel velocity feedback (encoder)
pub trait VelocitySensor {
    /// Current velocity in the encoder's raw units
    fn velocity(&self) -> Result<f64, SensorError>;
}

/// Voltage-commanded motor
pub trait VoltageActuator {
    fn set_voltage(&mut self, volts: f64);
}

/// Duty-cycle commanded motor, `percent` in [-1, 1]
pub trait PercentActuator {
    fn set_percent(&mut self, percent: f64);
}

/// Feed wheel that records the last command, for tests and simulation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordingMotor {
    pub last_percent: f64,
    pub commands: u64,
}

impl PercentActuator for RecordingMotor {
    fn set_percent(&mut self, percent: f64) {
        self.last_percent = percent;
        self.commands += 1;
    }
}
