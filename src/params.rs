//! Outtake parameters
//!
//! Construction-time constants for the flywheel loop. Everything here is
//! fixed for the lifetime of the subsystem.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, ConfigError};

/// Volts per (radian per second), from characterization
pub const FLYWHEEL_KV: f64 = 0.099912;
/// Volts per (radian per second squared), from characterization
pub const FLYWHEEL_KA: f64 = 0.0077474;
/// Nominal scheduler period [s]
pub const LOOP_PERIOD: f64 = 0.020;
/// Approximate battery voltage [V]
pub const BATTERY_VOLTAGE: f64 = 12.0;

/// Characterized flywheel constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantParameters {
    /// Volts per (rad/s)
    pub kv: f64,
    /// Volts per (rad/s^2)
    pub ka: f64,
}

impl PlantParameters {
    pub fn new(kv: f64, ka: f64) -> Self {
        Self { kv, ka }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ka.is_finite() || self.ka <= 0.0 {
            return Err(ConfigError::InvalidPlant {
                name: "ka",
                value: self.ka,
                reason: "must be finite and > 0",
            });
        }
        if !self.kv.is_finite() || self.kv < 0.0 {
            return Err(ConfigError::InvalidPlant {
                name: "kv",
                value: self.kv,
                reason: "must be finite and >= 0",
            });
        }
        Ok(())
    }
}

impl Default for PlantParameters {
    fn default() -> Self {
        Self::new(FLYWHEEL_KV, FLYWHEEL_KA)
    }
}

/// Kalman filter noise model, as standard deviations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorNoiseModel {
    /// How accurate we think the model is [rad/s]
    pub process_noise: f64,
    /// How accurate we think the encoder is [rad/s]
    pub measurement_noise: f64,
}

impl EstimatorNoiseModel {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("process_noise", self.process_noise)?;
        ensure_positive("measurement_noise", self.measurement_noise)
    }
}

impl Default for EstimatorNoiseModel {
    fn default() -> Self {
        Self::new(3.0, 0.01)
    }
}

/// LQR cost weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerGains {
    /// Q, penalty on velocity error
    pub state_cost_weight: f64,
    /// R, penalty on control effort
    pub control_cost_weight: f64,
}

impl ControllerGains {
    pub fn new(state_cost_weight: f64, control_cost_weight: f64) -> Self {
        Self {
            state_cost_weight,
            control_cost_weight,
        }
    }

    /// Bryson's rule: weight each term by the inverse square of its
    /// acceptable excursion.
    ///
    /// Decreasing `state_tolerance` makes the controller more aggressive;
    /// decreasing `control_tolerance` makes it less aggressive.
    pub fn from_tolerances(state_tolerance: f64, control_tolerance: f64) -> Self {
        Self::new(
            1.0 / (state_tolerance * state_tolerance),
            1.0 / (control_tolerance * control_tolerance),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("state_cost_weight", self.state_cost_weight)?;
        ensure_positive("control_cost_weight", self.control_cost_weight)
    }
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self::from_tolerances(8.0, BATTERY_VOLTAGE)
    }
}

/// Saturation bounds applied to every computed voltage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageLimit {
    pub min: f64,
    pub max: f64,
}

impl VoltageLimit {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn symmetric(max: f64) -> Self {
        Self::new(-max, max)
    }

    pub fn clamp(&self, volts: f64) -> f64 {
        volts.clamp(self.min, self.max)
    }

    pub fn magnitude(&self) -> f64 {
        self.min.abs().max(self.max.abs())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(ConfigError::InvalidVoltageLimit {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for VoltageLimit {
    fn default() -> Self {
        Self::symmetric(BATTERY_VOLTAGE)
    }
}

/// Full construction-time configuration of the outtake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OuttakeConfig {
    pub plant: PlantParameters,
    pub noise: EstimatorNoiseModel,
    pub gains: ControllerGains,
    /// Fixed control period [s]
    pub loop_period: f64,
    pub voltage_limit: VoltageLimit,
    /// Prior estimate uncertainty [(rad/s)^2]
    pub initial_covariance: f64,
    /// Raw encoder units to rad/s
    pub encoder_scale: f64,
    /// Added to every non-zero target before it reaches the loop [rad/s]
    pub spinup_offset: f64,
    /// Readiness band as a fraction of the target
    pub target_tolerance: f64,
    pub feed_wheel_inverted: bool,
    /// Physical saturation of the flywheel motor [V]
    pub hardware_voltage_max: f64,
}

impl Default for OuttakeConfig {
    fn default() -> Self {
        Self {
            plant: PlantParameters::default(),
            noise: EstimatorNoiseModel::default(),
            gains: ControllerGains::default(),
            loop_period: LOOP_PERIOD,
            voltage_limit: VoltageLimit::default(),
            initial_covariance: 100.0,
            encoder_scale: 1.0,
            spinup_offset: 0.0,
            target_tolerance: 0.05,
            feed_wheel_inverted: true,
            hardware_voltage_max: BATTERY_VOLTAGE,
        }
    }
}

impl OuttakeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plant.validate()?;
        self.noise.validate()?;
        self.gains.validate()?;
        ensure_positive("loop_period", self.loop_period)?;
        self.voltage_limit.validate()?;
        ensure_positive("hardware_voltage_max", self.hardware_voltage_max)?;
        if self.voltage_limit.magnitude() > self.hardware_voltage_max {
            return Err(ConfigError::ExceedsHardware {
                limit: self.voltage_limit.magnitude(),
                hardware: self.hardware_voltage_max,
            });
        }
        if !self.initial_covariance.is_finite() || self.initial_covariance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_covariance must be finite and >= 0, got {}",
                self.initial_covariance
            )));
        }
        ensure_positive("encoder_scale", self.encoder_scale)?;
        if !self.spinup_offset.is_finite() {
            return Err(ConfigError::Invalid(
                "spinup_offset must be finite".to_string(),
            ));
        }
        if !(self.target_tolerance > 0.0 && self.target_tolerance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "target_tolerance must be in (0, 1), got {}",
                self.target_tolerance
            )));
        }
        Ok(())
    }

    /// Same configuration with a wider supply, e.g. for bench rigs.
    pub fn with_supply(mut self, volts: f64) -> Self {
        self.voltage_limit = VoltageLimit::symmetric(volts);
        self.hardware_voltage_max = volts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OuttakeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bryson_rule() {
        let gains = ControllerGains::from_tolerances(8.0, 12.0);
        assert_relative_eq!(gains.state_cost_weight, 1.0 / 64.0);
        assert_relative_eq!(gains.control_cost_weight, 1.0 / 144.0);
    }

    #[test]
    fn test_plant_rejects_non_positive_ka() {
        assert!(PlantParameters::new(0.1, 0.0).validate().is_err());
        assert!(PlantParameters::new(0.1, -1.0).validate().is_err());
        assert!(PlantParameters::new(-0.1, 0.01).validate().is_err());
        assert!(PlantParameters::new(0.0, 0.01).validate().is_ok());
    }

    #[test]
    fn test_noise_and_gains_must_be_positive() {
        assert!(EstimatorNoiseModel::new(0.0, 0.01).validate().is_err());
        assert!(EstimatorNoiseModel::new(3.0, -0.01).validate().is_err());
        assert!(ControllerGains::new(1.0, 0.0).validate().is_err());
        assert!(ControllerGains::new(f64::NAN, 1.0).validate().is_err());
    }

    #[test]
    fn test_voltage_limit_clamp() {
        let limit = VoltageLimit::default();
        assert_eq!(limit.clamp(20.0), 12.0);
        assert_eq!(limit.clamp(-20.0), -12.0);
        assert_eq!(limit.clamp(3.0), 3.0);
        assert!(VoltageLimit::new(5.0, 5.0).validate().is_err());
    }

    #[test]
    fn test_limit_above_hardware_rejected() {
        let cfg = OuttakeConfig {
            voltage_limit: VoltageLimit::symmetric(24.0),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ExceedsHardware { .. })
        ));
        assert!(cfg.with_supply(24.0).validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: OuttakeConfig = serde_json::from_str(r#"{ "loop_period": 0.01 }"#).unwrap();
        assert_eq!(cfg.loop_period, 0.01);
        assert_eq!(cfg.plant, PlantParameters::default());
        assert!(cfg.feed_wheel_inverted);
    }
}
