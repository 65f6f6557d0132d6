//! Error types
//!
//! Configuration errors are fatal and surface from constructors. Sensor
//! errors are absorbed by the control loop.

use thiserror::Error;

/// Invalid construction-time configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid plant constant {name} = {value}: {reason}")]
    InvalidPlant {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("{name} must be finite and > 0, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("voltage limit [{min}, {max}] is empty or non-finite")]
    InvalidVoltageLimit { min: f64, max: f64 },
    #[error("voltage limit magnitude {limit} V exceeds the hardware maximum of {hardware} V")]
    ExceedsHardware { limit: f64, hardware: f64 },
    #[error("{0} Riccati equation has no stabilizing solution")]
    RiccatiDiverged(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A failed read from the velocity sensor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("sensor did not respond")]
    Timeout,
    #[error("sensor returned a non-finite reading: {0}")]
    NonFinite(f64),
    #[error("sensor fault: {0}")]
    Fault(String),
}

/// Ensure a configuration value is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("x", 1.0).is_ok());
        assert_eq!(
            ensure_positive("x", 0.0),
            Err(ConfigError::NonPositive { name: "x", value: 0.0 })
        );
        assert!(ensure_positive("x", f64::NAN).is_err());
        assert!(ensure_positive("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::ExceedsHardware {
            limit: 24.0,
            hardware: 12.0,
        };
        assert_eq!(
            err.to_string(),
            "voltage limit magnitude 24 V exceeds the hardware maximum of 12 V"
        );
        assert_eq!(SensorError::Timeout.to_string(), "sensor did not respond");
    }
}
