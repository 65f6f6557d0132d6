//! Flywheel plant model
//!
//! State: [velocity] in rad/s. Input: [voltage] in V. Output: [velocity]
//! in rad/s. The continuous model is
//! `velocity' = -(kV/kA) velocity + (1/kA) voltage`, discretized exactly
//! with a zero-order hold over the loop period.

use crate::error::{ensure_positive, ConfigError};
use crate::params::PlantParameters;

/// Discrete-time scalar state-space model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantModel {
    /// Continuous state coefficient
    a_c: f64,
    /// Continuous input coefficient
    b_c: f64,
    /// Discrete state transition
    a: f64,
    /// Discrete input
    b: f64,
    c: f64,
    d: f64,
    period: f64,
}

impl PlantModel {
    /// Identify a velocity system from characterization constants
    pub fn identify_velocity_system(
        params: PlantParameters,
        period: f64,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        ensure_positive("loop_period", period)?;

        let a_c = -params.kv / params.ka;
        let b_c = 1.0 / params.ka;
        let a = (a_c * period).exp();
        // ZOH: Bd = Ac^-1 (Ad - 1) Bc, which tends to Bc T as Ac -> 0
        let b = if a_c.abs() < f64::EPSILON {
            b_c * period
        } else {
            (a - 1.0) / a_c * b_c
        };

        if !(a.is_finite() && b.is_finite()) {
            return Err(ConfigError::InvalidPlant {
                name: "ka",
                value: params.ka,
                reason: "discretization is not finite",
            });
        }

        Ok(Self {
            a_c,
            b_c,
            a,
            b,
            c: 1.0,
            d: 0.0,
            period,
        })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn d(&self) -> f64 {
        self.d
    }

    pub fn continuous_a(&self) -> f64 {
        self.a_c
    }

    pub fn continuous_b(&self) -> f64 {
        self.b_c
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Advance the state one period under a constant input
    pub fn step(&self, velocity: f64, voltage: f64) -> f64 {
        self.a * velocity + self.b * voltage
    }

    /// Measured output for a state and input
    pub fn output(&self, velocity: f64, voltage: f64) -> f64 {
        self.c * velocity + self.d * voltage
    }

    /// Voltage that holds `velocity` constant, if the input has authority
    pub fn holding_voltage(&self, velocity: f64) -> f64 {
        if self.b.abs() < f64::EPSILON {
            0.0
        } else {
            (velocity - self.a * velocity) / self.b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_plant() -> PlantModel {
        PlantModel::identify_velocity_system(PlantParameters::default(), 0.020).unwrap()
    }

    #[test]
    fn test_continuous_coefficients() {
        let plant = default_plant();
        assert_relative_eq!(plant.continuous_a(), -0.099912 / 0.0077474);
        assert_relative_eq!(plant.continuous_b(), 1.0 / 0.0077474);
        assert_eq!(plant.c(), 1.0);
        assert_eq!(plant.d(), 0.0);
    }

    #[test]
    fn test_discretization_is_stable() {
        let plant = default_plant();
        assert!(plant.a() > 0.0 && plant.a() < 1.0);
        assert_relative_eq!(plant.a(), 0.77266, epsilon = 1e-4);
        // Bd = (1 - Ad) / kV for this model
        assert_relative_eq!(plant.b(), (1.0 - plant.a()) / 0.099912, epsilon = 1e-9);
    }

    #[test]
    fn test_holding_voltage_is_kv_times_velocity() {
        let plant = default_plant();
        assert_relative_eq!(plant.holding_voltage(100.0), 0.099912 * 100.0, epsilon = 1e-9);
        let held = plant.step(100.0, plant.holding_voltage(100.0));
        assert_relative_eq!(held, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_kv_is_a_pure_integrator() {
        let plant =
            PlantModel::identify_velocity_system(PlantParameters::new(0.0, 0.01), 0.02).unwrap();
        assert_eq!(plant.a(), 1.0);
        assert_relative_eq!(plant.b(), 2.0);
    }

    #[test]
    fn test_invalid_constants_rejected() {
        let massless = PlantParameters::new(0.1, 0.0);
        assert!(PlantModel::identify_velocity_system(massless, 0.02).is_err());
        assert!(PlantModel::identify_velocity_system(PlantParameters::default(), 0.0).is_err());
    }
}
