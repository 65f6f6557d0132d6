//! Linear-quadratic regulator for the flywheel
//!
//! The feedback gain `K` is solved once from the DARE. Each cycle the
//! output is `K (r - x̂)` plus the plant-inversion feedforward that holds
//! `r`, hard-clamped into the voltage limit.

use crate::error::ConfigError;
use crate::params::{ControllerGains, VoltageLimit};
use crate::plant::PlantModel;
use crate::riccati::solve_dare;

/// LQR with plant-inversion feedforward
#[derive(Debug, Clone, Copy)]
pub struct LinearQuadraticRegulator {
    plant: PlantModel,
    k: f64,
    limit: VoltageLimit,
}

impl LinearQuadraticRegulator {
    pub fn new(
        plant: PlantModel,
        gains: ControllerGains,
        limit: VoltageLimit,
    ) -> Result<Self, ConfigError> {
        gains.validate()?;
        limit.validate()?;

        let (a, b) = (plant.a(), plant.b());
        let (q, r) = (gains.state_cost_weight, gains.control_cost_weight);
        let p = solve_dare(a, b, q, r).ok_or(ConfigError::RiccatiDiverged("controller"))?;
        let k = b * p * a / (r + b * b * p);

        // The closed loop must be strictly stable for the gain to be usable.
        if !k.is_finite() || (a - b * k).abs() >= 1.0 {
            return Err(ConfigError::RiccatiDiverged("controller"));
        }

        Ok(Self { plant, k, limit })
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn limit(&self) -> VoltageLimit {
        self.limit
    }

    /// Closed-loop pole `Ad - Bd K`
    pub fn closed_loop_pole(&self) -> f64 {
        self.plant.a() - self.plant.b() * self.k
    }

    /// Voltage before saturation
    pub fn unclamped_voltage(&self, estimate: f64, reference: f64) -> f64 {
        self.k * (reference - estimate) + self.plant.holding_voltage(reference)
    }

    /// Clamped voltage for the current estimate and reference
    pub fn compute_voltage(&self, estimate: f64, reference: f64) -> f64 {
        self.limit.clamp(self.unclamped_voltage(estimate, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PlantParameters;
    use approx::assert_relative_eq;

    fn default_plant() -> PlantModel {
        PlantModel::identify_velocity_system(PlantParameters::default(), 0.020).unwrap()
    }

    fn default_lqr() -> LinearQuadraticRegulator {
        LinearQuadraticRegulator::new(
            default_plant(),
            ControllerGains::default(),
            VoltageLimit::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_gain_is_positive_and_stabilizing() {
        let lqr = default_lqr();
        assert!(lqr.k() > 0.0);
        assert!(lqr.closed_loop_pole().abs() < 1.0);
        assert_relative_eq!(lqr.k(), 0.3138, epsilon = 1e-3);
    }

    #[test]
    fn test_holding_at_reference_needs_only_feedforward() {
        let lqr = default_lqr();
        assert_relative_eq!(
            lqr.compute_voltage(100.0, 100.0),
            0.099912 * 100.0,
            epsilon = 1e-9
        );
        assert_eq!(lqr.compute_voltage(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_output_is_clamped() {
        let lqr = default_lqr();
        assert_eq!(lqr.compute_voltage(0.0, 1_000.0), 12.0);
        assert_eq!(lqr.compute_voltage(1_000.0, 0.0), -12.0);
        assert!(lqr.unclamped_voltage(0.0, 1_000.0) > 12.0);
    }

    #[test]
    fn test_heavier_effort_penalty_lowers_gain() {
        let plant = default_plant();
        let soft = LinearQuadraticRegulator::new(
            plant,
            ControllerGains::from_tolerances(8.0, 2.0),
            VoltageLimit::default(),
        )
        .unwrap();
        assert!(soft.k() < default_lqr().k());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let err = LinearQuadraticRegulator::new(
            default_plant(),
            ControllerGains::new(0.0, 1.0),
            VoltageLimit::default(),
        );
        assert!(err.is_err());
    }
}
