//! Kalman filter velocity estimator
//!
//! Fuses the plant's one-step prediction with encoder measurements. The
//! gain is recomputed each cycle from the propagated error covariance and
//! converges to the steady-state gain of the filter DARE.

use crate::error::{ensure_positive, ConfigError};
use crate::params::EstimatorNoiseModel;
use crate::plant::PlantModel;
use crate::riccati::solve_dare;
use crate::state::EstimatorState;

/// Scalar Kalman filter
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    plant: PlantModel,
    /// Discretized process noise covariance
    q: f64,
    /// Discretized measurement noise covariance
    r: f64,
    initial_covariance: f64,
    state: EstimatorState,
}

impl KalmanFilter {
    /// Create a filter for `plant` with the noise given as standard deviations
    pub fn new(
        plant: PlantModel,
        noise: EstimatorNoiseModel,
        initial_covariance: f64,
    ) -> Result<Self, ConfigError> {
        noise.validate()?;
        if !initial_covariance.is_finite() || initial_covariance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_covariance must be finite and >= 0, got {initial_covariance}"
            )));
        }

        let period = plant.period();
        let cont_q = noise.process_noise * noise.process_noise;
        let cont_r = noise.measurement_noise * noise.measurement_noise;

        // Qd = integral over [0, T] of e^(Ac t) Q e^(Ac t)
        let a_c = plant.continuous_a();
        let q = if a_c.abs() < f64::EPSILON {
            cont_q * period
        } else {
            cont_q * (plant.a() * plant.a() - 1.0) / (2.0 * a_c)
        };
        let r = cont_r / period;
        ensure_positive("discrete process noise", q)?;
        ensure_positive("discrete measurement noise", r)?;

        let filter = Self {
            plant,
            q,
            r,
            initial_covariance,
            state: EstimatorState::new(0.0, initial_covariance),
        };
        filter.steady_state_gain()?;
        Ok(filter)
    }

    /// Fold in the current measurement. Call before `predict` each cycle.
    pub fn correct(&mut self, measurement: f64, applied_voltage: f64) {
        let c = self.plant.c();
        let p = self.state.error_covariance;
        let innovation_cov = c * c * p + self.r;
        let gain = p * c / innovation_cov;
        let residual = measurement - self.plant.output(self.state.estimate, applied_voltage);

        self.state.estimate += gain * residual;
        self.state.error_covariance = ((1.0 - gain * c) * p).max(0.0);
    }

    /// Propagate one period forward under the voltage just commanded
    pub fn predict(&mut self, applied_voltage: f64) {
        let a = self.plant.a();
        self.state.estimate = self.plant.step(self.state.estimate, applied_voltage);
        self.state.error_covariance = (a * a * self.state.error_covariance + self.q).max(0.0);
    }

    /// Gain the recursion converges to
    pub fn steady_state_gain(&self) -> Result<f64, ConfigError> {
        let c = self.plant.c();
        let p = solve_dare(self.plant.a(), c, self.q, self.r)
            .ok_or(ConfigError::RiccatiDiverged("estimator"))?;
        Ok(p * c / (c * c * p + self.r))
    }

    /// Current gain given the prior covariance
    pub fn gain(&self) -> f64 {
        let c = self.plant.c();
        let p = self.state.error_covariance;
        p * c / (c * c * p + self.r)
    }

    pub fn reset(&mut self) {
        self.state = EstimatorState::new(0.0, self.initial_covariance);
    }

    pub fn estimate(&self) -> f64 {
        self.state.estimate
    }

    pub fn error_covariance(&self) -> f64 {
        self.state.error_covariance
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }
}
