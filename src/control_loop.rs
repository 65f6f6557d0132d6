//! State-space control loop
//!
//! Combines the plant, the Kalman filter and the LQR. Callers only set a
//! target and tick; the estimator's correct/predict primitives stay
//! private so the cycle order cannot be broken:
//!
//! 1. read the measured velocity
//! 2. correct the estimate with it
//! 3. compute the clamped voltage from the corrected estimate
//! 4. predict the next state with that voltage
//! 5. apply the voltage

use serde::{Deserialize, Serialize};

use crate::controller::LinearQuadraticRegulator;
use crate::error::{ConfigError, SensorError};
use crate::estimator::KalmanFilter;
use crate::hardware::{VelocitySensor, VoltageActuator};
use crate::params::OuttakeConfig;
use crate::plant::PlantModel;
use crate::state::{EstimatorState, LoopMode, LoopState};

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    /// Voltage sent to the actuator [V]
    pub voltage: f64,
    /// Scaled measurement, `None` if the read failed
    pub measurement: Option<f64>,
    /// Corrected estimate the voltage was computed from [rad/s]
    pub estimate: f64,
    /// Whether the voltage limit clipped the output
    pub saturated: bool,
}

/// Flywheel velocity loop
#[derive(Debug, Clone)]
pub struct ControlLoop {
    plant: PlantModel,
    observer: KalmanFilter,
    controller: LinearQuadraticRegulator,
    state: LoopState,
    /// Requested velocity, before the spin-up offset
    target: f64,
    encoder_scale: f64,
    spinup_offset: f64,
    target_tolerance: f64,
}

impl ControlLoop {
    /// Build plant, observer and controller from `config`
    pub fn new(config: &OuttakeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let plant = PlantModel::identify_velocity_system(config.plant, config.loop_period)?;
        let observer = KalmanFilter::new(plant, config.noise, config.initial_covariance)?;
        let controller =
            LinearQuadraticRegulator::new(plant, config.gains, config.voltage_limit)?;

        Ok(Self {
            plant,
            observer,
            controller,
            state: LoopState::zero(),
            target: 0.0,
            encoder_scale: config.encoder_scale,
            spinup_offset: config.spinup_offset,
            target_tolerance: config.target_tolerance,
        })
    }

    /// Set the velocity to track; zero spins down. Takes effect on the next tick.
    ///
    /// The spin-up offset pushes the reference away from zero in the direction
    /// of `target`. Readiness is still judged against `target`, so an offset
    /// wider than `target_tolerance * |target|` settles outside the band.
    /// Non-finite targets are ignored and the previous target is kept.
    pub fn set_target(&mut self, target: f64) {
        if !target.is_finite() {
            tracing::warn!(
                requested = target,
                kept = self.target,
                "ignoring non-finite flywheel target"
            );
            return;
        }

        let previous = self.state.mode();
        self.target = target;
        self.state.reference = if target == 0.0 {
            0.0
        } else {
            target + self.spinup_offset * target.signum()
        };

        let mode = self.state.mode();
        if mode != previous {
            tracing::debug!("Flywheel loop {:?} -> {:?}", previous, mode);
        }
        if self.spinup_offset.abs() > self.target_tolerance * target.abs() {
            tracing::debug!(
                requested = target,
                offset = self.spinup_offset,
                "spin-up offset exceeds the readiness band"
            );
        }
        tracing::debug!(
            requested = target,
            reference = self.state.reference,
            "flywheel target set"
        );
    }

    /// Read a velocity from `sensor` in rad/s
    pub fn measure<S: VelocitySensor + ?Sized>(&self, sensor: &S) -> Result<f64, SensorError> {
        let raw = sensor.velocity()?;
        let velocity = raw * self.encoder_scale;
        if velocity.is_finite() {
            Ok(velocity)
        } else {
            Err(SensorError::NonFinite(raw))
        }
    }

    /// Run one control cycle against `motor`
    pub fn tick<M>(&mut self, motor: &mut M) -> TickOutput
    where
        M: VelocitySensor + VoltageActuator + ?Sized,
    {
        let measurement = self.measure(&*motor);
        let out = self.advance(measurement);
        motor.set_voltage(out.voltage);
        out
    }

    fn advance(&mut self, measurement: Result<f64, SensorError>) -> TickOutput {
        let measurement = match measurement {
            Ok(velocity) => {
                self.observer.correct(velocity, self.state.last_applied_voltage);
                Some(velocity)
            }
            Err(err) => {
                // Keep the loop alive on the model alone for this cycle.
                tracing::warn!("Flywheel velocity read failed, predicting only: {}", err);
                None
            }
        };

        let estimate = self.observer.estimate();
        let unclamped = self
            .controller
            .unclamped_voltage(estimate, self.state.reference);
        let voltage = self.controller.limit().clamp(unclamped);
        let saturated = voltage != unclamped;
        if saturated {
            tracing::trace!(unclamped, voltage, "flywheel voltage saturated");
        }

        self.observer.predict(voltage);
        self.state.last_applied_voltage = voltage;

        tracing::trace!(
            reference = self.state.reference,
            estimate,
            voltage,
            "flywheel tick"
        );

        TickOutput {
            voltage,
            measurement,
            estimate,
            saturated,
        }
    }

    /// True when `measured` is within the tolerance band of a non-zero target
    pub fn reached_target(&self, measured: f64) -> bool {
        in_band(measured, self.target, self.target_tolerance)
    }

    /// Forget the estimate and the last output; the target is kept
    pub fn reset(&mut self) {
        self.observer.reset();
        self.state.last_applied_voltage = 0.0;
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn reference(&self) -> f64 {
        self.state.reference
    }

    pub fn mode(&self) -> LoopMode {
        self.state.mode()
    }

    pub fn estimate(&self) -> f64 {
        self.observer.estimate()
    }

    pub fn estimator_state(&self) -> EstimatorState {
        self.observer.state()
    }

    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    pub fn last_applied_voltage(&self) -> f64 {
        self.state.last_applied_voltage
    }

    pub fn plant(&self) -> &PlantModel {
        &self.plant
    }

    pub fn controller(&self) -> &LinearQuadraticRegulator {
        &self.controller
    }

    pub fn observer(&self) -> &KalmanFilter {
        &self.observer
    }
}

/// `|measured - target| <= tolerance * |target|`, always false for a zero target
pub fn in_band(measured: f64, target: f64, tolerance: f64) -> bool {
    target != 0.0 && (measured - target).abs() <= tolerance * target.abs()
}
