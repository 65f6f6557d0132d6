//! Outtake subsystem
//!
//! Owns the flywheel loop and the two motors. The host scheduler calls
//! [`Outtake::periodic`] once per loop period; that is the only place the
//! loop advances. Everything else only sets targets or reads state.

use crate::control_loop::{ControlLoop, TickOutput};
use crate::error::ConfigError;
use crate::hardware::{PercentActuator, VelocitySensor, VoltageActuator};
use crate::params::OuttakeConfig;
use crate::state::LoopMode;

/// Flywheel plus feed wheel
#[derive(Debug)]
pub struct Outtake<F, W> {
    flywheel: F,
    feed_wheel: W,
    control: ControlLoop,
    feed_wheel_inverted: bool,
}

impl<F, W> Outtake<F, W>
where
    F: VelocitySensor + VoltageActuator,
    W: PercentActuator,
{
    /// Build the subsystem. Fails on any invalid configuration.
    pub fn new(config: &OuttakeConfig, flywheel: F, feed_wheel: W) -> Result<Self, ConfigError> {
        let control = ControlLoop::new(config)?;
        let k_kalman = control.observer().steady_state_gain()?;

        tracing::info!(
            k_lqr = control.controller().k(),
            k_kalman,
            ad = control.plant().a(),
            bd = control.plant().b(),
            "outtake flywheel loop ready"
        );

        Ok(Self {
            flywheel,
            feed_wheel,
            control,
            feed_wheel_inverted: config.feed_wheel_inverted,
        })
    }

    /// Open-loop feed wheel command, clamped into [-1, 1]
    pub fn spin_feed_wheel(&mut self, percent: f64) {
        let clamped = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(-1.0, 1.0)
        };
        if clamped != percent {
            tracing::debug!(requested = percent, clamped, "feed wheel command clamped");
        }
        let output = if self.feed_wheel_inverted {
            -clamped
        } else {
            clamped
        };
        self.feed_wheel.set_percent(output);
    }

    pub fn stop_feed_wheel(&mut self) {
        self.feed_wheel.set_percent(0.0);
    }

    /// Track `target` rad/s from the next period on
    pub fn spin_flywheel(&mut self, target: f64) {
        self.control.set_target(target);
    }

    /// Spin down to rest
    pub fn stop_flywheel(&mut self) {
        self.control.set_target(0.0);
    }

    /// Measured flywheel velocity [rad/s]
    ///
    /// Falls back to the estimate when the encoder cannot be read.
    pub fn current_velocity(&self) -> f64 {
        match self.control.measure(&self.flywheel) {
            Ok(velocity) => velocity,
            Err(err) => {
                tracing::debug!("Using estimate, encoder unavailable: {}", err);
                self.control.estimate()
            }
        }
    }

    /// Ready signal: measured velocity within tolerance of a non-zero target
    pub fn reached_target(&self) -> bool {
        self.control.reached_target(self.current_velocity())
    }

    /// Scheduler hook, once per loop period
    pub fn periodic(&mut self) -> TickOutput {
        self.control.tick(&mut self.flywheel)
    }

    /// Re-seed the estimator, e.g. after the robot was disabled
    pub fn reset(&mut self) {
        self.control.reset();
    }

    pub fn target(&self) -> f64 {
        self.control.target()
    }

    pub fn mode(&self) -> LoopMode {
        self.control.mode()
    }

    pub fn estimate(&self) -> f64 {
        self.control.estimate()
    }

    pub fn last_applied_voltage(&self) -> f64 {
        self.control.last_applied_voltage()
    }

    pub fn control_loop(&self) -> &ControlLoop {
        &self.control
    }

    pub fn flywheel(&self) -> &F {
        &self.flywheel
    }

    pub fn flywheel_mut(&mut self) -> &mut F {
        &mut self.flywheel
    }

    pub fn feed_wheel(&self) -> &W {
        &self.feed_wheel
    }
}
