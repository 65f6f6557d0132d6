//! Outtake flywheel velocity control
//!
//! A discrete-time state-space loop for a robot's outtake flywheel: a
//! plant model identified from kV/kA, a Kalman filter estimating angular
//! velocity from the encoder, and an LQR producing a clamped voltage once
//! per fixed loop period.

pub mod control_loop;
pub mod controller;
pub mod error;
pub mod estimator;
pub mod hardware;
pub mod outtake;
pub mod params;
pub mod plant;
pub mod riccati;
pub mod sim;
pub mod state;

// Re-export main types
pub use control_loop::{ControlLoop, TickOutput};
pub use controller::LinearQuadraticRegulator;
pub use error::{ConfigError, SensorError};
pub use estimator::KalmanFilter;
pub use hardware::{PercentActuator, VelocitySensor, VoltageActuator};
pub use outtake::Outtake;
pub use params::{
    ControllerGains, EstimatorNoiseModel, OuttakeConfig, PlantParameters, VoltageLimit,
};
pub use plant::PlantModel;
pub use state::{EstimatorState, LoopMode, LoopState};
