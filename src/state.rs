//! Mutable per-cycle state
//!
//! - `EstimatorState`: velocity estimate and its error covariance
//! - `LoopState`: reference and the last voltage actually applied

use serde::{Deserialize, Serialize};

/// Velocity estimate of the Kalman filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorState {
    /// Estimated angular velocity [rad/s]
    pub estimate: f64,
    /// Estimate error covariance, never negative
    pub error_covariance: f64,
}

impl EstimatorState {
    pub fn new(estimate: f64, error_covariance: f64) -> Self {
        Self {
            estimate,
            error_covariance,
        }
    }
}

/// Operating mode, derived from the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopMode {
    /// Holding a non-zero reference
    Tracking,
    /// Reference is zero, spinning down or at rest
    Idle,
}

/// Reference and last output of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    /// Target velocity [rad/s]
    pub reference: f64,
    /// Most recent clamped voltage [V]
    pub last_applied_voltage: f64,
}

impl LoopState {
    pub fn new(reference: f64, last_applied_voltage: f64) -> Self {
        Self {
            reference,
            last_applied_voltage,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn mode(&self) -> LoopMode {
        if self.reference == 0.0 {
            LoopMode::Idle
        } else {
            LoopMode::Tracking
        }
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_follows_reference() {
        assert_eq!(LoopState::zero().mode(), LoopMode::Idle);
        assert_eq!(LoopState::new(300.0, 0.0).mode(), LoopMode::Tracking);
        assert_eq!(LoopState::new(-50.0, 0.0).mode(), LoopMode::Tracking);
    }
}
