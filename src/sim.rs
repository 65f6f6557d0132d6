//! Simulation harness for the outtake
//!
//! A simulated flywheel stands in for the motor controller and encoder,
//! and `run_simulation` drives a full [`Outtake`] through a spin-up (and
//! optionally spin-down) profile one period at a time.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SensorError};
use crate::hardware::{RecordingMotor, VelocitySensor, VoltageActuator};
use crate::outtake::Outtake;
use crate::params::OuttakeConfig;
use crate::plant::PlantModel;

/// Flywheel following the exact discrete plant, with optional noise
#[derive(Debug, Clone)]
pub struct SimulatedFlywheel {
    plant: PlantModel,
    /// True velocity [rad/s]
    velocity: f64,
    /// Voltage currently applied [V]
    voltage: f64,
    hardware_voltage_max: f64,
    encoder_scale: f64,
    /// Latched encoder reading, raw units
    reading: f64,
    process_noise: Option<Normal<f64>>,
    measurement_noise: Option<Normal<f64>>,
    rng: StdRng,
    /// Control periods left whose encoder reads time out
    pending_dropouts: u32,
}

impl SimulatedFlywheel {
    /// Flywheel with Gaussian process and measurement noise (std devs in rad/s)
    pub fn new(
        config: &OuttakeConfig,
        process_noise_std: f64,
        measurement_noise_std: f64,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let plant = PlantModel::identify_velocity_system(config.plant, config.loop_period)?;

        Ok(Self {
            plant,
            velocity: 0.0,
            voltage: 0.0,
            hardware_voltage_max: config.hardware_voltage_max,
            encoder_scale: config.encoder_scale,
            reading: 0.0,
            process_noise: noise_distribution("process_noise_std", process_noise_std)?,
            measurement_noise: noise_distribution("measurement_noise_std", measurement_noise_std)?,
            rng: StdRng::seed_from_u64(seed),
            pending_dropouts: 0,
        })
    }

    /// Flywheel whose encoder reports the true velocity exactly
    pub fn noiseless(config: &OuttakeConfig) -> Result<Self, ConfigError> {
        Self::new(config, 0.0, 0.0, 0)
    }

    /// Integrate one loop period under the applied voltage and sample the encoder
    pub fn advance(&mut self) {
        let w = self
            .process_noise
            .as_ref()
            .map_or(0.0, |dist| dist.sample(&mut self.rng));
        self.velocity = self.plant.step(self.velocity, self.voltage) + w;

        let v = self
            .measurement_noise
            .as_ref()
            .map_or(0.0, |dist| dist.sample(&mut self.rng));
        self.reading = (self.velocity + v) / self.encoder_scale;
    }

    /// Drop the encoder for the next `ticks` control periods
    ///
    /// Every read during a dropped period times out, whoever makes it. A
    /// period ends when the loop applies its voltage.
    pub fn fail_next_ticks(&mut self, ticks: u32) {
        self.pending_dropouts += ticks;
    }

    /// Place the flywheel at `velocity` with a perfect reading
    pub fn set_true_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
        self.reading = velocity / self.encoder_scale;
    }

    pub fn true_velocity(&self) -> f64 {
        self.velocity
    }

    pub fn applied_voltage(&self) -> f64 {
        self.voltage
    }
}

impl VelocitySensor for SimulatedFlywheel {
    fn velocity(&self) -> Result<f64, SensorError> {
        if self.pending_dropouts > 0 {
            return Err(SensorError::Timeout);
        }
        Ok(self.reading)
    }
}

impl VoltageActuator for SimulatedFlywheel {
    fn set_voltage(&mut self, volts: f64) {
        // Motor controller saturates at the supply
        self.voltage = volts.clamp(-self.hardware_voltage_max, self.hardware_voltage_max);
        self.pending_dropouts = self.pending_dropouts.saturating_sub(1);
    }
}

fn noise_distribution(name: &str, std_dev: f64) -> Result<Option<Normal<f64>>, ConfigError> {
    if std_dev == 0.0 {
        return Ok(None);
    }
    Normal::new(0.0, std_dev)
        .map(Some)
        .map_err(|e| ConfigError::Invalid(format!("{name}: {e}")))
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub steps: usize,
    /// Flywheel target set at cycle 0 [rad/s]
    pub target: f64,
    /// Cycle at which the flywheel is stopped
    pub spin_down_at: Option<usize>,
    pub process_noise_std: f64,
    pub measurement_noise_std: f64,
    /// Cycles whose encoder read fails
    pub dropouts: Vec<usize>,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: 250,
            target: 100.0,
            spin_down_at: None,
            process_noise_std: 0.2,
            measurement_noise_std: 0.5,
            dropouts: Vec::new(),
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Noise-free run, `steps` long, toward `target`
    pub fn noiseless(target: f64, steps: usize) -> Self {
        Self {
            steps,
            target,
            process_noise_std: 0.0,
            measurement_noise_std: 0.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::Invalid(
                "steps must be greater than zero".to_string(),
            ));
        }
        if !self.target.is_finite() {
            return Err(ConfigError::Invalid("target must be finite".to_string()));
        }
        Ok(())
    }
}

/// One simulated control period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimStep {
    pub cycle: usize,
    pub t: f64,
    pub target: f64,
    /// True velocity when the encoder was read
    pub true_velocity: f64,
    pub measured: Option<f64>,
    pub estimate: f64,
    pub voltage: f64,
    pub saturated: bool,
    pub reached: bool,
}

/// Drive an outtake through the profile in `sim`
pub fn run_simulation(
    sim: &SimConfig,
    config: &OuttakeConfig,
) -> Result<Vec<SimStep>, ConfigError> {
    sim.validate()?;

    let flywheel = SimulatedFlywheel::new(
        config,
        sim.process_noise_std,
        sim.measurement_noise_std,
        sim.seed,
    )?;
    let mut outtake = Outtake::new(config, flywheel, RecordingMotor::default())?;
    outtake.spin_flywheel(sim.target);

    let mut results = Vec::with_capacity(sim.steps);

    for cycle in 0..sim.steps {
        if sim.spin_down_at == Some(cycle) {
            outtake.stop_flywheel();
        }
        if sim.dropouts.contains(&cycle) {
            outtake.flywheel_mut().fail_next_ticks(1);
        }

        let true_velocity = outtake.flywheel().true_velocity();
        let out = outtake.periodic();

        results.push(SimStep {
            cycle,
            t: cycle as f64 * config.loop_period,
            target: outtake.target(),
            true_velocity,
            measured: out.measurement,
            estimate: out.estimate,
            voltage: out.voltage,
            saturated: out.saturated,
            reached: outtake.reached_target(),
        });

        outtake.flywheel_mut().advance();
    }

    Ok(results)
}

/// Calculate RMS error
pub fn rms_error(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = errors.iter().map(|&e| e * e).sum();
    (sum_sq / errors.len() as f64).sqrt()
}

/// First cycle from which the true velocity stays within `tolerance` of the target
pub fn settling_cycle(results: &[SimStep], tolerance: f64) -> Option<usize> {
    let settled = |s: &SimStep| {
        let band = tolerance * s.target.abs().max(1.0);
        (s.true_velocity - s.target).abs() <= band
    };
    let last_unsettled = results.iter().rposition(|s| !settled(s));
    match last_unsettled {
        None => results.first().map(|s| s.cycle),
        Some(i) => results.get(i + 1).map(|s| s.cycle),
    }
}

/// Whether the ready signal held for each of the last `n` cycles
pub fn in_band_tail(results: &[SimStep], n: usize) -> bool {
    n <= results.len() && results[results.len() - n..].iter().all(|s| s.reached)
}
