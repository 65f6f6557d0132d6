//! Flywheel Spin-Up Simulation Example
//!
//! Spins the simulated outtake flywheel up to a target, optionally spins it
//! back down, and writes the time series to CSV.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use outtake::sim::{rms_error, run_simulation, settling_cycle, SimConfig};
use outtake::OuttakeConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Outtake flywheel state-space loop simulation")]
struct Cli {
    /// JSON file with an OuttakeConfig (missing fields use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target velocity [rad/s]
    #[arg(long, default_value_t = 100.0)]
    target: f64,

    /// Number of 20 ms cycles to simulate
    #[arg(long, default_value_t = 250)]
    steps: usize,

    /// Cycle at which to stop the flywheel
    #[arg(long)]
    spin_down_at: Option<usize>,

    /// Supply voltage of the rig, sets both the loop limit and hardware max
    #[arg(long)]
    supply: Option<f64>,

    /// Encoder noise standard deviation [rad/s]
    #[arg(long, default_value_t = 0.5)]
    measurement_noise: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output CSV path
    #[arg(long, default_value = "out/spinup.csv")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<OuttakeConfig>(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => OuttakeConfig::default(),
    };
    if let Some(volts) = cli.supply {
        config = config.with_supply(volts);
    }

    let sim = SimConfig {
        steps: cli.steps,
        target: cli.target,
        spin_down_at: cli.spin_down_at,
        measurement_noise_std: cli.measurement_noise,
        seed: cli.seed,
        ..Default::default()
    };

    println!("Running outtake flywheel simulation...\n");
    println!("Configuration:");
    println!("  kV / kA:        {} / {}", config.plant.kv, config.plant.ka);
    println!("  Loop period:    {} s", config.loop_period);
    println!(
        "  Voltage limit:  [{}, {}] V",
        config.voltage_limit.min, config.voltage_limit.max
    );
    println!("  Target:         {} rad/s", sim.target);
    println!("  Steps:          {}", sim.steps);
    println!();

    let results = run_simulation(&sim, &config)?;

    let tracking_end = sim.spin_down_at.unwrap_or(results.len()).min(results.len());
    let tracking = &results[..tracking_end];
    let errors: Vec<f64> = tracking
        .iter()
        .map(|s| s.estimate - s.true_velocity)
        .collect();
    let settled = settling_cycle(tracking, config.target_tolerance);
    let saturated = results.iter().filter(|s| s.saturated).count();

    println!("METRICS SUMMARY");
    println!("===============");
    println!("  Estimate RMS error:  {:.6} rad/s", rms_error(&errors));
    match settled {
        Some(cycle) => println!(
            "  Settled at cycle:    {} (t={:.2} s)",
            cycle,
            cycle as f64 * config.loop_period
        ),
        None => println!("  Settled at cycle:    never"),
    }
    println!("  Saturated cycles:    {}", saturated);
    if let Some(last) = results.last() {
        println!("  Final velocity:      {:.3} rad/s", last.true_velocity);
    }

    if let Some(parent) = cli.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    for step in &results {
        writer.serialize(step)?;
    }
    writer.flush()?;

    println!("\nCSV output written to: {}", cli.output.display());
    println!("Done!");

    Ok(())
}
