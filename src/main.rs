use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, trace, warn};
use oncosim::Simulation;
use oncosim_common::{SimulationConfig, Snapshot};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Runs a T-cell / tumour population simulation from a TOML configuration.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation configuration.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `initial_conditions.seed`.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides `output.directory`.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting oncosim...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        info!("Overriding seed {} with {}.", config.initial_conditions.seed, seed);
        config.initial_conditions.seed = seed;
    }
    if let Some(dir) = &args.output_dir {
        config.output.directory = dir.to_string_lossy().into_owned();
    }
    std::fs::create_dir_all(&config.output.directory)
        .with_context(|| format!("Failed to create output directory '{}'", config.output.directory))?;

    // --- Initialize Simulation ---
    let mut sim = Simulation::new(config)?;
    debug!("Configuration: {:#?}", sim.config());

    let total_steps = sim.config().total_steps();
    let record_interval_steps = sim.config().timing.sampling_timestep_multiple.max(1);
    let dt = sim.config().timing.dt_hours;
    info!(
        "Recording snapshot every {} steps ({:.2} h).",
        record_interval_steps,
        record_interval_steps as f64 * dt
    );

    sim.setup_solve()?;

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Snapshot (time = 0) ---
    sim.record_snapshot()?;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        let summary = match sim.step() {
            Ok(summary) => summary,
            Err(e) => {
                error!("Error during simulation step {}: {:#}", step + 1, e);
                // Keep whatever the duration log already holds.
                if let Err(flush_err) = sim.finish() {
                    warn!("Could not flush outputs after failure: {:#}", flush_err);
                }
                return Err(e.context("Simulation step failed."));
            }
        };
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if should_print_status || is_record_step || is_last_step {
            info!(
                "Step [{}/{}] ({:.2} h) | Cells: {} | Kills: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                (step + 1) as f64 * dt,
                sim.current_cell_count(),
                summary.annulus_kills + summary.contact_kills,
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_step || is_last_step {
                sim.record_snapshot()?;
            }
        } else {
            trace!(
                "Step [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    sim.finish()?;
    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    let base = Path::new(&output.directory).join(&output.base_filename);
    if output.save_stats {
        let format = output.format.as_deref().unwrap_or("json");
        save_snapshots(&base, format, sim.get_recorded_snapshots())?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output.save_positions {
        let filename = with_suffix(&base, "_final_positions.csv");
        let mut writer = csv::Writer::from_path(&filename)
            .with_context(|| format!("Failed to create '{}'", filename.display()))?;
        writer.write_record(["x", "y"])?;
        for (x, y) in sim.get_results() {
            writer.write_record(&[format!("{:.4}", x), format!("{:.4}", y)])?;
        }
        writer.flush()?;
        info!("Final positions saved to {}", filename.display());
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn save_snapshots(base: &Path, format: &str, snapshots: &[Snapshot]) -> Result<()> {
    match format {
        "json" => {
            let filename = with_suffix(base, "_snapshots.json");
            let file = File::create(&filename).with_context(|| format!("Failed to create '{}'", filename.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, snapshots)?;
            writer.flush()?;
            info!("All snapshots saved to {}", filename.display());
        }
        "bincode" => {
            let filename = with_suffix(base, "_snapshots.bin");
            let file = File::create(&filename).with_context(|| format!("Failed to create '{}'", filename.display()))?;
            bincode::serialize_into(BufWriter::new(file), snapshots)?;
            info!("All snapshots saved to {} (binary format)", filename.display());
        }
        "messagepack" => {
            let filename = with_suffix(base, "_snapshots.msgpack");
            let file = File::create(&filename).with_context(|| format!("Failed to create '{}'", filename.display()))?;
            let mut writer = BufWriter::new(file);
            rmp_serde::encode::write(&mut writer, snapshots)?;
            writer.flush()?;
            info!("All snapshots saved to {} (MessagePack format)", filename.display());
        }
        other => {
            warn!("Unknown output format: {}. Using JSON instead.", other);
            save_snapshots(base, "json", snapshots)?;
        }
    }
    Ok(())
}
