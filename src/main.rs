use anyhow::Result;
use log::{debug, error, info, trace, warn};
use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};
use tumor_common::{SimulationConfig, Snapshot};
use tumor_engine::Simulation;

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Tumor Engine...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}.", config_path);
    info!("Using {} Rayon threads for the growth pass.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = Simulation::new(config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());
    sim.start();

    let timing = sim.config().timing.clone();
    let dosing = sim.config().dosing.clone();
    let total_ticks = timing.total_ticks;
    let record_interval = if timing.record_interval_ticks == 0 {
        warn!("record_interval_ticks is 0. Recording every tick.");
        1
    } else {
        timing.record_interval_ticks
    };
    let tick_interval = Duration::from_millis(timing.tick_interval_ms);

    info!("Recording snapshot every {} ticks.", record_interval);
    info!("Starting simulation loop for {} ticks...", total_ticks);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Snapshot (tick = 0) ---
    sim.record_snapshot();

    for tick in 0..total_ticks {
        let tick_start_time = Instant::now();

        // --- Host inputs for this tick ---
        for event in dosing.schedule.iter().filter(|e| e.tick == tick) {
            sim.apply_dose_event(event);
        }
        if dosing.interval_ticks > 0 && tick % dosing.interval_ticks == 0 {
            let amount = sim.controls().drug_amount;
            sim.dose(amount);
        }

        let report = sim.tick();
        let tick_duration = tick_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_tick = (tick + 1) % record_interval == 0;
        let is_last_tick = tick + 1 == total_ticks;

        if should_print_status || is_record_tick || is_last_tick {
            info!(
                "Tick [{}/{}] | Tumor: {} | Particles: {} | Kills: {} | Tick Time: {:6.2} ms | Elapsed: {:.2} s",
                tick + 1,
                total_ticks,
                sim.grid().tumor_count(),
                sim.particles().len(),
                sim.stats().total_kills,
                tick_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_tick || is_last_tick {
                sim.record_snapshot();
            }
        } else {
            trace!("Tick [{}/{}] completed in {:.2} ms: {:?}", tick + 1, total_ticks, tick_duration.as_secs_f64() * 1000.0, report);
        }

        if sim.grid().tumor_count() == 0 && sim.particles().is_empty() {
            info!("Tumor eradicated after {} ticks.", tick + 1);
            if !is_record_tick && !is_last_tick {
                sim.record_snapshot();
            }
            sim.stop();
            break;
        }

        if timing.realtime {
            if let Some(remaining) = tick_interval.checked_sub(tick_start_time.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }
    sim.stop();

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished at tick {} in {:.3} seconds. {} tumor sites remain, {} killed in total.",
        sim.tick_count(),
        total_duration.as_secs_f64(),
        sim.grid().tumor_count(),
        sim.stats().total_kills
    );

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    if output.save_stats {
        let format = output.format.as_deref().unwrap_or("json");
        if let Err(e) = save_snapshots(sim.recorded_snapshots(), &output.base_filename, format) {
            error!("Error saving snapshots: {}", e);
        }
        let filename = format!("{}_totals.json", output.base_filename);
        match serde_json::to_string_pretty(&sim.stats()) {
            Ok(json_string) => match File::create(&filename).and_then(|mut f| f.write_all(json_string.as_bytes())) {
                Ok(()) => info!("Run totals saved to {}", filename),
                Err(e) => error!("Error writing run totals to '{}': {}", filename, e),
            },
            Err(e) => error!("Error serializing run totals: {}", e),
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    // Final lattice state, separate from the snapshots
    if output.save_final_sites {
        let filename = format!("{}_final_sites.csv", output.base_filename);
        match csv::Writer::from_path(&filename) {
            Ok(mut writer) => {
                writer.write_record(["x", "y", "tumor", "size"])?;
                for site in sim.sites() {
                    writer.write_record(&[
                        format!("{:.2}", site.position.x),
                        format!("{:.2}", site.position.y),
                        site.is_tumor().to_string(),
                        format!("{:.2}", site.size),
                    ])?;
                }
                writer.flush()?;
                info!("Final sites saved to {}", filename);
            }
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving final sites as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Writes all snapshots in one file. Unknown formats fall back to JSON.
fn save_snapshots(snapshots: &[Snapshot], base_filename: &str, format: &str) -> Result<()> {
    match format {
        "bincode" => {
            let filename = format!("{}_snapshots.bin", base_filename);
            let file = File::create(&filename)?;
            bincode::serialize_into(file, snapshots)?;
            info!("{} snapshots saved to {} (binary format)", snapshots.len(), filename);
        }
        "messagepack" => {
            let filename = format!("{}_snapshots.msgpack", base_filename);
            let mut file = File::create(&filename)?;
            rmp_serde::encode::write(&mut file, snapshots)?;
            info!("{} snapshots saved to {} (MessagePack format)", snapshots.len(), filename);
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_snapshots.json", base_filename);
            let json_string = serde_json::to_string(snapshots)?;
            let mut file = File::create(&filename)?;
            file.write_all(json_string.as_bytes())?;
            info!("{} snapshots saved to {} ({} KB)", snapshots.len(), filename, json_string.len() / 1024);
        }
    }
    Ok(())
}
