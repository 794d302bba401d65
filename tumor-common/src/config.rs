use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use crate::vecmath::clamp;
use std::path::Path;

// Canvas and lattice layout
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
    /// Distance between neighbouring lattice sites.
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Particles further than this outside the canvas are culled.
    #[serde(default = "default_bounds_margin")]
    pub bounds_margin: f32,
}

// Closed-form vessel curve: x = base_x + slope*y + amplitude*sin(frequency*y + phase)
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct VesselConfig {
    pub base_x: f32,
    #[serde(default)]
    pub slope: f32,
    #[serde(default)]
    pub amplitude: f32,
    #[serde(default)]
    pub frequency: f32,
    #[serde(default)]
    pub phase: f32,
    /// Draw the phase from the simulation RNG instead of using `phase`.
    #[serde(default = "default_true")]
    pub randomize_phase: bool,
    /// Depth inside the boundary at which dosed particles may appear.
    #[serde(default = "default_spawn_band")]
    pub spawn_band: f32,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_ticks: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Sleep between ticks so the runner keeps the target cadence.
    #[serde(default)]
    pub realtime: bool,
    #[serde(default = "default_record_interval_ticks")]
    pub record_interval_ticks: u32,
}

// Initial conditions for the simulation, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    pub seed: u64,
    /// Lattice spacings between the vessel boundary and the cluster origin.
    #[serde(default = "default_seed_inset_cells")]
    pub seed_inset_cells: f32,
}

// Starting values and ranges for the three host-supplied scalar inputs
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ControlsConfig {
    pub start_percent: f32,
    pub growth_rate: f32,
    pub drug_amount: f32,
    #[serde(default = "default_input_max")]
    pub growth_rate_max: f32,
    #[serde(default = "default_input_max")]
    pub drug_amount_max: f32,
}

// Drug particle behaviour
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticleConfig {
    #[serde(default = "default_cap")]
    pub cap: usize,
    #[serde(default = "default_vessel_speed")]
    pub vessel_speed: f32,
    #[serde(default = "default_leech_speed")]
    pub leech_speed: f32,
    /// Probability that a dosed compound wanders instead of targeting a tumor site.
    #[serde(default = "default_wander_chance")]
    pub wander_chance: f32,
    #[serde(default = "default_compound_ttl")]
    pub compound_ttl: u32,
    #[serde(default = "default_seeking_ttl")]
    pub seeking_ttl: u32,
    #[serde(default = "default_decay_ttl")]
    pub decay_ttl: u32,
    #[serde(default = "default_wander_ttl_min")]
    pub wander_ttl_min: u32,
    #[serde(default = "default_wander_ttl_max")]
    pub wander_ttl_max: u32,
    #[serde(default = "default_wander_death_chance")]
    pub wander_death_chance: f32,
    #[serde(default = "default_cascade_chance")]
    pub cascade_chance: f32,
}

/// A scheduled host action. `amount` doses particles, the optional fields
/// override the corresponding control from this tick on.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DoseEvent {
    pub tick: u32,
    #[serde(default)]
    pub amount: f32,
    #[serde(default)]
    pub growth_rate: Option<f32>,
    #[serde(default)]
    pub drug_amount: Option<f32>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct DosingConfig {
    /// Dose `drug_amount` particles every N ticks (0 = never).
    #[serde(default)]
    pub interval_ticks: u32,
    #[serde(default)]
    pub schedule: Vec<DoseEvent>,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    /// Include per-site and per-particle frames in every snapshot.
    #[serde(default)]
    pub save_frames_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    #[serde(default)]
    pub save_final_sites: bool,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub canvas: CanvasConfig,
    pub vessel: VesselConfig,
    pub timing: TimingConfig,
    pub initial_conditions: InitialConditions,
    pub controls: ControlsConfig,
    #[serde(default)]
    pub particles: ParticleConfig,
    #[serde(default)]
    pub dosing: DosingConfig,
    pub output: OutputConfig,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig {
            cap: default_cap(),
            vessel_speed: default_vessel_speed(),
            leech_speed: default_leech_speed(),
            wander_chance: default_wander_chance(),
            compound_ttl: default_compound_ttl(),
            seeking_ttl: default_seeking_ttl(),
            decay_ttl: default_decay_ttl(),
            wander_ttl_min: default_wander_ttl_min(),
            wander_ttl_max: default_wander_ttl_max(),
            wander_death_chance: default_wander_death_chance(),
            cascade_chance: default_cascade_chance(),
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.canvas.width > 0.0 && self.canvas.height > 0.0) {
            anyhow::bail!("canvas width and height must be positive.");
        }
        if !(self.canvas.spacing > 0.0) {
            anyhow::bail!("canvas spacing must be positive.");
        }
        if self.particles.cap == 0 {
            anyhow::bail!("particles.cap must be greater than 0.");
        }
        if !(self.particles.vessel_speed >= 0.0) || !(self.particles.leech_speed >= 0.0) {
            anyhow::bail!("particle speeds must not be negative.");
        }
        if self.particles.wander_ttl_min == 0 || self.particles.wander_ttl_min > self.particles.wander_ttl_max {
            anyhow::bail!(
                "wander_ttl_min ({}) must be positive and not exceed wander_ttl_max ({}).",
                self.particles.wander_ttl_min,
                self.particles.wander_ttl_max
            );
        }
        if !(self.controls.growth_rate_max >= 0.0) || !(self.controls.drug_amount_max >= 0.0) {
            anyhow::bail!("control maxima must not be negative.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn sim_params(&self) -> SimParams {
        let spacing = self.canvas.spacing;
        let grid_cols = (self.canvas.width / spacing).floor() as u32 + 1;
        let grid_rows = (self.canvas.height / spacing).floor() as u32 + 1;
        let p = &self.particles;

        SimParams {
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
            spacing,
            grid_cols,
            grid_rows,
            num_sites: grid_cols * grid_rows,
            bounds_margin: self.canvas.bounds_margin,

            seed: self.initial_conditions.seed,
            seed_inset_cells: self.initial_conditions.seed_inset_cells,
            spawn_band: self.vessel.spawn_band.max(0.0),

            particle_cap: p.cap,
            vessel_speed: p.vessel_speed,
            leech_speed: p.leech_speed,
            wander_chance: clamp(p.wander_chance, 0.0, 1.0),
            compound_ttl: p.compound_ttl.max(1),
            seeking_ttl: p.seeking_ttl.max(1),
            decay_ttl: p.decay_ttl.max(1),
            wander_ttl_min: p.wander_ttl_min,
            wander_ttl_max: p.wander_ttl_max,
            wander_death_chance: clamp(p.wander_death_chance, 0.0, 1.0),
            cascade_chance: clamp(p.cascade_chance, 0.0, 1.0),

            growth_rate_max: self.controls.growth_rate_max,
            drug_amount_max: self.controls.drug_amount_max,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_spacing() -> f32 {
    18.0
}

fn default_bounds_margin() -> f32 {
    40.0
}

fn default_spawn_band() -> f32 {
    60.0
}

fn default_tick_interval_ms() -> u64 {
    120
}

fn default_record_interval_ticks() -> u32 {
    25
}

fn default_seed_inset_cells() -> f32 {
    3.0
}

fn default_input_max() -> f32 {
    100.0
}

fn default_cap() -> usize {
    1200
}

fn default_vessel_speed() -> f32 {
    2.2
}

fn default_leech_speed() -> f32 {
    1.6
}

fn default_wander_chance() -> f32 {
    0.2
}

fn default_compound_ttl() -> u32 {
    1400
}

fn default_seeking_ttl() -> u32 {
    220
}

fn default_decay_ttl() -> u32 {
    80
}

fn default_wander_ttl_min() -> u32 {
    60
}

fn default_wander_ttl_max() -> u32 {
    140
}

fn default_wander_death_chance() -> f32 {
    0.015
}

fn default_cascade_chance() -> f32 {
    0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [canvas]
        width = 162.0
        height = 162.0

        [vessel]
        base_x = 100.0
        randomize_phase = false

        [timing]
        total_ticks = 10

        [initial_conditions]
        seed = 7

        [controls]
        start_percent = 20.0
        growth_rate = 10.0
        drug_amount = 5.0

        [output]
        base_filename = "test"
        save_stats = false
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.canvas.spacing, 18.0);
        assert_eq!(config.particles.cap, 1200);
        assert_eq!(config.particles.seeking_ttl, 220);
        assert_eq!(config.timing.tick_interval_ms, 120);
        assert!(config.dosing.schedule.is_empty());

        let params = config.sim_params();
        assert_eq!(params.grid_cols, 10);
        assert_eq!(params.grid_rows, 10);
        assert_eq!(params.num_sites, 100);
    }

    #[test]
    fn rejects_non_positive_spacing() {
        let bad = MINIMAL.replace("height = 162.0", "height = 162.0\nspacing = 0.0");
        assert!(SimulationConfig::from_toml_str(&bad).is_err());
    }

    #[test]
    fn rejects_nan_speeds_and_maxima() {
        let nan_speed = format!("{}\n[particles]\nvessel_speed = nan\n", MINIMAL);
        assert!(SimulationConfig::from_toml_str(&nan_speed).is_err());

        let nan_max = MINIMAL.replace("drug_amount = 5.0", "drug_amount = 5.0\ndrug_amount_max = nan");
        assert!(SimulationConfig::from_toml_str(&nan_max).is_err());
    }

    #[test]
    fn parses_dose_schedule() {
        let with_schedule = format!(
            "{}\n[dosing]\ninterval_ticks = 50\nschedule = [{{ tick = 3, amount = 4.0 }}, {{ tick = 9, growth_rate = 0.0 }}]\n",
            MINIMAL
        );
        let config = SimulationConfig::from_toml_str(&with_schedule).unwrap();
        assert_eq!(config.dosing.interval_ticks, 50);
        assert_eq!(config.dosing.schedule.len(), 2);
        assert_eq!(config.dosing.schedule[1].growth_rate, Some(0.0));
        assert_eq!(config.dosing.schedule[1].amount, 0.0);
    }
}
