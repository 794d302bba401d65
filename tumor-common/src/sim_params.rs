use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used frequently during simulation ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Canvas & lattice
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub spacing: f32,
    pub grid_cols: u32,
    pub grid_rows: u32,
    pub num_sites: u32,
    pub bounds_margin: f32,

    // Seeding & dosing placement
    pub seed: u64,
    pub seed_inset_cells: f32,
    pub spawn_band: f32,

    // Particles
    pub particle_cap: usize,
    pub vessel_speed: f32, // Flow speed inside the vessel (units/tick)
    pub leech_speed: f32, // Speed once out in tissue (units/tick)
    pub wander_chance: f32,
    pub compound_ttl: u32,
    pub seeking_ttl: u32, // Cytotoxic particle aimed at a site
    pub decay_ttl: u32, // Idle / cosmetic cytotoxic particle
    pub wander_ttl_min: u32,
    pub wander_ttl_max: u32,
    pub wander_death_chance: f32, // Per tick
    pub cascade_chance: f32,

    // Input ranges
    pub growth_rate_max: f32,
    pub drug_amount_max: f32,
}
