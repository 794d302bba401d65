use tumor_common::{SimParams, SimulationConfig};

/// 10x10 lattice at spacing 18 with a straight vessel boundary at x = 100.
pub const SMALL_WORLD: &str = r#"
    [canvas]
    width = 162.0
    height = 162.0
    spacing = 18.0
    bounds_margin = 40.0

    [vessel]
    base_x = 100.0
    randomize_phase = false
    spawn_band = 40.0

    [timing]
    total_ticks = 100

    [initial_conditions]
    seed = 42
    seed_inset_cells = 3.0

    [controls]
    start_percent = 20.0
    growth_rate = 0.0
    drug_amount = 0.0

    [output]
    base_filename = "test"
    save_stats = false
"#;

pub fn small_config() -> SimulationConfig {
    SimulationConfig::from_toml_str(SMALL_WORLD).expect("test config parses")
}

pub fn small_params() -> SimParams {
    small_config().sim_params()
}
