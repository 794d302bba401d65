pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, CanvasConfig, VesselConfig, TimingConfig, InitialConditions, ControlsConfig, ParticleConfig, DoseEvent, DosingConfig, OutputConfig};
pub use sim_params::SimParams;
pub use snapshot::{Snapshot, SiteFrame, ParticleFrame, ParticleTag};
pub use vecmath::{Vec2, clamp};
