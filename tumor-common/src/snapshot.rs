use serde::{Serialize, Deserialize};

/// Particle kind as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleTag {
    Compound,
    Cytotoxic,
}

/// One lattice site as drawn by a renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteFrame {
    pub x: f32,
    pub y: f32,
    pub tumor: bool,
    /// Visual/interaction radius, 0 for healthy sites.
    pub size: f32,
}

/// One live drug particle as drawn by a renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleFrame {
    pub x: f32,
    pub y: f32,
    pub kind: ParticleTag,
    pub leached: bool,
}

/// A snapshot of the simulation state and metrics at a specific tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of ticks completed when the snapshot was taken.
    pub tick: u64,
    pub tumor_site_count: u32,
    pub compound_count: u32,
    pub cytotoxic_count: u32,
    /// Particles that have crossed the vessel boundary into tissue.
    pub leached_count: u32,
    /// Cumulative tumor sites killed since `start()`.
    pub total_kills: u64,
    /// Cumulative healthy-to-tumor conversions by the growth automaton since `start()`.
    pub total_conversions: u64,
    /// Cumulative compound split events since `start()`.
    pub total_splits: u64,
    /// Present only when frames are requested. Always serialized so bincode can read it back.
    pub sites: Option<Vec<SiteFrame>>,
    pub particles: Option<Vec<ParticleFrame>>,
}
