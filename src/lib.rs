//! Tumor growth and drug delivery on a tissue lattice beside a blood vessel.
//!
//! A [`Simulation`] owns everything: the vessel curve, the tissue grid, the
//! drug particles and a seeded RNG. Hosts call `start`, `dose` and `tick`, and
//! read state back through the accessors or a [`tumor_common::Snapshot`].

pub mod controls;
pub mod grid;
pub mod growth;
pub mod interaction;
pub mod particles;
pub mod seeding;
pub mod simulation;
pub mod transport;
pub mod vessel;

#[cfg(test)]
mod test_support;

pub use controls::Controls;
pub use grid::{GridSite, SiteIndex, SiteState, TissueGrid};
pub use particles::{Motion, Particle, ParticleKind, ParticleSet};
pub use simulation::{SimStats, Simulation, TickReport};
pub use vessel::Vessel;
