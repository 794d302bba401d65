use crate::grid::{SiteIndex, TissueGrid};
use crate::particles::{Particle, ParticleKind};
use rand::prelude::*;
use tumor_common::SimParams;

/// Cytotoxic fragments released by one compound split.
pub const SPLIT_COUNT: usize = 4;
/// Contact distance beyond a site's radius for a compound.
pub const COMPOUND_CONTACT_PAD: f32 = 9.0;
/// Contact distance beyond a site's radius for a cytotoxic fragment.
pub const CYTOTOXIC_CONTACT_PAD: f32 = 10.0;

/// What one interaction pass did.
#[derive(Debug, Default)]
pub struct InteractionOutcome {
    /// New particles, not yet admitted to the active set.
    pub spawned: Vec<Particle>,
    pub kills: u32,
    pub splits: u32,
}

/// Resolves particle/tumor contact for every live particle, in order.
/// Particles spawned here are returned rather than appended, so they first act next tick.
pub fn resolve<R: Rng + ?Sized>(
    particles: &mut [Particle],
    grid: &mut TissueGrid,
    params: &SimParams,
    rng: &mut R,
) -> InteractionOutcome {
    let mut outcome = InteractionOutcome::default();

    for p in particles.iter_mut().filter(|p| p.alive) {
        match p.kind {
            ParticleKind::Compound { .. } => {
                if !p.leached {
                    continue;
                }
                if let Some(contact) = grid.first_contact(p.position, COMPOUND_CONTACT_PAD) {
                    split(contact, grid, params, rng, &mut outcome);
                    p.kill();
                }
            }
            ParticleKind::Cytotoxic { target: Some(target), parent } => {
                if !grid.is_live_tumor(target) {
                    p.kill();
                    continue;
                }
                let site = grid.site(target);
                if p.position.distance(site.position) <= site.size + CYTOTOXIC_CONTACT_PAD {
                    grid.kill(target);
                    outcome.kills += 1;
                    if let Some(parent) = parent {
                        if grid.kill(parent) {
                            outcome.kills += 1;
                        }
                    }
                    if grid.cascade_kill(target, params.cascade_chance, rng).is_some() {
                        outcome.kills += 1;
                    }
                    p.kill();
                }
            }
            ParticleKind::Cytotoxic { target: None, .. } => {
                if let Some(contact) = grid.first_contact(p.position, CYTOTOXIC_CONTACT_PAD) {
                    grid.kill(contact);
                    outcome.kills += 1;
                    if grid.cascade_kill(contact, params.cascade_chance, rng).is_some() {
                        outcome.kills += 1;
                    }
                    p.kill();
                }
            }
        }
    }
    outcome
}

/// Kills the contacted site and releases exactly `SPLIT_COUNT` cytotoxic fragments.
fn split<R: Rng + ?Sized>(
    contact: SiteIndex,
    grid: &mut TissueGrid,
    params: &SimParams,
    rng: &mut R,
    outcome: &mut InteractionOutcome,
) {
    let origin = grid.site(contact).position;
    grid.kill(contact);
    outcome.kills += 1;
    outcome.splits += 1;

    let neighbors = grid.tumor_neighbor_indices(contact);
    for k in 0..SPLIT_COUNT {
        let fragment = if !neighbors.is_empty() {
            let n = neighbors[k % neighbors.len()];
            if grid.kill(n) {
                outcome.kills += 1;
                if grid.cascade_kill(n, params.cascade_chance, rng).is_some() {
                    outcome.kills += 1;
                }
                Particle::decaying_cytotoxic(grid.site(n).position, Some(contact), params.decay_ttl)
            } else {
                Particle::seeking_cytotoxic(origin, n, Some(contact), params.seeking_ttl)
            }
        } else if let Some(nearest) = grid.nearest_tumor(origin) {
            Particle::seeking_cytotoxic(origin, nearest, Some(contact), params.seeking_ttl)
        } else {
            Particle::decaying_cytotoxic(origin, Some(contact), params.decay_ttl)
        };
        outcome.spawned.push(fragment);
    }
}
