use crate::controls::Controls;
use crate::grid::TissueGrid;
use crate::particles::{Motion, Particle, ParticleKind};
use crate::vessel::Vessel;
use rand::prelude::*;
use tumor_common::{SimParams, Vec2};

/// Read-only inputs shared by every particle update within one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickEnv<'a> {
    pub params: &'a SimParams,
    pub vessel: &'a Vessel,
    pub controls: Controls,
}

impl TickEnv<'_> {
    /// Speed inside the vessel for an untargeted particle.
    #[inline(always)]
    pub fn vessel_speed(&self) -> f32 {
        self.params.vessel_speed * self.controls.vessel_boost()
    }

    /// Speed in tissue.
    #[inline(always)]
    pub fn leech_speed(&self) -> f32 {
        self.params.leech_speed * self.controls.leech_boost()
    }

    fn out_of_bounds(&self, pos: Vec2) -> bool {
        let m = self.params.bounds_margin;
        pos.x < -m
            || pos.y < -m
            || pos.x > self.params.canvas_width + m
            || pos.y > self.params.canvas_height + m
    }
}

/// Advances every live particle by one tick.
pub fn advance_all<R: Rng + ?Sized>(particles: &mut [Particle], grid: &TissueGrid, env: &TickEnv, rng: &mut R) {
    for particle in particles.iter_mut().filter(|p| p.alive) {
        advance(particle, grid, env, rng);
    }
}

/// One transport step for one particle: age, steer, integrate, leach, decay, cull.
pub fn advance<R: Rng + ?Sized>(p: &mut Particle, grid: &TissueGrid, env: &TickEnv, rng: &mut R) {
    p.ttl = p.ttl.saturating_sub(1);
    if p.ttl == 0 {
        p.kill();
        return;
    }

    steer(p, grid, env);

    p.position += p.velocity;

    if !p.leached {
        if p.position.x <= env.vessel.boundary_x(p.position.y) {
            leach(p, grid, env);
        } else if !p.is_wandering() {
            follow_flow(p, grid, env);
        }
    }

    if p.is_wandering() && rng.random_bool(env.params.wander_death_chance as f64) {
        p.kill();
        return;
    }

    if env.out_of_bounds(p.position) {
        p.kill();
    }
}

/// Re-aims particles that are already out in tissue and resolves dead targets.
fn steer(p: &mut Particle, grid: &TissueGrid, env: &TickEnv) {
    let Some(target) = p.target() else { return };
    let live = grid.is_live_tumor(target);

    match p.kind {
        ParticleKind::Cytotoxic { .. } => {
            if live {
                seek(p, grid, target, env.leech_speed());
            } else {
                p.go_idle();
            }
        }
        ParticleKind::Compound { .. } if p.leached => {
            if live {
                seek(p, grid, target, env.leech_speed());
            } else if let Some(next) = grid.nearest_tumor(p.position) {
                p.set_target(Some(next));
                seek(p, grid, next, env.leech_speed());
            } else {
                p.set_target(None);
                p.go_idle();
            }
        }
        ParticleKind::Compound { .. } => {
            // Still in the vessel: a dead target is dropped and the flow takes over.
            if !live {
                p.set_target(None);
            }
        }
    }
}

fn seek(p: &mut Particle, grid: &TissueGrid, target: usize, speed: f32) {
    let dir = p.position.direction_to(grid.site(target).position);
    p.velocity = dir * speed;
    p.motion = Motion::Seeking;
}

/// Boundary crossing: head for a live target, or straight into tissue along the normal.
fn leach(p: &mut Particle, grid: &TissueGrid, env: &TickEnv) {
    p.leached = true;
    if p.is_wandering() {
        return;
    }
    match p.target().filter(|&t| grid.is_live_tumor(t)) {
        Some(target) => seek(p, grid, target, env.leech_speed()),
        None => {
            p.velocity = env.vessel.tissue_normal(p.position.y) * env.leech_speed();
            p.motion = Motion::Fallback;
        }
    }
}

/// Vessel-confined motion, blended toward the target by the compound's steer aggression.
fn follow_flow(p: &mut Particle, grid: &TissueGrid, env: &TickEnv) {
    let flow = env.vessel.flow_direction(p.position.y);
    p.motion = Motion::Flowing;

    if let ParticleKind::Compound { target: Some(target), steer_aggression } = p.kind {
        if grid.is_live_tumor(target) {
            let to_target = p.position.direction_to(grid.site(target).position);
            let dir = flow.mix(to_target, steer_aggression).normalize();
            let speed = env.vessel_speed() * (1.0 + (steer_aggression - 0.5) * 0.4);
            p.velocity = dir * speed;
            return;
        }
    }
    p.velocity = flow * env.vessel_speed();
}
