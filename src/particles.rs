use crate::grid::SiteIndex;
use log::debug;
use tumor_common::{ParticleFrame, ParticleTag, Vec2};

/// Kind-specific particle data. Only a compound steers with an aggression
/// factor, only a cytotoxic particle remembers the site its compound split on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleKind {
    Compound {
        target: Option<SiteIndex>,
        /// Weight of target-seeking against vessel flow, in [0, 1].
        steer_aggression: f32,
    },
    Cytotoxic {
        target: Option<SiteIndex>,
        /// Tumor site the originating compound made contact with.
        parent: Option<SiteIndex>,
    },
}

/// How a particle moves this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Inside the vessel, following (and possibly blending away from) the flow.
    Flowing,
    /// Out in tissue, heading for a live target.
    Seeking,
    /// Out in tissue without a target, drifting along the tissue normal it leached on.
    Fallback,
    /// Stationary until it expires or something touches it.
    Idle,
    /// Untargeted compound on a random heading with elevated decay.
    Wandering,
}

/// A mobile drug entity.
#[derive(Debug, Clone)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub kind: ParticleKind,
    pub motion: Motion,
    /// Has crossed the vessel boundary into tissue.
    pub leached: bool,
    /// Remaining ticks.
    pub ttl: u32,
    pub alive: bool,
}

impl Particle {
    /// Compound dosed into the vessel and aimed at `target`.
    pub fn targeted_compound(position: Vec2, velocity: Vec2, target: SiteIndex, steer_aggression: f32, ttl: u32) -> Self {
        Self {
            position,
            velocity,
            kind: ParticleKind::Compound { target: Some(target), steer_aggression },
            motion: Motion::Flowing,
            leached: false,
            ttl,
            alive: true,
        }
    }

    /// Compound dosed into the vessel on a random heading.
    pub fn wandering_compound(position: Vec2, velocity: Vec2, ttl: u32) -> Self {
        Self {
            position,
            velocity,
            kind: ParticleKind::Compound { target: None, steer_aggression: 0.0 },
            motion: Motion::Wandering,
            leached: false,
            ttl,
            alive: true,
        }
    }

    /// Cytotoxic fragment that will steer toward `target`.
    pub fn seeking_cytotoxic(position: Vec2, target: SiteIndex, parent: Option<SiteIndex>, ttl: u32) -> Self {
        Self {
            position,
            velocity: Vec2::zero(),
            kind: ParticleKind::Cytotoxic { target: Some(target), parent },
            motion: Motion::Seeking,
            leached: true,
            ttl,
            alive: true,
        }
    }

    /// Stationary cytotoxic fragment that decays after `ttl` ticks.
    pub fn decaying_cytotoxic(position: Vec2, parent: Option<SiteIndex>, ttl: u32) -> Self {
        Self {
            position,
            velocity: Vec2::zero(),
            kind: ParticleKind::Cytotoxic { target: None, parent },
            motion: Motion::Idle,
            leached: true,
            ttl,
            alive: true,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, ParticleKind::Compound { .. })
    }

    pub fn is_wandering(&self) -> bool {
        self.motion == Motion::Wandering
    }

    pub fn target(&self) -> Option<SiteIndex> {
        match self.kind {
            ParticleKind::Compound { target, .. } | ParticleKind::Cytotoxic { target, .. } => target,
        }
    }

    pub fn set_target(&mut self, new_target: Option<SiteIndex>) {
        match &mut self.kind {
            ParticleKind::Compound { target, .. } | ParticleKind::Cytotoxic { target, .. } => *target = new_target,
        }
    }

    /// Stops the particle in place.
    pub fn go_idle(&mut self) {
        self.motion = Motion::Idle;
        self.velocity = Vec2::zero();
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    pub fn tag(&self) -> ParticleTag {
        match self.kind {
            ParticleKind::Compound { .. } => ParticleTag::Compound,
            ParticleKind::Cytotoxic { .. } => ParticleTag::Cytotoxic,
        }
    }

    pub fn frame(&self) -> ParticleFrame {
        ParticleFrame {
            x: self.position.x,
            y: self.position.y,
            kind: self.tag(),
            leached: self.leached,
        }
    }
}

/// The active particle list with a hard cap on its size.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    cap: usize,
}

impl ParticleSet {
    pub fn new(cap: usize) -> Self {
        Self { particles: Vec::new(), cap }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// How many more particles fit under the cap.
    pub fn room(&self) -> usize {
        self.cap.saturating_sub(self.particles.len())
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Appends as much of `batch` as fits under the cap, in order, and drops the rest.
    /// Returns the number admitted.
    pub fn admit(&mut self, mut batch: Vec<Particle>) -> usize {
        let room = self.room();
        if batch.len() > room {
            debug!(
                "Particle cap {} reached: admitting {} of {} new particles.",
                self.cap,
                room,
                batch.len()
            );
            batch.truncate(room);
        }
        let admitted = batch.len();
        self.particles.extend(batch);
        admitted
    }

    /// Removes dead particles. Returns how many were removed.
    pub fn purge(&mut self) -> usize {
        let before = self.particles.len();
        self.particles.retain(|p| p.alive);
        before - self.particles.len()
    }

    pub fn count_where<F: Fn(&Particle) -> bool>(&self, f: F) -> usize {
        self.particles.iter().filter(|p| f(p)).count()
    }

    pub fn frames(&self) -> Vec<ParticleFrame> {
        self.particles.iter().map(Particle::frame).collect()
    }
}
