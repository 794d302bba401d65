use crate::controls::Controls;
use crate::grid::{GridSite, TissueGrid};
use crate::growth;
use crate::interaction;
use crate::particles::{Particle, ParticleSet};
use crate::seeding;
use crate::transport::{self, TickEnv};
use crate::vessel::Vessel;
use anyhow::Result;
use log::{debug, info, trace};
use rand::prelude::*;
use rand_distr::UnitCircle;
use serde::{Deserialize, Serialize};
use tumor_common::{DoseEvent, SimParams, SimulationConfig, Snapshot, Vec2};

/// Cumulative counters since the last `start()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub total_kills: u64,
    pub total_conversions: u64,
    pub total_splits: u64,
    pub total_dosed: u64,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub converted: usize,
    pub kills: u32,
    pub splits: u32,
    pub purged: usize,
    pub spawned: usize,
    pub admitted: usize,
}

/// Owns the whole simulation: vessel, tissue grid, particles, RNG and tick counter.
pub struct Simulation {
    /// The simulation configuration it was built from.
    config: SimulationConfig,
    params: SimParams,
    vessel: Vessel,
    grid: TissueGrid,
    particles: ParticleSet,
    /// Latest host inputs, already clamped.
    controls: Controls,
    /// Host-side RNG for seeding, dosing, transport and interaction.
    rng: StdRng,
    tick_count: u64,
    running: bool,
    stats: SimStats,
    /// Stores collected snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

const STEER_AGGRESSION_MIN: f32 = 0.9;
const STEER_AGGRESSION_MAX: f32 = 0.92;

impl Simulation {
    /// Builds the vessel and an all-healthy grid. Call `start()` to seed and begin.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let params = config.sim_params();
        let mut rng = StdRng::seed_from_u64(config.initial_conditions.seed);

        let phase = if config.vessel.randomize_phase {
            rng.random_range(0.0..std::f32::consts::TAU)
        } else {
            config.vessel.phase
        };
        let vessel = Vessel::from_config(&config.vessel, phase);
        let grid = TissueGrid::new(params.grid_cols, params.grid_rows, params.spacing, &vessel);
        let controls = Controls::from_config(&config.controls).clamped(&params);

        info!(
            "Grid {}x{} ({} sites, {} inside the vessel), vessel phase {:.3}.",
            params.grid_cols,
            params.grid_rows,
            grid.len(),
            grid.sites().iter().filter(|s| s.in_vessel).count(),
            phase
        );

        Ok(Self {
            particles: ParticleSet::new(params.particle_cap),
            config,
            params,
            vessel,
            grid,
            controls,
            rng,
            tick_count: 0,
            running: false,
            stats: SimStats::default(),
            recorded_snapshots: Vec::new(),
        })
    }

    /// Resets the grid, reseeds the cluster, clears particles and begins ticking.
    pub fn start(&mut self) {
        self.particles.clear();
        self.tick_count = 0;
        self.stats = SimStats::default();
        self.recorded_snapshots.clear();

        let origin = seeding::seed_origin(
            &self.vessel,
            self.params.canvas_height,
            self.params.spacing,
            self.params.seed_inset_cells,
        );
        seeding::seed_cluster(&mut self.grid, origin, self.controls.start_percent, &mut self.rng);
        self.running = true;
        info!("Simulation started with {} tumor sites.", self.grid.tumor_count());
    }

    /// Halts ticking. Grid and particles stay readable.
    pub fn stop(&mut self) {
        if self.running {
            info!("Simulation stopped at tick {}.", self.tick_count);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Replaces the host inputs, clamped to their ranges. Takes effect from the next tick.
    pub fn set_controls(&mut self, controls: Controls) {
        self.controls = controls.clamped(&self.params);
    }

    /// Spawns `max(1, round(amount))` compounds at random points inside the vessel,
    /// never more than the cap has room for. Non-positive or non-finite amounts are a no-op.
    /// Returns how many were admitted.
    pub fn dose(&mut self, amount: f32) -> usize {
        if !amount.is_finite() || amount <= 0.0 {
            debug!("Ignoring dose of {}.", amount);
            return 0;
        }
        let requested = (amount.round() as usize).max(1);
        let count = requested.min(self.particles.room());
        if count < requested {
            debug!(
                "Particle cap {} limits dose of {} to {} new particles.",
                self.particles.cap(),
                requested,
                count
            );
        }
        let batch: Vec<Particle> = (0..count).map(|_| self.spawn_compound()).collect();
        let admitted = self.particles.admit(batch);
        self.stats.total_dosed += admitted as u64;
        info!(
            "Dosed {} of {} compound particles at tick {} ({} active).",
            admitted,
            requested,
            self.tick_count,
            self.particles.len()
        );
        admitted
    }

    /// Applies one scheduled host event: control overrides first, then the dose.
    pub fn apply_dose_event(&mut self, event: &DoseEvent) -> usize {
        let mut controls = self.controls;
        if let Some(rate) = event.growth_rate {
            controls.growth_rate = rate;
        }
        if let Some(drug) = event.drug_amount {
            controls.drug_amount = drug;
        }
        if controls != self.controls {
            self.set_controls(controls);
            info!("Controls updated at tick {}: {:?}.", self.tick_count, self.controls);
        }
        self.dose(event.amount)
    }

    fn spawn_compound(&mut self) -> Particle {
        let p = &self.params;
        let y = self.rng.random_range(0.0..=p.canvas_height);
        let depth = self.rng.random_range(1.0..=p.spawn_band.max(1.0));
        let position = Vec2::new(self.vessel.boundary_x(y) + depth, y);
        let vessel_speed = p.vessel_speed * self.controls.vessel_boost();

        let target = self.grid.nearest_tumor(position);
        match target {
            Some(target) if !self.rng.random_bool(p.wander_chance as f64) => {
                let aggression = self.rng.random_range(STEER_AGGRESSION_MIN..=STEER_AGGRESSION_MAX);
                let velocity = self.vessel.flow_direction(y) * vessel_speed;
                Particle::targeted_compound(position, velocity, target, aggression, p.compound_ttl)
            }
            _ => {
                let [dx, dy]: [f32; 2] = UnitCircle.sample(&mut self.rng);
                let ttl = self.rng.random_range(p.wander_ttl_min..=p.wander_ttl_max);
                Particle::wandering_compound(position, Vec2::new(dx, dy) * vessel_speed, ttl)
            }
        }
    }

    /// Advances by one step: growth, transport, interaction, purge.
    /// Particles spawned during the step join the active set at its end.
    pub fn tick(&mut self) -> TickReport {
        let controls = self.controls;
        let tick = self.tick_count;

        // --- 1. Tumor growth against a snapshot of the grid ---
        let converted = growth::grow(&mut self.grid, controls.growth_rate, self.params.seed, tick);

        // --- 2. Particle transport ---
        let env = TickEnv { params: &self.params, vessel: &self.vessel, controls };
        transport::advance_all(self.particles.as_mut_slice(), &self.grid, &env, &mut self.rng);

        // --- 3. Contact, splitting and cascades ---
        let outcome = interaction::resolve(self.particles.as_mut_slice(), &mut self.grid, &self.params, &mut self.rng);

        // --- 4. Purge, then admit this tick's offspring under the cap ---
        let purged = self.particles.purge();
        let spawned = outcome.spawned.len();
        let admitted = self.particles.admit(outcome.spawned);

        self.stats.total_conversions += converted as u64;
        self.stats.total_kills += outcome.kills as u64;
        self.stats.total_splits += outcome.splits as u64;
        self.tick_count += 1;

        let report = TickReport { converted, kills: outcome.kills, splits: outcome.splits, purged, spawned, admitted };
        if converted > 0 || outcome.kills > 0 || spawned > 0 {
            debug!(
                "Tick {}: +{} tumor, -{} killed, {} splits, {} spawned ({} admitted), {} purged, {} active.",
                self.tick_count, converted, outcome.kills, outcome.splits, spawned, admitted, purged, self.particles.len()
            );
        } else {
            trace!("Tick {}: quiet, {} active particles.", self.tick_count, self.particles.len());
        }
        report
    }

    /// Builds a snapshot of the current state. Frames are included only when asked for.
    pub fn snapshot(&self, include_frames: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_count,
            tumor_site_count: self.grid.tumor_count() as u32,
            compound_count: self.particles.count_where(Particle::is_compound) as u32,
            cytotoxic_count: self.particles.count_where(|p| !p.is_compound()) as u32,
            leached_count: self.particles.count_where(|p| p.leached) as u32,
            total_kills: self.stats.total_kills,
            total_conversions: self.stats.total_conversions,
            total_splits: self.stats.total_splits,
            sites: include_frames.then(|| self.grid.frames()),
            particles: include_frames.then(|| self.particles.frames()),
        }
    }

    /// Stores a snapshot, with frames if the output config asks for them.
    pub fn record_snapshot(&mut self) {
        let snapshot = self.snapshot(self.config.output.save_frames_in_snapshot);
        debug!(
            "Recording snapshot at tick {}: {} tumor sites, {} particles.",
            snapshot.tick,
            snapshot.tumor_site_count,
            self.particles.len()
        );
        self.recorded_snapshots.push(snapshot);
    }

    /// Provides access to the recorded snapshots.
    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    pub fn grid(&self) -> &TissueGrid {
        &self.grid
    }

    pub fn sites(&self) -> &[GridSite] {
        self.grid.sites()
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    pub fn vessel(&self) -> &Vessel {
        &self.vessel
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    /// Provides access to the simulation parameters.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Provides access to the configuration the simulation was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::ParticleKind;
    use crate::test_support::small_config;
    use std::collections::HashSet;

    fn started() -> Simulation {
        let mut sim = Simulation::new(small_config()).unwrap();
        sim.start();
        sim
    }

    fn assert_no_tumor_in_vessel(sim: &Simulation) {
        for site in sim.sites() {
            if site.is_tumor() {
                assert!(!sim.vessel().contains(site.position), "tumor inside vessel at {:?}", site.position);
            }
        }
    }

    #[test]
    fn start_seeds_and_clears() {
        let mut sim = started();
        assert!(sim.is_running());
        assert_eq!(sim.grid().tumor_count(), 9);
        sim.dose(3.0);
        sim.tick();
        sim.start();
        assert_eq!(sim.tick_count(), 0);
        assert!(sim.particles().is_empty());
        assert_eq!(sim.stats(), SimStats::default());
        assert_eq!(sim.grid().tumor_count(), 9);
    }

    #[test]
    fn dose_five_with_tumor_present() {
        let mut sim = started();
        assert_eq!(sim.dose(5.0), 5);
        assert_eq!(sim.particles().len(), 5);
        for p in sim.particles() {
            assert!(p.is_compound());
            assert!(sim.vessel().contains(p.position));
            match p.target() {
                Some(t) => assert!(sim.grid().is_live_tumor(t)),
                None => assert!(p.is_wandering()),
            }
            if let ParticleKind::Compound { target: Some(_), steer_aggression } = p.kind {
                assert!((STEER_AGGRESSION_MIN..=STEER_AGGRESSION_MAX).contains(&steer_aggression));
            }
        }
    }

    #[test]
    fn dose_without_tumor_wanders() {
        let mut sim = Simulation::new(small_config()).unwrap();
        assert_eq!(sim.dose(4.0), 4);
        assert!(sim.particles().iter().all(|p| p.is_wandering()));
    }

    #[test]
    fn degenerate_doses() {
        let mut sim = started();
        assert_eq!(sim.dose(0.0), 0);
        assert_eq!(sim.dose(-2.0), 0);
        assert_eq!(sim.dose(f32::NAN), 0);
        assert!(sim.particles().is_empty());
        assert_eq!(sim.dose(0.3), 1);
        assert_eq!(sim.dose(2.6), 3);
    }

    #[test]
    fn huge_dose_stops_at_the_cap() {
        let mut sim = started();
        let cap = sim.params().particle_cap;
        assert_eq!(sim.dose(f32::MAX), cap);
        assert_eq!(sim.particles().len(), cap);
        assert_eq!(sim.dose(1e9), 0);
        assert_eq!(sim.particles().len(), cap);
    }

    #[test]
    fn growth_only_ticks_are_monotonic_and_respect_vessel() {
        let mut sim = started();
        sim.set_controls(Controls::new(20.0, 100.0, 0.0));
        let mut before: HashSet<usize> = sim.grid().tumor_indices().into_iter().collect();
        for _ in 0..300 {
            sim.tick();
            let after: HashSet<usize> = sim.grid().tumor_indices().into_iter().collect();
            assert!(before.is_subset(&after));
            assert_no_tumor_in_vessel(&sim);
            before = after;
        }
    }

    #[test]
    fn dosing_run_keeps_invariants_and_cap() {
        let mut config = small_config();
        config.particles.cap = 40;
        let mut sim = Simulation::new(config).unwrap();
        sim.start();
        sim.set_controls(Controls::new(20.0, 100.0, 50.0));
        for i in 0..400 {
            if i % 20 == 0 {
                sim.dose(15.0);
            }
            sim.tick();
            assert!(sim.particles().len() <= 40);
            assert!(sim.particles().iter().all(|p| p.alive));
            assert_no_tumor_in_vessel(&sim);
        }
    }

    #[test]
    fn fragments_act_from_the_next_tick() {
        let mut config = small_config();
        config.particles.wander_death_chance = 0.0;
        let mut sim = Simulation::new(config).unwrap();
        sim.start();
        sim.set_controls(Controls::new(20.0, 0.0, 0.0));
        let contact = sim.grid().tumor_indices()[0];
        let mut compound = Particle::wandering_compound(sim.grid().site(contact).position, Vec2::zero(), 500);
        compound.leached = true;
        sim.particles.admit(vec![compound]);

        let report = sim.tick();

        assert_eq!(report.splits, 1);
        assert_eq!(report.spawned, 4);
        assert_eq!(report.admitted, 4);
        assert_eq!(sim.particles().len(), 4);
        let params = sim.params().clone();
        for p in sim.particles() {
            assert!(!p.is_compound());
            // Untouched by this tick's transport pass.
            assert!(p.ttl == params.decay_ttl || p.ttl == params.seeking_ttl);
        }
        assert!(sim.stats().total_kills >= 1);
    }

    #[test]
    fn stop_keeps_state_readable() {
        let mut sim = started();
        sim.dose(2.0);
        sim.tick();
        let tumor = sim.grid().tumor_count();
        let particles = sim.particles().len();
        sim.stop();
        assert!(!sim.is_running());
        assert_eq!(sim.grid().tumor_count(), tumor);
        assert_eq!(sim.particles().len(), particles);
    }

    #[test]
    fn controls_are_clamped_on_write() {
        let mut sim = started();
        sim.set_controls(Controls::new(500.0, -1.0, 1e9));
        let c = sim.controls();
        assert_eq!(c.start_percent, 100.0);
        assert_eq!(c.growth_rate, 0.0);
        assert_eq!(c.drug_amount, sim.params().drug_amount_max);
    }

    #[test]
    fn dose_event_overrides_controls() {
        let mut sim = started();
        let event = DoseEvent { tick: 0, amount: 2.0, growth_rate: Some(42.0), drug_amount: None };
        assert_eq!(sim.apply_dose_event(&event), 2);
        assert_eq!(sim.controls().growth_rate, 42.0);
    }

    #[test]
    fn snapshot_counts_and_frames() {
        let mut sim = started();
        sim.dose(3.0);
        let lean = sim.snapshot(false);
        assert_eq!(lean.tumor_site_count, 9);
        assert_eq!(lean.compound_count, 3);
        assert!(lean.sites.is_none() && lean.particles.is_none());

        let full = sim.snapshot(true);
        assert_eq!(full.sites.as_ref().map(Vec::len), Some(sim.grid().len()));
        assert_eq!(full.particles.as_ref().map(Vec::len), Some(3));

        sim.record_snapshot();
        assert_eq!(sim.recorded_snapshots().len(), 1);
    }

    #[test]
    fn stats_serialize_with_field_names() {
        let mut sim = started();
        sim.dose(3.0);
        let json = serde_json::to_value(sim.stats()).unwrap();
        assert_eq!(json["total_dosed"], 3);
        assert_eq!(json["total_kills"], 0);
    }

    #[test]
    fn same_seed_same_history() {
        let run = || {
            let mut sim = started();
            sim.set_controls(Controls::new(20.0, 100.0, 30.0));
            for i in 0..150 {
                if i % 30 == 0 {
                    sim.dose(6.0);
                }
                sim.tick();
            }
            (sim.grid().tumor_indices(), sim.particles().len(), sim.stats())
        };
        assert_eq!(run(), run());
    }
}
