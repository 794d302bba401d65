use crate::grid::{SiteIndex, TissueGrid};
use crate::vessel::Vessel;
use log::{debug, info, warn};
use rand::prelude::*;
use std::collections::VecDeque;
use tumor_common::{clamp, Vec2};

/// Seeded site count at `start_percent = 100`.
const FULL_CLUSTER_SITES: f32 = 45.0;
const MIN_CLUSTER_SITES: usize = 3;
const SEED_SIZE_MIN: f32 = 12.0;
const SEED_SIZE_MAX: f32 = 22.0;

/// Number of tumor sites a fresh cluster should have for a given density percentage.
pub fn seed_target_count(start_percent: f32) -> usize {
    let p = clamp(start_percent, 0.0, 100.0);
    ((p / 100.0 * FULL_CLUSTER_SITES).round() as usize).max(MIN_CLUSTER_SITES)
}

/// Cluster origin: vertical middle of the canvas, `inset_cells` lattice spacings into tissue.
pub fn seed_origin(vessel: &Vessel, canvas_height: f32, spacing: f32, inset_cells: f32) -> Vec2 {
    let y = canvas_height * 0.5;
    Vec2::new(vessel.boundary_x(y) - inset_cells * spacing, y)
}

/// Resets the grid and grows one 8-connected tumor cluster from the site nearest `origin`
/// by randomized breadth-first expansion. Vessel sites are a hard barrier: never
/// converted and never traversed. Returns the number of tumor sites seeded.
pub fn seed_cluster<R: Rng + ?Sized>(
    grid: &mut TissueGrid,
    origin: Vec2,
    start_percent: f32,
    rng: &mut R,
) -> usize {
    grid.clear();
    let target = seed_target_count(start_percent);

    let Some(start) = start_site(grid, origin) else {
        warn!("No tissue site available to seed a cluster near ({:.1}, {:.1}).", origin.x, origin.y);
        return 0;
    };

    let mut visited = vec![false; grid.len()];
    let mut queue: VecDeque<SiteIndex> = VecDeque::new();
    visited[start] = true;
    queue.push_back(start);

    let mut seeded = 0;
    while seeded < target {
        let Some(idx) = queue.pop_front() else { break };
        if grid.site(idx).in_vessel {
            continue;
        }
        let size = rng.random_range(SEED_SIZE_MIN..=SEED_SIZE_MAX);
        if grid.make_tumor(idx, size) {
            seeded += 1;
        }

        let mut neighbors = grid.neighbor_indices(idx);
        neighbors.shuffle(rng);
        for n in neighbors {
            if !visited[n] && !grid.site(n).in_vessel {
                visited[n] = true;
                queue.push_back(n);
            }
        }
    }

    if seeded < target {
        warn!("Seeded cluster reached only {} of {} requested sites.", seeded, target);
    } else {
        debug!("Seeded cluster from site {} with {} sites.", start, seeded);
    }
    info!("Seeded tumor cluster: {} sites (start_percent {:.1}).", seeded, start_percent);
    seeded
}

/// Nearest lattice site to `origin`, or the nearest non-vessel site if that one lies in the vessel.
fn start_site(grid: &TissueGrid, origin: Vec2) -> Option<SiteIndex> {
    let nearest = grid.nearest_site(origin)?;
    if !grid.site(nearest).in_vessel {
        return Some(nearest);
    }
    grid.sites()
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.in_vessel)
        .map(|(i, s)| (i, s.position.distance_squared(origin)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}
