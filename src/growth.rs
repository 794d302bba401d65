use crate::grid::{SiteIndex, TissueGrid};
use log::trace;
use rand::prelude::*;
use rayon::prelude::*;
use tumor_common::clamp;

/// `growth_rate / GROWTH_RATE_DIVISOR` is the chance that one tumor neighbour converts a site.
pub const GROWTH_RATE_DIVISOR: f32 = 15000.0;
const GROWN_SIZE_MIN: f32 = 6.0;
const GROWN_SIZE_MAX: f32 = 16.0;

/// Per-neighbour conversion probability `g` for a growth-rate input.
pub fn per_neighbor_probability(growth_rate: f32) -> f32 {
    clamp(growth_rate / GROWTH_RATE_DIVISOR, 0.0, 1.0)
}

/// Probability that at least one of `n` tumor neighbours converts the site: `1 - (1 - g)^n`.
pub fn conversion_probability(g: f32, n: u32) -> f32 {
    if n == 0 {
        return 0.0;
    }
    1.0 - (1.0 - g).powi(n as i32)
}

/// Runs one automaton pass and returns the number of sites converted.
///
/// Decisions are taken in parallel against the grid as it stood when the pass began,
/// then applied together, so a site converted this tick cannot spread until the next.
/// Each site draws from its own RNG seeded from (`seed`, site index, `tick`), which
/// keeps the outcome independent of thread scheduling.
pub fn grow(grid: &mut TissueGrid, growth_rate: f32, seed: u64, tick: u64) -> usize {
    let g = per_neighbor_probability(growth_rate);
    if g <= 0.0 {
        return 0;
    }

    let conversions: Vec<(SiteIndex, f32)> = {
        let snapshot: &TissueGrid = grid;
        (0..snapshot.len())
            .into_par_iter()
            .filter_map(|idx| {
                let site = snapshot.site(idx);
                if site.is_tumor() || site.in_vessel {
                    return None;
                }
                let n = snapshot.neighbor_count(idx);
                if n == 0 {
                    return None;
                }
                let site_seed = seed
                    .wrapping_add((idx as u64).wrapping_mul(0x1F3A))
                    .wrapping_add(tick.wrapping_mul(0x58C7));
                let mut rng = StdRng::seed_from_u64(site_seed);
                if rng.random::<f32>() < conversion_probability(g, n) {
                    Some((idx, rng.random_range(GROWN_SIZE_MIN..=GROWN_SIZE_MAX)))
                } else {
                    None
                }
            })
            .collect()
    };

    let mut converted = 0;
    for (idx, size) in conversions {
        if grid.make_tumor(idx, size) {
            converted += 1;
        }
    }
    trace!("Growth pass at tick {}: {} sites converted (g = {:.5}).", tick, converted, g);
    converted
}
