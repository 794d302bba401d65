use crate::vessel::Vessel;
use rand::prelude::*;
use tumor_common::{clamp, SiteFrame, Vec2};

/// Stable index of a site in the grid arena. Sites are never added, removed or reordered.
pub type SiteIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Healthy,
    Tumor,
}

/// One lattice position.
#[derive(Debug, Clone)]
pub struct GridSite {
    pub grid_x: i32,
    pub grid_y: i32,
    pub position: Vec2,
    pub state: SiteState,
    /// Visual/interaction radius. 0 when healthy.
    pub size: f32,
    /// Cached `Vessel::contains(position)`; the vessel never changes after construction.
    pub in_vessel: bool,
}

impl GridSite {
    #[inline(always)]
    pub fn is_tumor(&self) -> bool {
        self.state == SiteState::Tumor
    }
}

/// Fixed lattice of tissue sites, row-major.
#[derive(Debug, Clone)]
pub struct TissueGrid {
    cols: u32,
    rows: u32,
    spacing: f32,
    inv_spacing: f32,
    sites: Vec<GridSite>,
}

/// Offsets of the 8-neighbourhood.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0), (1, 0),
    (-1, 1), (0, 1), (1, 1),
];

impl TissueGrid {
    /// Creates an all-healthy grid. Site `(gx, gy)` sits at `(gx * spacing, gy * spacing)`.
    pub fn new(cols: u32, rows: u32, spacing: f32, vessel: &Vessel) -> Self {
        let mut sites = Vec::with_capacity((cols * rows) as usize);
        for gy in 0..rows as i32 {
            for gx in 0..cols as i32 {
                let position = Vec2::new(gx as f32 * spacing, gy as f32 * spacing);
                sites.push(GridSite {
                    grid_x: gx,
                    grid_y: gy,
                    position,
                    state: SiteState::Healthy,
                    size: 0.0,
                    in_vessel: vessel.contains(position),
                });
            }
        }
        Self { cols, rows, spacing, inv_spacing: 1.0 / spacing, sites }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[GridSite] {
        &self.sites
    }

    #[inline(always)]
    pub fn site(&self, idx: SiteIndex) -> &GridSite {
        &self.sites[idx]
    }

    /// True if `idx` refers to a site that is currently tumor.
    #[inline(always)]
    pub fn is_live_tumor(&self, idx: SiteIndex) -> bool {
        self.sites.get(idx).is_some_and(GridSite::is_tumor)
    }

    /// Lattice coordinates nearest to a continuous position. Inverse of site placement.
    #[inline(always)]
    pub fn grid_coords(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x * self.inv_spacing).round() as i32,
            (pos.y * self.inv_spacing).round() as i32,
        )
    }

    /// Bounds-checked lookup.
    #[inline(always)]
    pub fn index_at(&self, gx: i32, gy: i32) -> Option<SiteIndex> {
        if gx >= 0 && gx < self.cols as i32 && gy >= 0 && gy < self.rows as i32 {
            Some(gy as usize * self.cols as usize + gx as usize)
        } else {
            None
        }
    }

    /// Site closest to `pos`, clamping positions outside the lattice onto its edge.
    pub fn nearest_site(&self, pos: Vec2) -> Option<SiteIndex> {
        if self.sites.is_empty() {
            return None;
        }
        let (gx, gy) = self.grid_coords(pos);
        self.index_at(
            gx.clamp(0, self.cols as i32 - 1),
            gy.clamp(0, self.rows as i32 - 1),
        )
    }

    /// Calls `f` for each in-bounds site of the 8-neighbourhood of `idx`.
    #[inline(always)]
    pub fn for_each_neighbor<F>(&self, idx: SiteIndex, mut f: F)
    where
        F: FnMut(SiteIndex),
    {
        let site = &self.sites[idx];
        for (dx, dy) in NEIGHBOR_OFFSETS {
            if let Some(n) = self.index_at(site.grid_x + dx, site.grid_y + dy) {
                f(n);
            }
        }
    }

    /// Indices of all in-bounds neighbours, tumor or not.
    pub fn neighbor_indices(&self, idx: SiteIndex) -> Vec<SiteIndex> {
        let mut out = Vec::with_capacity(8);
        self.for_each_neighbor(idx, |n| out.push(n));
        out
    }

    /// Number of the 8 neighbours currently tumor.
    pub fn neighbor_count(&self, idx: SiteIndex) -> u32 {
        let mut count = 0;
        self.for_each_neighbor(idx, |n| {
            if self.sites[n].is_tumor() {
                count += 1;
            }
        });
        count
    }

    /// Neighbours currently tumor, in neighbourhood order.
    pub fn tumor_neighbor_indices(&self, idx: SiteIndex) -> Vec<SiteIndex> {
        let mut out = Vec::with_capacity(8);
        self.for_each_neighbor(idx, |n| {
            if self.sites[n].is_tumor() {
                out.push(n);
            }
        });
        out
    }

    /// Tumor site closest to `pos`, if any tumor remains.
    pub fn nearest_tumor(&self, pos: Vec2) -> Option<SiteIndex> {
        self.sites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_tumor())
            .map(|(i, s)| (i, s.position.distance_squared(pos)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// First tumor site (in index order) whose contact radius `size + pad` reaches `pos`.
    pub fn first_contact(&self, pos: Vec2, pad: f32) -> Option<SiteIndex> {
        self.sites.iter().position(|s| {
            s.is_tumor() && s.position.distance(pos) <= s.size + pad
        })
    }

    pub fn tumor_count(&self) -> usize {
        self.sites.iter().filter(|s| s.is_tumor()).count()
    }

    pub fn tumor_indices(&self) -> Vec<SiteIndex> {
        self.sites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_tumor())
            .map(|(i, _)| i)
            .collect()
    }

    /// Turns a site into tumor. Vessel-interior sites are refused; returns whether it converted.
    pub fn make_tumor(&mut self, idx: SiteIndex, size: f32) -> bool {
        let site = &mut self.sites[idx];
        if site.in_vessel || site.is_tumor() {
            return false;
        }
        site.state = SiteState::Tumor;
        site.size = size;
        true
    }

    /// Kills a tumor site. Returns whether it was tumor.
    pub fn kill(&mut self, idx: SiteIndex) -> bool {
        match self.sites.get_mut(idx) {
            Some(site) if site.is_tumor() => {
                site.state = SiteState::Healthy;
                site.size = 0.0;
                true
            }
            _ => false,
        }
    }

    /// With probability `chance`, kills one random tumor neighbour of `idx`.
    pub fn cascade_kill<R: Rng + ?Sized>(&mut self, idx: SiteIndex, chance: f32, rng: &mut R) -> Option<SiteIndex> {
        if !rng.random_bool(clamp(chance, 0.0, 1.0) as f64) {
            return None;
        }
        let victim = *self.tumor_neighbor_indices(idx).choose(rng)?;
        self.kill(victim);
        Some(victim)
    }

    /// Resets every site to healthy.
    pub fn clear(&mut self) {
        for site in &mut self.sites {
            site.state = SiteState::Healthy;
            site.size = 0.0;
        }
    }

    pub fn frames(&self) -> Vec<SiteFrame> {
        self.sites
            .iter()
            .map(|s| SiteFrame {
                x: s.position.x,
                y: s.position.y,
                tumor: s.is_tumor(),
                size: s.size,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TissueGrid {
        TissueGrid::new(10, 10, 18.0, &Vessel::straight(100.0))
    }

    #[test]
    fn grid_coords_round_trip_site_positions() {
        let g = grid();
        for (i, site) in g.sites().iter().enumerate() {
            let (gx, gy) = g.grid_coords(site.position);
            assert_eq!(g.index_at(gx, gy), Some(i));
        }
        // Nearby continuous positions round to the closest site.
        assert_eq!(g.grid_coords(Vec2::new(50.0, 90.0)), (3, 5));
        assert_eq!(g.grid_coords(Vec2::new(8.9, 9.1)), (0, 1));
    }

    #[test]
    fn index_at_is_bounds_checked() {
        let g = grid();
        assert_eq!(g.index_at(-1, 0), None);
        assert_eq!(g.index_at(0, 10), None);
        assert_eq!(g.index_at(9, 9), Some(99));
    }

    #[test]
    fn neighbor_count_and_indices() {
        let mut g = grid();
        let center = g.index_at(2, 2).unwrap();
        assert_eq!(g.neighbor_count(center), 0);
        g.make_tumor(g.index_at(1, 1).unwrap(), 10.0);
        g.make_tumor(g.index_at(3, 2).unwrap(), 10.0);
        g.make_tumor(g.index_at(4, 4).unwrap(), 10.0); // not a neighbour
        assert_eq!(g.neighbor_count(center), 2);
        assert_eq!(
            g.tumor_neighbor_indices(center),
            vec![g.index_at(1, 1).unwrap(), g.index_at(3, 2).unwrap()]
        );
        // Corner sites only have 3 neighbours.
        assert_eq!(g.neighbor_indices(0).len(), 3);
    }

    #[test]
    fn vessel_sites_refuse_tumor() {
        let mut g = grid();
        let inside = g.index_at(6, 0).unwrap(); // x = 108
        assert!(g.site(inside).in_vessel);
        assert!(!g.make_tumor(inside, 10.0));
        assert!(!g.site(inside).is_tumor());
    }

    #[test]
    fn kill_resets_size() {
        let mut g = grid();
        g.make_tumor(5, 12.0);
        assert!(g.kill(5));
        assert_eq!(g.site(5).size, 0.0);
        assert!(!g.kill(5));
    }

    #[test]
    fn nearest_tumor_and_contact() {
        let mut g = grid();
        assert_eq!(g.nearest_tumor(Vec2::zero()), None);
        let a = g.index_at(1, 1).unwrap();
        let b = g.index_at(4, 4).unwrap();
        g.make_tumor(a, 6.0);
        g.make_tumor(b, 6.0);
        assert_eq!(g.nearest_tumor(Vec2::new(60.0, 60.0)), Some(b));
        assert_eq!(g.first_contact(Vec2::new(18.0, 30.0), 9.0), Some(a));
        assert_eq!(g.first_contact(Vec2::new(18.0, 40.0), 9.0), None);
    }

    #[test]
    fn certain_cascade_kills_a_neighbor() {
        let mut g = grid();
        let center = g.index_at(2, 2).unwrap();
        let n = g.index_at(2, 3).unwrap();
        g.make_tumor(n, 8.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(g.cascade_kill(center, 1.0, &mut rng), Some(n));
        assert!(!g.site(n).is_tumor());
        assert_eq!(g.cascade_kill(center, 1.0, &mut rng), None);
        assert_eq!(g.cascade_kill(center, 0.0, &mut rng), None);
    }
}
