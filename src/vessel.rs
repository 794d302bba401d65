use tumor_common::{Vec2, VesselConfig};

/// Closed-form vessel curve. Everything right of the boundary is vessel lumen,
/// everything left of it is tissue. Flow runs toward +y.
///
/// This is the only place the geometry is evaluated; the grid caches
/// `is_inside` per site at construction but computes it through here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vessel {
    pub base_x: f32,
    pub slope: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
}

impl Vessel {
    pub fn new(base_x: f32, slope: f32, amplitude: f32, frequency: f32, phase: f32) -> Self {
        Self { base_x, slope, amplitude, frequency, phase }
    }

    /// Straight vertical boundary at `x`.
    pub fn straight(x: f32) -> Self {
        Self::new(x, 0.0, 0.0, 0.0, 0.0)
    }

    /// Builds the vessel from config with an already-chosen phase.
    pub fn from_config(config: &VesselConfig, phase: f32) -> Self {
        Self::new(config.base_x, config.slope, config.amplitude, config.frequency, phase)
    }

    /// Left boundary of the vessel at height `y`.
    #[inline(always)]
    pub fn boundary_x(&self, y: f32) -> f32 {
        self.base_x + self.slope * y + self.amplitude * (self.frequency * y + self.phase).sin()
    }

    /// Analytic dx/dy of the boundary.
    #[inline(always)]
    pub fn tangent_slope(&self, y: f32) -> f32 {
        self.slope + self.amplitude * self.frequency * (self.frequency * y + self.phase).cos()
    }

    #[inline(always)]
    pub fn is_inside(&self, x: f32, y: f32) -> bool {
        x >= self.boundary_x(y)
    }

    #[inline(always)]
    pub fn contains(&self, pos: Vec2) -> bool {
        self.is_inside(pos.x, pos.y)
    }

    /// Unit direction of the flow at height `y`.
    pub fn flow_direction(&self, y: f32) -> Vec2 {
        Vec2::new(self.tangent_slope(y), 1.0).normalize()
    }

    /// Unit normal to the flow pointing into tissue (negative x).
    pub fn tissue_normal(&self, y: f32) -> Vec2 {
        let t = self.flow_direction(y);
        let a = Vec2::new(t.y, -t.x);
        let b = Vec2::new(-t.y, t.x);
        if a.x < 0.0 {
            a
        } else if b.x < 0.0 {
            b
        } else {
            Vec2::new(-1.0, 0.0)
        }
    }
}
