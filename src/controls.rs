use log::warn;
use tumor_common::{clamp, ControlsConfig, SimParams};

/// The three scalar inputs the host supplies. A tick copies these by value
/// before it starts, so a pass never sees them change underneath it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    /// Seeding density in percent, read only by `start()`.
    pub start_percent: f32,
    pub growth_rate: f32,
    pub drug_amount: f32,
}

impl Controls {
    pub fn new(start_percent: f32, growth_rate: f32, drug_amount: f32) -> Self {
        Self { start_percent, growth_rate, drug_amount }
    }

    pub fn from_config(config: &ControlsConfig) -> Self {
        Self::new(config.start_percent, config.growth_rate, config.drug_amount)
    }

    /// Clamps every input to its documented range. NaN becomes the lower bound.
    pub fn clamped(self, params: &SimParams) -> Self {
        let out = Self {
            start_percent: clamp(self.start_percent, 0.0, 100.0),
            growth_rate: clamp(self.growth_rate, 0.0, params.growth_rate_max),
            drug_amount: clamp(self.drug_amount, 0.0, params.drug_amount_max),
        };
        if out != self {
            warn!("Control inputs {:?} clamped to {:?}.", self, out);
        }
        out
    }

    /// Speed multiplier for flow inside the vessel.
    #[inline(always)]
    pub fn vessel_boost(&self) -> f32 {
        1.0 + self.drug_amount / 80.0
    }

    /// Speed multiplier once particles are out in tissue.
    #[inline(always)]
    pub fn leech_boost(&self) -> f32 {
        1.0 + self.drug_amount / 120.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumor_common::SimulationConfig;

    fn params() -> SimParams {
        let toml = r#"
            [canvas]
            width = 100.0
            height = 100.0
            [vessel]
            base_x = 50.0
            [timing]
            total_ticks = 1
            [initial_conditions]
            seed = 1
            [controls]
            start_percent = 10.0
            growth_rate = 10.0
            drug_amount = 10.0
            growth_rate_max = 60.0
            drug_amount_max = 40.0
            [output]
            base_filename = "t"
            save_stats = false
        "#;
        SimulationConfig::from_toml_str(toml).unwrap().sim_params()
    }

    #[test]
    fn clamps_to_ranges() {
        let p = params();
        let c = Controls::new(150.0, -3.0, 99.0).clamped(&p);
        assert_eq!(c, Controls::new(100.0, 0.0, 40.0));
        let nan = Controls::new(f32::NAN, f32::NAN, f32::NAN).clamped(&p);
        assert_eq!(nan, Controls::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn in_range_values_pass_through() {
        let p = params();
        let c = Controls::new(20.0, 30.0, 12.0);
        assert_eq!(c.clamped(&p), c);
        assert!((c.vessel_boost() - 1.15).abs() < 1e-6);
        assert!((c.leech_boost() - 1.1).abs() < 1e-6);
    }
}
