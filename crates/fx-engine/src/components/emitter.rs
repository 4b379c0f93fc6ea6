use serde::{Deserialize, Serialize};

use crate::core::rng::FxRng;

/// Smallest multiplier a `Normal` draw (or any lifetime draw) may produce.
pub const VARIATION_FLOOR: f32 = 0.01;

/// Continuous particle emission attached to a VFX definition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmitterParams {
    /// Particles per second.
    pub rate_hz: f32,
    /// Base particle lifetime in ms.
    pub particle_lifetime_ms: u32,
    /// Live particles one instance may own at once.
    pub max_particles: u32,
}

impl EmitterParams {
    /// Negative rates are treated as zero.
    pub fn new(rate_hz: f32, particle_lifetime_ms: u32, max_particles: u32) -> Self {
        Self {
            rate_hz: rate_hz.max(0.0),
            particle_lifetime_ms,
            max_particles,
        }
    }

    /// An emitter only runs when rate, lifetime and cap are all non-zero.
    pub fn is_active(&self) -> bool {
        self.rate_hz > 0.0 && self.particle_lifetime_ms > 0 && self.max_particles > 0
    }
}

/// Trail emission: same shape as the core emitter, tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrailParams {
    pub rate_hz: f32,
    pub lifetime_ms: u32,
    pub max_particles: u32,
}

impl TrailParams {
    pub fn new(rate_hz: f32, lifetime_ms: u32, max_particles: u32) -> Self {
        Self {
            rate_hz: rate_hz.max(0.0),
            lifetime_ms,
            max_particles,
        }
    }

    pub fn is_active(&self) -> bool {
        self.rate_hz > 0.0 && self.lifetime_ms > 0 && self.max_particles > 0
    }
}

/// Per-particle random multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variation {
    /// Always 1.
    #[default]
    None,
    /// `min + (max - min)·u`, bounds swapped if given backwards.
    Uniform { min: f32, max: f32 },
    /// `mean + sigma·z`, floored at [`VARIATION_FLOOR`].
    Normal { mean: f32, sigma: f32 },
}

impl Variation {
    /// Draw one multiplier. `None` draws nothing from the RNG.
    pub fn sample(&self, rng: &mut FxRng) -> f32 {
        match *self {
            Variation::None => 1.0,
            Variation::Uniform { min, max } => {
                let (lo, hi) = if max < min { (max, min) } else { (min, max) };
                lo + (hi - lo) * rng.next_f01()
            }
            Variation::Normal { mean, sigma } => {
                (mean + sigma * rng.next_normal()).max(VARIATION_FLOOR)
            }
        }
    }
}
