//! Seedable pseudo-random number generator (xorshift32).
//! Deterministic, fast, no global state: every subsystem that needs
//! randomness owns one of these and seeds it explicitly.

/// Seed used when a caller passes zero (xorshift has a fixed point at 0).
pub const DEFAULT_SEED: u32 = 0xA5F0_C3D2;

/// Seedable pseudo-random number generator (xorshift32).
#[derive(Debug, Clone)]
pub struct FxRng {
    state: u32,
}

impl FxRng {
    pub fn new(seed: u32) -> Self {
        FxRng {
            state: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    /// Reseed in place. Zero maps to [`DEFAULT_SEED`].
    pub fn set_seed(&mut self, seed: u32) {
        self.state = if seed == 0 { DEFAULT_SEED } else { seed };
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = if x == 0 { DEFAULT_SEED } else { x };
        self.state
    }

    /// Uniform float in [0, 1) built from the low 24 bits.
    pub fn next_f01(&mut self) -> f32 {
        (self.next_u32() & 0x00FF_FFFF) as f32 / 16_777_216.0
    }

    /// Standard normal sample (Box-Muller), clamped to [-4, 4].
    pub fn next_normal(&mut self) -> f32 {
        let u1 = self.next_f01().max(1e-7);
        let u2 = self.next_f01();
        let z = (-2.0 * (u1 as f64).ln()).sqrt() * (std::f64::consts::TAU * u2 as f64).cos();
        (z as f32).clamp(-4.0, 4.0)
    }
}

impl Default for FxRng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_deterministic() {
        let mut rng1 = FxRng::new(42);
        let mut rng2 = FxRng::new(42);
        for _ in 0..10 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn rng_zero_seed_handled() {
        let mut rng = FxRng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn unit_floats_stay_in_range() {
        let mut rng = FxRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_f01();
            assert!((0.0..1.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn normal_is_clamped_and_centered() {
        let mut rng = FxRng::new(99);
        let mut sum = 0.0;
        for _ in 0..4000 {
            let z = rng.next_normal();
            assert!((-4.0..=4.0).contains(&z));
            sum += z;
        }
        let mean = sum / 4000.0;
        assert!(mean.abs() < 0.1, "mean drifted: {}", mean);
    }

    #[test]
    fn reseed_restarts_sequence() {
        let mut rng = FxRng::new(5);
        let first = rng.next_u32();
        rng.next_u32();
        rng.set_seed(5);
        assert_eq!(rng.next_u32(), first);
    }
}
