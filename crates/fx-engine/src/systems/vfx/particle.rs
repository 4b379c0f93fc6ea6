use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::layer::VfxLayer;
use crate::core::pool::Handle;

/// Colour used when a spawn does not override it.
pub const DEFAULT_COLOR: u32 = 0xFFFF_FFFF;

/// Per-spawn overrides. Zero fields fall back to the definition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VfxOverrides {
    pub lifetime_ms: u32,
    pub scale: f32,
    /// Packed 0xRRGGBBAA.
    pub color: u32,
}

impl VfxOverrides {
    pub fn with_lifetime(mut self, lifetime_ms: u32) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Base scale for particles spawned by the instance.
    pub fn scale_or_default(&self) -> f32 {
        if self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    pub fn color_or_default(&self) -> u32 {
        if self.color != 0 {
            self.color
        } else {
            DEFAULT_COLOR
        }
    }
}

/// A live VFX. Owns the particles its emitters spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct VfxInstance {
    /// Registry slot of the definition.
    pub def: usize,
    pub pos: Vec2,
    pub age_ms: u32,
    pub overrides: VfxOverrides,
    /// Fractional particles carried between updates.
    pub emit_accum: f32,
    pub trail_accum: f32,
    /// Next composite child to spawn.
    pub next_child: usize,
    /// Instance age when the last child spawned.
    pub last_child_ms: u32,
}

impl VfxInstance {
    pub fn new(def: usize, pos: Vec2, overrides: VfxOverrides) -> Self {
        Self {
            def,
            pos,
            age_ms: 0,
            overrides,
            emit_accum: 0.0,
            trail_accum: 0.0,
            next_child: 0,
            last_child_ms: 0,
        }
    }

    /// Override lifetime when set, else the definition's.
    pub fn lifetime_ms(&self, def_lifetime_ms: u32) -> u32 {
        if self.overrides.lifetime_ms > 0 {
            self.overrides.lifetime_ms
        } else {
            def_lifetime_ms
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Instance that emitted this particle.
    pub owner: Handle,
    pub trail: bool,
    pub layer: VfxLayer,
    pub world_space: bool,
    pub pos: Vec2,
    pub scale: f32,
    pub color: u32,
    pub age_ms: u32,
    /// At least 1.
    pub lifetime_ms: u32,
}

impl Particle {
    /// Advance by `dt_ms`. Returns false once the particle has outlived its
    /// lifetime.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        self.age_ms = self.age_ms.saturating_add(dt_ms);
        self.age_ms <= self.lifetime_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::SlotPool;

    #[test]
    fn zero_overrides_fall_back() {
        let o = VfxOverrides::default();
        assert_eq!(o.scale_or_default(), 1.0);
        assert_eq!(o.color_or_default(), DEFAULT_COLOR);
        let inst = VfxInstance::new(0, Vec2::ZERO, o);
        assert_eq!(inst.lifetime_ms(400), 400);
    }

    #[test]
    fn set_overrides_win() {
        let o = VfxOverrides::default()
            .with_lifetime(50)
            .with_scale(2.5)
            .with_color(0xFF00_00FF);
        assert_eq!(o.scale_or_default(), 2.5);
        assert_eq!(o.color_or_default(), 0xFF00_00FF);
        assert_eq!(VfxInstance::new(0, Vec2::ZERO, o).lifetime_ms(400), 50);
    }

    #[test]
    fn particle_lives_through_its_last_ms() {
        let mut pool: SlotPool<u8> = SlotPool::new(1);
        let owner = pool.allocate(0).unwrap();
        let mut p = Particle {
            owner,
            trail: false,
            layer: VfxLayer::Mid,
            world_space: true,
            pos: Vec2::ZERO,
            scale: 1.0,
            color: DEFAULT_COLOR,
            age_ms: 0,
            lifetime_ms: 200,
        };
        assert!(p.tick(100));
        assert!(p.tick(100));
        assert!(!p.tick(1));
    }
}
