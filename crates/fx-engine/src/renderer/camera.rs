use glam::Vec2;

pub const DEFAULT_PIXELS_PER_WORLD: f32 = 32.0;

/// World → screen mapping used when handing particles and decals to the
/// renderer. Screen-space entities pass through untouched, so UI effects and
/// world effects share one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    /// Camera origin in world units.
    pub camera: Vec2,
    /// Screen pixels per world unit. Always positive.
    pub pixels_per_world: f32,
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self {
            camera: Vec2::ZERO,
            pixels_per_world: DEFAULT_PIXELS_PER_WORLD,
        }
    }
}

impl ScreenTransform {
    pub fn new(camera: Vec2, pixels_per_world: f32) -> Self {
        let mut t = Self::default();
        t.set(camera, pixels_per_world);
        t
    }

    /// Move the camera. A non-positive scale keeps the previous one.
    pub fn set(&mut self, camera: Vec2, pixels_per_world: f32) {
        self.camera = camera;
        if pixels_per_world > 0.0 {
            self.pixels_per_world = pixels_per_world;
        }
    }

    /// `(pos - camera)·pixels_per_world` for world-space positions.
    pub fn project(&self, pos: Vec2, world_space: bool) -> Vec2 {
        if world_space {
            (pos - self.camera) * self.pixels_per_world
        } else {
            pos
        }
    }
}
