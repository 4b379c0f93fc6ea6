use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::components::layer::VfxLayer;

/// One particle or decal, already projected to screen space.
/// 6 × 4 bytes, no padding, so a renderer can upload the slice as-is.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ScreenSprite {
    pub x: f32,
    pub y: f32,
    /// Radians. Always 0 for particles.
    pub rotation: f32,
    pub scale: f32,
    /// Packed 0xRRGGBBAA.
    pub color: u32,
    /// `VfxLayer` as u32.
    pub layer: u32,
}

impl ScreenSprite {
    pub const STRIDE_BYTES: usize = 24;

    pub fn new(pos: Vec2, layer: VfxLayer) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            rotation: 0.0,
            scale: 1.0,
            color: 0xFFFF_FFFF,
            layer: layer.as_u8() as u32,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn vfx_layer(&self) -> Option<VfxLayer> {
        VfxLayer::from_u8(self.layer as u8)
    }
}
