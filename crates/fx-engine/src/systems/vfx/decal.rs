use glam::Vec2;

use crate::api::types::{truncate_id, FxError, FxResult, EFFECT_ID_LEN};
use crate::components::layer::VfxLayer;

pub const DECAL_REGISTRY_CAPACITY: usize = 64;
pub const MAX_DECALS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct DecalDef {
    pub id: String,
    pub layer: VfxLayer,
    pub lifetime_ms: u32,
    pub world_space: bool,
    /// Base sprite scale, always positive.
    pub size: f32,
}

/// A placed decal. Stationary; only ages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decal {
    pub def: usize,
    pub pos: Vec2,
    /// Radians.
    pub angle: f32,
    pub scale: f32,
    pub age_ms: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DecalRegistry {
    defs: Vec<DecalDef>,
}

impl DecalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A non-positive size becomes 1.
    pub fn register(
        &mut self,
        id: &str,
        layer: VfxLayer,
        lifetime_ms: u32,
        world_space: bool,
        size: f32,
    ) -> FxResult<usize> {
        if id.is_empty() {
            return Err(FxError::InvalidParam("empty decal id"));
        }
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        let def = DecalDef {
            id: id.to_owned(),
            layer,
            lifetime_ms,
            world_space,
            size: if size > 0.0 { size } else { 1.0 },
        };
        if let Some(index) = self.index_of(id) {
            self.defs[index] = def;
            return Ok(index);
        }
        if self.defs.len() >= DECAL_REGISTRY_CAPACITY {
            return Err(FxError::RegistryFull);
        }
        self.defs.push(def);
        Ok(self.defs.len() - 1)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        self.defs.iter().position(|d| d.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&DecalDef> {
        self.defs.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&DecalDef> {
        self.index_of(id).and_then(|i| self.defs.get(i))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn clear(&mut self) {
        self.defs.clear();
    }
}
