use serde::{Deserialize, Serialize};

use crate::api::types::{truncate_id, FxError, FxResult, EFFECT_ID_LEN};
use crate::components::emitter::{EmitterParams, TrailParams, Variation};
use crate::components::layer::{BlendMode, VfxLayer};

/// Maximum registered VFX definitions.
pub const VFX_REGISTRY_CAPACITY: usize = 64;

/// Children kept per composite; extra children are dropped.
pub const MAX_COMPOSITE_CHILDREN: usize = 8;

/// How a composite schedules its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Not a composite.
    #[default]
    None,
    /// Each delay counts from the previous child's spawn.
    Chain,
    /// Each delay counts from the parent's spawn.
    Parallel,
}

/// One scheduled child of a composite. `def` is the child's registry slot,
/// resolved once at definition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeChild {
    pub def: Option<usize>,
    pub delay_ms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VfxDef {
    pub id: String,
    pub layer: VfxLayer,
    /// Instance lifetime in ms.
    pub lifetime_ms: u32,
    /// World-space positions are projected through the camera;
    /// screen-space ones are not.
    pub world_space: bool,
    pub emitter: EmitterParams,
    pub trail: TrailParams,
    pub scale_variation: Variation,
    pub lifetime_variation: Variation,
    pub blend: BlendMode,
    pub composite: CompositeMode,
    pub children: Vec<CompositeChild>,
}

impl VfxDef {
    fn new(id: &str, layer: VfxLayer, lifetime_ms: u32, world_space: bool) -> Self {
        Self {
            id: id.to_owned(),
            layer,
            lifetime_ms,
            world_space,
            emitter: EmitterParams::default(),
            trail: TrailParams::default(),
            scale_variation: Variation::None,
            lifetime_variation: Variation::None,
            blend: BlendMode::Alpha,
            composite: CompositeMode::None,
            children: Vec::new(),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.composite != CompositeMode::None
    }
}

/// Fixed-capacity id → definition table. Slots are stable for the lifetime
/// of the table, so instances and composite children hold plain indices.
#[derive(Debug, Clone, Default)]
pub struct VfxRegistry {
    defs: Vec<VfxDef>,
}

impl VfxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition. Replacing resets emitter, trail,
    /// variation, blend and composite settings. Returns the slot index.
    pub fn register(
        &mut self,
        id: &str,
        layer: VfxLayer,
        lifetime_ms: u32,
        world_space: bool,
    ) -> FxResult<usize> {
        if id.is_empty() {
            return Err(FxError::InvalidParam("empty vfx id"));
        }
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        let def = VfxDef::new(id, layer, lifetime_ms, world_space);
        if let Some(index) = self.index_of(id) {
            self.defs[index] = def;
            return Ok(index);
        }
        if self.defs.len() >= VFX_REGISTRY_CAPACITY {
            return Err(FxError::RegistryFull);
        }
        self.defs.push(def);
        Ok(self.defs.len() - 1)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        self.defs.iter().position(|d| d.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&VfxDef> {
        self.defs.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&VfxDef> {
        self.index_of(id).and_then(|i| self.defs.get(i))
    }

    fn find_mut(&mut self, id: &str) -> FxResult<&mut VfxDef> {
        match self.index_of(id) {
            Some(i) => Ok(&mut self.defs[i]),
            None => Err(FxError::UnknownVfx(id.to_owned())),
        }
    }

    pub fn set_emitter(&mut self, id: &str, emitter: EmitterParams) -> FxResult<()> {
        let def = self.find_mut(id)?;
        def.emitter = EmitterParams::new(
            emitter.rate_hz,
            emitter.particle_lifetime_ms,
            emitter.max_particles,
        );
        Ok(())
    }

    pub fn set_trail(&mut self, id: &str, trail: TrailParams) -> FxResult<()> {
        let def = self.find_mut(id)?;
        def.trail = TrailParams::new(trail.rate_hz, trail.lifetime_ms, trail.max_particles);
        Ok(())
    }

    pub fn set_variation(
        &mut self,
        id: &str,
        scale: Variation,
        lifetime: Variation,
    ) -> FxResult<()> {
        let def = self.find_mut(id)?;
        def.scale_variation = scale;
        def.lifetime_variation = lifetime;
        Ok(())
    }

    pub fn set_blend(&mut self, id: &str, blend: BlendMode) -> FxResult<()> {
        self.find_mut(id)?.blend = blend;
        Ok(())
    }

    /// Unknown ids report the default blend.
    pub fn blend(&self, id: &str) -> BlendMode {
        self.find(id).map(|d| d.blend).unwrap_or_default()
    }

    /// Register `id` as a composite of already-registered children.
    /// Children past [`MAX_COMPOSITE_CHILDREN`] are dropped; unknown child
    /// ids are kept as empty slots that never spawn.
    pub fn define_composite(
        &mut self,
        id: &str,
        layer: VfxLayer,
        lifetime_ms: u32,
        world_space: bool,
        children: &[(&str, u32)],
        mode: CompositeMode,
    ) -> FxResult<usize> {
        if mode == CompositeMode::None {
            return Err(FxError::InvalidParam("composite mode"));
        }
        let index = self.register(id, layer, lifetime_ms, world_space)?;
        let resolved: Vec<CompositeChild> = children
            .iter()
            .take(MAX_COMPOSITE_CHILDREN)
            .map(|&(child, delay_ms)| CompositeChild {
                def: self.index_of(child),
                delay_ms,
            })
            .collect();
        let def = &mut self.defs[index];
        def.composite = mode;
        def.children = resolved;
        Ok(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VfxDef> {
        self.defs.iter()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reregister_resets_extras() {
        let mut reg = VfxRegistry::new();
        reg.register("spark", VfxLayer::Fg, 500, true).unwrap();
        reg.set_emitter("spark", EmitterParams::new(10.0, 100, 5)).unwrap();
        reg.set_blend("spark", BlendMode::Additive).unwrap();
        let idx = reg.register("spark", VfxLayer::Bg, 200, false).unwrap();
        assert_eq!(idx, 0);
        let def = reg.find("spark").unwrap();
        assert_eq!(def.layer, VfxLayer::Bg);
        assert!(!def.emitter.is_active());
        assert_eq!(def.blend, BlendMode::Alpha);
    }

    #[test]
    fn negative_rates_clamp_to_zero() {
        let mut reg = VfxRegistry::new();
        reg.register("smoke", VfxLayer::Mid, 1000, true).unwrap();
        reg.set_emitter(
            "smoke",
            EmitterParams {
                rate_hz: -4.0,
                particle_lifetime_ms: 100,
                max_particles: 3,
            },
        )
        .unwrap();
        assert_eq!(reg.find("smoke").unwrap().emitter.rate_hz, 0.0);
    }

    #[test]
    fn setters_reject_unknown_ids() {
        let mut reg = VfxRegistry::new();
        assert_eq!(
            reg.set_trail("ghost", TrailParams::new(1.0, 1, 1)),
            Err(FxError::UnknownVfx("ghost".into()))
        );
        assert_eq!(reg.blend("ghost"), BlendMode::Alpha);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut reg = VfxRegistry::new();
        for i in 0..VFX_REGISTRY_CAPACITY {
            reg.register(&format!("v{i}"), VfxLayer::Mid, 10, true).unwrap();
        }
        assert_eq!(reg.register("extra", VfxLayer::Mid, 10, true), Err(FxError::RegistryFull));
        assert!(reg.register("v3", VfxLayer::Ui, 10, false).is_ok());
    }

    #[test]
    fn composite_resolves_and_truncates_children() {
        let mut reg = VfxRegistry::new();
        reg.register("flash", VfxLayer::Fg, 100, true).unwrap();
        reg.register("ring", VfxLayer::Fg, 100, true).unwrap();
        let children: Vec<(&str, u32)> = (0..10)
            .map(|i| if i % 2 == 0 { ("flash", i * 10) } else { ("missing", i * 10) })
            .collect();
        reg.define_composite("boom", VfxLayer::Fg, 1000, true, &children, CompositeMode::Chain)
            .unwrap();
        let def = reg.find("boom").unwrap();
        assert!(def.is_composite());
        assert_eq!(def.children.len(), MAX_COMPOSITE_CHILDREN);
        assert_eq!(def.children[0].def, Some(0));
        assert_eq!(def.children[1].def, None);
        assert_eq!(def.children[7].delay_ms, 70);
    }

    #[test]
    fn composite_needs_a_mode() {
        let mut reg = VfxRegistry::new();
        assert!(matches!(
            reg.define_composite("x", VfxLayer::Mid, 10, true, &[], CompositeMode::None),
            Err(FxError::InvalidParam(_))
        ));
        assert!(reg.is_empty());
    }
}
