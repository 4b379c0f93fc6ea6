//! Pooled VFX simulation: registered effect definitions, live instances,
//! emitted particles, composites, decals and screen shake.
//!
//! [`VfxSim`] is the facade. It never draws; renderers pull projected
//! [`ScreenSprite`]s and per-particle attributes through the query methods.

mod decal;
mod emission;
mod particle;
mod post;
mod registry;
mod shake;
mod stats;

pub use decal::{Decal, DecalDef, DecalRegistry, DECAL_REGISTRY_CAPACITY, MAX_DECALS};
pub use emission::{advance_instances, tick_emitters};
pub use particle::{Particle, VfxInstance, VfxOverrides, DEFAULT_COLOR};
pub use post::{ColorLut, PostFx};
pub use registry::{
    CompositeChild, CompositeMode, VfxDef, VfxRegistry, MAX_COMPOSITE_CHILDREN,
    VFX_REGISTRY_CAPACITY,
};
pub use shake::{ScreenShake, MAX_SHAKES};
pub use stats::{SpawnBudget, VfxFrameStats};

use glam::Vec2;

use crate::api::types::{EffectEvent, FxError, FxResult};
use crate::components::emitter::{EmitterParams, TrailParams, Variation};
use crate::components::layer::{BlendMode, VfxLayer};
use crate::core::pool::{Handle, PoolAudit, SlotPool};
use crate::core::rng::FxRng;
use crate::renderer::camera::ScreenTransform;
use crate::renderer::instance::ScreenSprite;

/// Live VFX instances.
pub const MAX_INSTANCES: usize = 256;

/// Live particles across all instances.
pub const MAX_PARTICLES: usize = 1024;

pub struct VfxSim {
    registry: VfxRegistry,
    instances: SlotPool<VfxInstance>,
    particles: SlotPool<Particle>,
    decal_registry: DecalRegistry,
    decals: SlotPool<Decal>,
    shakes: SlotPool<ScreenShake>,
    rng: FxRng,
    screen: ScreenTransform,
    post: PostFx,
    budget: SpawnBudget,
    last_stats: VfxFrameStats,
    /// Multiplier on update dt. Negative behaves as 0.
    timescale: f32,
    frozen: bool,
    /// Emission rate multiplier in [0, 1].
    perf_scale: f32,
    gpu_batch: bool,
}

impl VfxSim {
    /// Create a simulator whose variation draws are seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            registry: VfxRegistry::new(),
            instances: SlotPool::new(MAX_INSTANCES),
            particles: SlotPool::new(MAX_PARTICLES),
            decal_registry: DecalRegistry::new(),
            decals: SlotPool::new(MAX_DECALS),
            shakes: SlotPool::new(MAX_SHAKES),
            rng: FxRng::new(seed),
            screen: ScreenTransform::default(),
            post: PostFx::default(),
            budget: SpawnBudget::default(),
            last_stats: VfxFrameStats::default(),
            timescale: 1.0,
            frozen: false,
            perf_scale: 1.0,
            gpu_batch: false,
        }
    }

    pub fn with_pixels_per_world(mut self, pixels_per_world: f32) -> Self {
        self.screen.set(self.screen.camera, pixels_per_world);
        self
    }

    pub fn with_perf_scale(mut self, scale: f32) -> Self {
        self.set_perf_scale(scale);
        self
    }

    // -- Registry --

    pub fn registry(&self) -> &VfxRegistry {
        &self.registry
    }

    pub fn def(&self, id: &str) -> Option<&VfxDef> {
        self.registry.find(id)
    }

    /// Insert or replace a definition, resetting its emitter, trail,
    /// variation, blend and composite settings.
    pub fn register(
        &mut self,
        id: &str,
        layer: VfxLayer,
        lifetime_ms: u32,
        world_space: bool,
    ) -> FxResult<()> {
        self.registry.register(id, layer, lifetime_ms, world_space).map(|_| ())
    }

    pub fn set_emitter(&mut self, id: &str, emitter: EmitterParams) -> FxResult<()> {
        self.registry.set_emitter(id, emitter)
    }

    pub fn set_trail(&mut self, id: &str, trail: TrailParams) -> FxResult<()> {
        self.registry.set_trail(id, trail)
    }

    pub fn set_variation(
        &mut self,
        id: &str,
        scale: Variation,
        lifetime: Variation,
    ) -> FxResult<()> {
        self.registry.set_variation(id, scale, lifetime)
    }

    pub fn set_blend(&mut self, id: &str, blend: BlendMode) -> FxResult<()> {
        self.registry.set_blend(id, blend)
    }

    pub fn blend(&self, id: &str) -> BlendMode {
        self.registry.blend(id)
    }

    /// `children` are `(child id, delay ms)` pairs. See [`CompositeMode`]
    /// for how delays are measured.
    pub fn define_composite(
        &mut self,
        id: &str,
        layer: VfxLayer,
        lifetime_ms: u32,
        world_space: bool,
        children: &[(&str, u32)],
        mode: CompositeMode,
    ) -> FxResult<()> {
        self.registry
            .define_composite(id, layer, lifetime_ms, world_space, children, mode)
            .map(|_| ())
    }

    /// Drop every definition together with the instances and particles
    /// that referenced them.
    pub fn clear_registry(&mut self) {
        self.registry.clear();
        self.instances.clear();
        self.particles.clear();
    }

    // -- Spawning --

    pub fn spawn(&mut self, id: &str, pos: Vec2) -> FxResult<Handle> {
        self.spawn_with_overrides(id, pos, VfxOverrides::default())
    }

    pub fn spawn_with_overrides(
        &mut self,
        id: &str,
        pos: Vec2,
        overrides: VfxOverrides,
    ) -> FxResult<Handle> {
        let def = self
            .registry
            .index_of(id)
            .ok_or_else(|| FxError::UnknownVfx(id.to_owned()))?;
        self.instances
            .allocate(VfxInstance::new(def, pos, overrides))
            .ok_or(FxError::PoolExhausted)
    }

    /// Spawn for a dispatched bus event at the event's position.
    pub fn dispatch_spawn(&mut self, event: &EffectEvent) -> FxResult<Handle> {
        let id = event.id_str();
        let result = self.spawn(id, Vec2::new(event.x, event.y));
        match &result {
            Err(FxError::UnknownVfx(_)) => log::warn!("vfx id not found: {id}"),
            Err(FxError::PoolExhausted) => log::debug!("vfx: instance pool full, dropping '{id}'"),
            _ => {}
        }
        result
    }

    // -- Simulation --

    pub fn set_timescale(&mut self, timescale: f32) {
        self.timescale = timescale;
    }

    pub fn timescale(&self) -> f32 {
        self.timescale
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Clamped to [0, 1].
    pub fn set_perf_scale(&mut self, scale: f32) {
        self.perf_scale = if scale.is_nan() { 1.0 } else { scale.clamp(0.0, 1.0) };
    }

    pub fn perf_scale(&self) -> f32 {
        self.perf_scale
    }

    /// Zero disables a cap.
    pub fn set_spawn_budgets(&mut self, soft_cap: u32, hard_cap: u32) {
        self.budget.soft_cap = soft_cap;
        self.budget.hard_cap = hard_cap;
    }

    pub fn set_pacing_guard(&mut self, enabled: bool, threshold: u32) {
        self.budget.pacing_enabled = enabled;
        self.budget.pacing_threshold = threshold;
    }

    pub fn spawn_budget(&self) -> SpawnBudget {
        self.budget
    }

    /// Advance the simulation by `dt_ms` of wall time.
    pub fn update(&mut self, dt_ms: u32) {
        if self.frozen {
            return;
        }
        let mut stats = VfxFrameStats::default();
        let scaled_ms = dt_ms as f32 * self.timescale.max(0.0);
        let step = scaled_ms as u32;

        let due = advance_instances(&self.registry, &mut self.instances, step);
        tick_emitters(
            &self.registry,
            &mut self.instances,
            &mut self.particles,
            &mut self.rng,
            &self.budget,
            self.perf_scale,
            scaled_ms,
            &mut stats,
        );
        // Children start aging and emitting on the next update.
        for (def, pos) in due {
            let child = VfxInstance::new(def, pos, VfxOverrides::default());
            if self.instances.allocate(child).is_none() {
                log::debug!("vfx: instance pool full, composite child dropped");
            }
        }

        self.particles.retain(|_, p| p.tick(step));
        self.shakes.retain(|_, s| s.tick(step));
        let decal_defs = &self.decal_registry;
        self.decals.retain(|_, d| {
            d.age_ms = d.age_ms.saturating_add(step);
            decal_defs.get(d.def).is_some_and(|def| d.age_ms <= def.lifetime_ms)
        });

        stats.active_particles = self.particles.len() as u32;
        stats.active_instances = self.instances.len() as u32;
        stats.active_decals = self.decals.len() as u32;
        self.last_stats = stats;
    }

    /// Counters from the most recent non-frozen update.
    pub fn profiler_last(&self) -> VfxFrameStats {
        self.last_stats
    }

    pub fn instance_pool_audit(&self) -> PoolAudit {
        self.instances.audit()
    }

    pub fn particle_pool_audit(&self) -> PoolAudit {
        self.particles.audit()
    }

    // -- Instance queries --

    pub fn active_count(&self) -> usize {
        self.instances.len()
    }

    pub fn layer_active_count(&self, layer: VfxLayer) -> usize {
        self.instances
            .iter()
            .filter(|(_, inst)| self.registry.get(inst.def).is_some_and(|d| d.layer == layer))
            .count()
    }

    /// Kill every instance. Particles already emitted live out their lifetime.
    pub fn clear_active(&mut self) {
        self.instances.clear();
    }

    pub fn instance(&self, handle: Handle) -> Option<&VfxInstance> {
        self.instances.get(handle)
    }

    /// Position and world-space flag of the first live instance of `id`.
    pub fn peek_first(&self, id: &str) -> Option<(Vec2, bool)> {
        let index = self.registry.index_of(id)?;
        let world_space = self.registry.get(index)?.world_space;
        self.instances
            .iter()
            .find(|(_, inst)| inst.def == index)
            .map(|(_, inst)| (inst.pos, world_space))
    }

    // -- Particle queries --

    pub fn particles_active_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles_trail_count(&self) -> usize {
        self.particles.iter().filter(|(_, p)| p.trail).count()
    }

    pub fn particles_layer_count(&self, layer: VfxLayer) -> usize {
        self.particles.iter().filter(|(_, p)| p.layer == layer).count()
    }

    /// Layers that currently hold particles, back to front.
    pub fn collect_ordered_layers(&self, max: usize) -> Vec<VfxLayer> {
        VfxLayer::ALL
            .into_iter()
            .filter(|&layer| self.particles_layer_count(layer) > 0)
            .take(max)
            .collect()
    }

    /// Particles projected through the current camera, in pool order.
    pub fn particles_collect_screen(&self, max: usize) -> Vec<ScreenSprite> {
        self.particles
            .iter()
            .take(max)
            .map(|(_, p)| {
                ScreenSprite::new(self.screen.project(p.pos, p.world_space), p.layer)
                    .with_scale(p.scale)
                    .with_color(p.color)
            })
            .collect()
    }

    pub fn collect_scales(&self, max: usize) -> Vec<f32> {
        self.particles.iter().take(max).map(|(_, p)| p.scale).collect()
    }

    pub fn collect_colors(&self, max: usize) -> Vec<u32> {
        self.particles.iter().take(max).map(|(_, p)| p.color).collect()
    }

    pub fn collect_lifetimes(&self, max: usize) -> Vec<u32> {
        self.particles.iter().take(max).map(|(_, p)| p.lifetime_ms).collect()
    }

    // -- Camera / renderer hints --

    /// A non-positive `pixels_per_world` keeps the previous scale.
    pub fn set_camera(&mut self, camera: Vec2, pixels_per_world: f32) {
        self.screen.set(camera, pixels_per_world);
    }

    pub fn screen(&self) -> ScreenTransform {
        self.screen
    }

    pub fn post(&self) -> &PostFx {
        &self.post
    }

    pub fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    pub fn set_gpu_batch_enabled(&mut self, enabled: bool) {
        self.gpu_batch = enabled;
    }

    pub fn gpu_batch_enabled(&self) -> bool {
        self.gpu_batch
    }

    // -- Decals --

    pub fn register_decal(
        &mut self,
        id: &str,
        layer: VfxLayer,
        lifetime_ms: u32,
        world_space: bool,
        size: f32,
    ) -> FxResult<()> {
        self.decal_registry
            .register(id, layer, lifetime_ms, world_space, size)
            .map(|_| ())
    }

    pub fn decal_def(&self, id: &str) -> Option<&DecalDef> {
        self.decal_registry.find(id)
    }

    /// Drop every decal definition and placed decal.
    pub fn clear_decal_registry(&mut self) {
        self.decal_registry.clear();
        self.decals.clear();
    }

    /// A non-positive `scale` becomes 1.
    pub fn spawn_decal(&mut self, id: &str, pos: Vec2, angle: f32, scale: f32) -> FxResult<Handle> {
        let def = self
            .decal_registry
            .index_of(id)
            .ok_or_else(|| FxError::UnknownDecal(id.to_owned()))?;
        self.decals
            .allocate(Decal {
                def,
                pos,
                angle,
                scale: if scale > 0.0 { scale } else { 1.0 },
                age_ms: 0,
            })
            .ok_or(FxError::PoolExhausted)
    }

    pub fn decal_active_count(&self) -> usize {
        self.decals.len()
    }

    pub fn decal_layer_count(&self, layer: VfxLayer) -> usize {
        self.decals
            .iter()
            .filter(|(_, d)| self.decal_registry.get(d.def).is_some_and(|def| def.layer == layer))
            .count()
    }

    /// Projected decals. Sprite scale is `size · scale`.
    pub fn decals_collect_screen(&self, max: usize) -> Vec<ScreenSprite> {
        self.decals
            .iter()
            .filter_map(|(_, d)| {
                let def = self.decal_registry.get(d.def)?;
                Some(
                    ScreenSprite::new(self.screen.project(d.pos, def.world_space), def.layer)
                        .with_rotation(d.angle)
                        .with_scale(def.size * d.scale),
                )
            })
            .take(max)
            .collect()
    }

    // -- Screen shake --

    pub fn add_shake(
        &mut self,
        amplitude: f32,
        frequency_hz: f32,
        duration_ms: u32,
    ) -> FxResult<Handle> {
        let shake = ScreenShake::new(amplitude, frequency_hz, duration_ms)?;
        self.shakes.allocate(shake).ok_or(FxError::PoolExhausted)
    }

    pub fn clear_shakes(&mut self) {
        self.shakes.clear();
    }

    pub fn shake_count(&self) -> usize {
        self.shakes.len()
    }

    /// Sum of all live shake offsets.
    pub fn shake_offset(&self) -> Vec2 {
        self.shakes.iter().map(|(_, s)| s.offset()).sum()
    }
}
