use glam::Vec2;

use crate::components::emitter::VARIATION_FLOOR;
use crate::core::pool::{Handle, SlotPool};
use crate::core::rng::FxRng;

use super::particle::{Particle, VfxInstance};
use super::registry::{CompositeMode, VfxRegistry};
use super::stats::{SpawnBudget, VfxFrameStats};

/// Age every instance by `dt_ms`, free the expired ones and walk composite
/// schedules. Returns the `(def, position)` of each child that came due;
/// the caller allocates them.
/// Free function so the registry can be borrowed alongside the pool.
pub fn advance_instances(
    registry: &VfxRegistry,
    instances: &mut SlotPool<VfxInstance>,
    dt_ms: u32,
) -> Vec<(usize, Vec2)> {
    let mut due = Vec::new();
    instances.retain(|_, inst| {
        inst.age_ms = inst.age_ms.saturating_add(dt_ms);
        let Some(def) = registry.get(inst.def) else {
            return false;
        };
        if inst.age_ms >= inst.lifetime_ms(def.lifetime_ms) {
            return false;
        }
        if !def.is_composite() {
            return true;
        }
        while let Some(child) = def.children.get(inst.next_child) {
            let origin = match def.composite {
                CompositeMode::Chain => inst.last_child_ms,
                _ => 0,
            };
            if inst.age_ms < origin.saturating_add(child.delay_ms) {
                break;
            }
            if let Some(child_def) = child.def {
                due.push((child_def, inst.pos));
            }
            inst.last_child_ms = inst.age_ms;
            inst.next_child += 1;
        }
        true
    });
    due
}

/// Run core and trail emitters of every live instance for `dt_ms` of scaled
/// time. Spawn counts are capped per instance, then by `budget`.
#[allow(clippy::too_many_arguments)]
pub fn tick_emitters(
    registry: &VfxRegistry,
    instances: &mut SlotPool<VfxInstance>,
    particles: &mut SlotPool<Particle>,
    rng: &mut FxRng,
    budget: &SpawnBudget,
    perf_scale: f32,
    dt_ms: f32,
    stats: &mut VfxFrameStats,
) {
    let dt_sec = dt_ms * 0.001;
    for (handle, inst) in instances.iter_mut() {
        let Some(def) = registry.get(inst.def) else {
            continue;
        };

        if def.emitter.is_active() {
            let want = drain(&mut inst.emit_accum, def.emitter.rate_hz * dt_sec * perf_scale);
            if want > 0 {
                let live = owned_count(particles, handle, false);
                let room = def.emitter.max_particles.saturating_sub(live);
                let count = budget.limit(want.min(room), stats);
                for _ in 0..count {
                    if particles.is_full() {
                        break;
                    }
                    let scale = inst.overrides.scale_or_default() * def.scale_variation.sample(rng);
                    let mul = def.lifetime_variation.sample(rng).max(VARIATION_FLOOR);
                    let lifetime_ms =
                        (def.emitter.particle_lifetime_ms as f32 * mul).max(1.0) as u32;
                    particles.allocate(Particle {
                        owner: handle,
                        trail: false,
                        layer: def.layer,
                        world_space: def.world_space,
                        pos: inst.pos,
                        scale,
                        color: inst.overrides.color_or_default(),
                        age_ms: 0,
                        lifetime_ms,
                    });
                    stats.spawned_core += 1;
                }
            }
        }

        if def.trail.is_active() {
            let want = drain(&mut inst.trail_accum, def.trail.rate_hz * dt_sec * perf_scale);
            if want > 0 {
                let live = owned_count(particles, handle, true);
                let room = def.trail.max_particles.saturating_sub(live);
                let count = budget.limit(want.min(room), stats);
                for _ in 0..count {
                    let spawned = particles.allocate(Particle {
                        owner: handle,
                        trail: true,
                        layer: def.layer,
                        world_space: def.world_space,
                        pos: inst.pos,
                        scale: inst.overrides.scale_or_default(),
                        color: inst.overrides.color_or_default(),
                        age_ms: 0,
                        lifetime_ms: def.trail.lifetime_ms,
                    });
                    if spawned.is_none() {
                        break;
                    }
                    stats.spawned_trail += 1;
                }
            }
        }
    }
}

/// Add `amount` to the accumulator and take out its whole part.
fn drain(accum: &mut f32, amount: f32) -> u32 {
    *accum += amount;
    let whole = *accum as u32;
    if whole > 0 {
        *accum -= whole as f32;
    }
    whole
}

fn owned_count(particles: &SlotPool<Particle>, owner: Handle, trail: bool) -> u32 {
    particles
        .iter()
        .filter(|(_, p)| p.owner == owner && p.trail == trail)
        .count() as u32
}
