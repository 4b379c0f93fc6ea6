use serde::{Deserialize, Serialize};

use crate::api::pipeline::FxPipeline;
use crate::api::types::{EffectKind, FxError, FxResult, Priority};
use crate::audio::backend::AudioBackend;
use crate::audio::music::MusicState;
use crate::audio::registry::AudioCategory;
use crate::components::emitter::{EmitterParams, TrailParams, Variation};
use crate::components::layer::{BlendMode, VfxLayer};
use crate::systems::vfx::{CompositeMode, VfxSim};

/// Declarative description of every registered effect for a game.
/// Loaded from a JSON file at runtime; applying it again is an upsert,
/// which makes it the hot-reload entry point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsManifest {
    /// Audio clips, registered before anything that references them.
    pub audio: Vec<AudioClipDescriptor>,
    /// Base track and sweetener layers per music state.
    pub music: Vec<MusicStateDescriptor>,
    /// VFX definitions. Composites may reference any plain entry.
    pub vfx: Vec<VfxDescriptor>,
    pub decals: Vec<DecalDescriptor>,
    /// Gameplay key → effect rows.
    pub mappings: Vec<MappingDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClipDescriptor {
    pub id: String,
    /// Relative path to the audio file.
    pub path: String,
    #[serde(default)]
    pub category: AudioCategory,
    /// Base gain in [0, 1] (default: 1).
    #[serde(default = "default_gain")]
    pub gain: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicStateDescriptor {
    pub state: MusicState,
    /// Clip id of the base track; must be a music-category clip.
    pub track: String,
    #[serde(default)]
    pub layers: Vec<MusicLayerDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicLayerDescriptor {
    pub track: String,
    #[serde(default = "default_gain")]
    pub gain: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfxDescriptor {
    pub id: String,
    #[serde(default)]
    pub layer: VfxLayer,
    pub lifetime_ms: u32,
    /// Default: true.
    #[serde(default = "default_world_space")]
    pub world_space: bool,
    #[serde(default)]
    pub emitter: Option<EmitterParams>,
    #[serde(default)]
    pub trail: Option<TrailParams>,
    #[serde(default)]
    pub scale_variation: Variation,
    #[serde(default)]
    pub lifetime_variation: Variation,
    #[serde(default)]
    pub blend: BlendMode,
    #[serde(default)]
    pub composite: Option<CompositeDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeDescriptor {
    pub mode: CompositeMode,
    pub children: Vec<CompositeChildDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeChildDescriptor {
    pub id: String,
    #[serde(default)]
    pub delay_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecalDescriptor {
    pub id: String,
    #[serde(default)]
    pub layer: VfxLayer,
    pub lifetime_ms: u32,
    #[serde(default = "default_world_space")]
    pub world_space: bool,
    /// Default: 1.
    #[serde(default = "default_gain")]
    pub size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDescriptor {
    pub key: String,
    pub kind: EffectKind,
    pub effect_id: String,
    #[serde(default)]
    pub priority: Priority,
}

/// Outcome of [`EffectsManifest::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub failed: usize,
}

impl ApplyReport {
    fn record(&mut self, section: &str, id: &str, result: FxResult<()>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(e) => {
                log::warn!("effects manifest: {section} '{id}' skipped: {e}");
                self.failed += 1;
            }
        }
    }
}

fn default_gain() -> f32 {
    1.0
}

fn default_world_space() -> bool {
    true
}

impl EffectsManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> FxResult<Self> {
        serde_json::from_str(json).map_err(|e| FxError::Config(e.to_string()))
    }

    /// Register everything into `fx`. Failing rows are logged and skipped;
    /// the rest still apply. Mappings and music layers are replaced
    /// wholesale, all other registries are upserted.
    pub fn apply<B: AudioBackend>(&self, fx: &mut FxPipeline<B>) -> ApplyReport {
        let mut report = ApplyReport::default();
        fx.map.clear();
        fx.music.clear_layers();

        for clip in &self.audio {
            let result = fx.mixer.register_clip(&clip.id, &clip.path, clip.category, clip.gain);
            report.record("audio", &clip.id, result);
        }

        for entry in &self.music {
            let result = fx.register_music_track(entry.state, &entry.track);
            report.record("music", &entry.track, result);
            for layer in &entry.layers {
                let result = fx.add_music_layer(entry.state, &layer.track, layer.gain);
                report.record("music layer", &layer.track, result);
            }
        }

        // Composites resolve their children at definition time, so every
        // plain definition goes first.
        for def in self.vfx.iter().filter(|d| d.composite.is_none()) {
            let result = fx
                .vfx
                .register(&def.id, def.layer, def.lifetime_ms, def.world_space)
                .and_then(|()| apply_vfx_settings(&mut fx.vfx, def));
            report.record("vfx", &def.id, result);
        }
        for def in &self.vfx {
            let Some(composite) = &def.composite else {
                continue;
            };
            let children: Vec<(&str, u32)> = composite
                .children
                .iter()
                .map(|c| (c.id.as_str(), c.delay_ms))
                .collect();
            let result = fx
                .vfx
                .define_composite(
                    &def.id,
                    def.layer,
                    def.lifetime_ms,
                    def.world_space,
                    &children,
                    composite.mode,
                )
                .and_then(|()| apply_vfx_settings(&mut fx.vfx, def));
            report.record("composite", &def.id, result);
        }

        for decal in &self.decals {
            let result = fx.vfx.register_decal(
                &decal.id,
                decal.layer,
                decal.lifetime_ms,
                decal.world_space,
                decal.size,
            );
            report.record("decal", &decal.id, result);
        }

        for row in &self.mappings {
            let result = fx.map.register(&row.key, row.kind, &row.effect_id, row.priority);
            report.record("mapping", &row.key, result);
        }

        log::info!(
            "effects manifest applied: {} entries, {} failed",
            report.applied,
            report.failed
        );
        report
    }
}

fn apply_vfx_settings(vfx: &mut VfxSim, def: &VfxDescriptor) -> FxResult<()> {
    if let Some(emitter) = def.emitter {
        vfx.set_emitter(&def.id, emitter)?;
    }
    if let Some(trail) = def.trail {
        vfx.set_trail(&def.id, trail)?;
    }
    vfx.set_variation(&def.id, def.scale_variation, def.lifetime_variation)?;
    vfx.set_blend(&def.id, def.blend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    const MANIFEST: &str = r#"{
        "audio": [
            { "id": "hit", "path": "sfx/hit.wav" },
            { "id": "hit_1", "path": "sfx/hit_1.wav", "gain": 0.8 },
            { "id": "explore", "path": "music/explore.ogg", "category": "music" },
            { "id": "explore_drums", "path": "music/drums.ogg", "category": "music" }
        ],
        "music": [
            { "state": "explore", "track": "explore",
              "layers": [ { "track": "explore_drums", "gain": 0.5 } ] }
        ],
        "vfx": [
            { "id": "boom", "layer": "fg", "lifetime_ms": 1000,
              "composite": { "mode": "chain",
                             "children": [ { "id": "flash" },
                                          { "id": "smoke", "delay_ms": 100 } ] } },
            { "id": "flash", "layer": "fg", "lifetime_ms": 120, "blend": "additive" },
            { "id": "smoke", "layer": "mid", "lifetime_ms": 800,
              "emitter": { "rate_hz": 30.0, "particle_lifetime_ms": 400, "max_particles": 12 },
              "scale_variation": { "kind": "uniform", "min": 0.8, "max": 1.2 } }
        ],
        "decals": [ { "id": "scorch", "layer": "bg", "lifetime_ms": 5000, "size": 2.0 } ],
        "mappings": [
            { "key": "enemy/die", "kind": "vfx_spawn", "effect_id": "boom" },
            { "key": "enemy/die", "kind": "audio_play", "effect_id": "hit", "priority": "ui" }
        ]
    }"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = EffectsManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.audio.len(), 4);
        assert_eq!(manifest.audio[0].gain, 1.0);
        assert_eq!(manifest.audio[2].category, AudioCategory::Music);
        assert_eq!(manifest.vfx[0].composite.as_ref().unwrap().mode, CompositeMode::Chain);
        assert!(manifest.vfx[1].world_space);
        assert_eq!(manifest.mappings[1].priority, Priority::Ui);
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = EffectsManifest::from_json("{}").unwrap();
        assert!(manifest.vfx.is_empty());
        assert!(matches!(EffectsManifest::from_json("[1]"), Err(FxError::Config(_))));
    }

    #[test]
    fn apply_registers_everything() {
        let manifest = EffectsManifest::from_json(MANIFEST).unwrap();
        let mut fx = FxPipeline::new();
        let report = manifest.apply(&mut fx);
        assert_eq!(report, ApplyReport { applied: 12, failed: 0 });

        assert_eq!(fx.mixer.clip_path("hit_1"), Some("sfx/hit_1.wav"));
        assert_eq!(fx.music.layer_count(MusicState::Explore), 1);
        assert_eq!(fx.vfx.blend("flash"), BlendMode::Additive);
        let boom = fx.vfx.def("boom").unwrap();
        assert!(boom.children.iter().all(|c| c.def.is_some()));
        assert_eq!(fx.vfx.decal_def("scorch").unwrap().size, 2.0);
        assert_eq!(fx.map.len(), 2);

        fx.frame_begin(0);
        assert_eq!(fx.trigger("enemy/die", Vec2::ZERO), 2);
    }

    #[test]
    fn reapply_is_idempotent() {
        let manifest = EffectsManifest::from_json(MANIFEST).unwrap();
        let mut fx = FxPipeline::new();
        manifest.apply(&mut fx);
        manifest.apply(&mut fx);
        assert_eq!(fx.map.len(), 2);
        assert_eq!(fx.music.layer_count(MusicState::Explore), 1);
        assert_eq!(fx.vfx.registry().len(), 3);
        assert_eq!(fx.mixer.registry().len(), 4);
    }

    #[test]
    fn bad_rows_are_skipped() {
        let json = r#"{
            "audio": [ { "id": "door", "path": "sfx/door.wav" } ],
            "music": [ { "state": "combat", "track": "door" } ],
            "vfx": [ { "id": "", "lifetime_ms": 10 }, { "id": "ok", "lifetime_ms": 10 } ],
            "mappings": [ { "key": "", "kind": "audio_play", "effect_id": "door" } ]
        }"#;
        let mut fx = FxPipeline::new();
        let report = EffectsManifest::from_json(json).unwrap().apply(&mut fx);
        assert_eq!(report, ApplyReport { applied: 2, failed: 3 });
        assert!(fx.vfx.def("ok").is_some());
    }
}
