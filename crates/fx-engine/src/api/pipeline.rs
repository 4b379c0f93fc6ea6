use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::types::{EffectEvent, FxError, FxResult};
use crate::audio::backend::{AudioBackend, NullBackend};
use crate::audio::mixer::{AudioMixer, DEFAULT_VOICE_CAP};
use crate::audio::music::{MusicFsm, MusicState};
use crate::bus::mapping::{DamageEvent, DamageObserver, FxMap};
use crate::bus::queue::{EffectSink, FxBus, QUEUE_CAPACITY};
use crate::bus::replay::{FxReplay, REPLAY_CAPACITY};
use crate::renderer::camera::DEFAULT_PIXELS_PER_WORLD;
use crate::systems::vfx::VfxSim;

/// Pipeline configuration. Every field has a default, so a partial JSON
/// object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Seed for audio variant selection (default: 0x2545F491).
    pub mixer_seed: u32,
    /// Seed for VFX variation draws (default: 0x9E3779B9).
    pub vfx_seed: u32,
    /// Concurrent voices before plays are skipped; 0 disables (default: 16).
    pub voice_cap: usize,
    /// Events accepted per frame (default: 256).
    pub queue_capacity: usize,
    /// Events kept by a recording and by playback (default: 2048).
    pub replay_capacity: usize,
    /// Initial world → screen scale (default: 32).
    pub pixels_per_world: f32,
    /// Initial VFX emission scale in [0, 1] (default: 1).
    pub perf_scale: f32,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            mixer_seed: 0x2545_F491,
            vfx_seed: 0x9E37_79B9,
            voice_cap: DEFAULT_VOICE_CAP,
            queue_capacity: QUEUE_CAPACITY,
            replay_capacity: REPLAY_CAPACITY,
            pixels_per_world: DEFAULT_PIXELS_PER_WORLD,
            perf_scale: 1.0,
        }
    }
}

impl FxConfig {
    pub fn from_json(json: &str) -> FxResult<Self> {
        serde_json::from_str(json).map_err(|e| FxError::Config(e.to_string()))
    }
}

/// The whole effects pipeline for one game session.
///
/// Per frame: `frame_begin` → `emit`/`trigger`* → `frame_end` →
/// `dispatch_process` → `update`. Subsystems are public for direct
/// configuration; the methods here only cover calls that need more than
/// one of them.
pub struct FxPipeline<B: AudioBackend = NullBackend> {
    pub bus: FxBus,
    pub map: FxMap,
    pub replay: FxReplay,
    pub mixer: AudioMixer<B>,
    pub music: MusicFsm,
    pub vfx: VfxSim,
}

impl FxPipeline<NullBackend> {
    /// Silent pipeline with default configuration.
    pub fn new() -> Self {
        Self::with_backend(NullBackend::default(), &FxConfig::default())
    }

    pub fn from_config(config: &FxConfig) -> Self {
        Self::with_backend(NullBackend::default(), config)
    }
}

impl Default for FxPipeline<NullBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: AudioBackend> FxPipeline<B> {
    pub fn with_backend(backend: B, config: &FxConfig) -> Self {
        let mut mixer = AudioMixer::with_backend(backend, config.mixer_seed);
        mixer.set_voice_cap(config.voice_cap);
        Self {
            bus: FxBus::with_capacity(config.queue_capacity, config.replay_capacity),
            map: FxMap::new(),
            replay: FxReplay::with_capacity(config.replay_capacity),
            mixer,
            music: MusicFsm::new(),
            vfx: VfxSim::new(config.vfx_seed)
                .with_pixels_per_world(config.pixels_per_world)
                .with_perf_scale(config.perf_scale),
        }
    }

    // -- Frame flow --

    pub fn frame_begin(&mut self, frame_index: u32) {
        self.bus.frame_begin(frame_index);
        self.music.sync_frame(frame_index);
    }

    pub fn emit(&mut self, event: EffectEvent) -> FxResult<()> {
        self.bus.emit(event)
    }

    /// Emit every effect mapped to `key`. Returns how many were queued.
    pub fn trigger(&mut self, key: &str, pos: Vec2) -> usize {
        self.map.trigger(&mut self.bus, key, pos.x, pos.y)
    }

    /// Queue the loaded playback events stamped with `frame_index`.
    pub fn replay_frame(&mut self, frame_index: u32) -> usize {
        self.replay.enqueue_frame(frame_index, &mut self.bus)
    }

    pub fn frame_end(&mut self) {
        self.bus.frame_end();
    }

    /// Route this frame's events to the mixer and the VFX simulator.
    /// Returns the number of dispatched (compacted) events.
    pub fn dispatch_process(&mut self) -> usize {
        let mut sink = Dispatch {
            mixer: &mut self.mixer,
            music: &self.music,
            vfx: &mut self.vfx,
        };
        self.bus.dispatch_process(&mut sink)
    }

    /// Advance VFX, music and mixer environment by `dt_ms`.
    pub fn update(&mut self, dt_ms: u32) {
        self.vfx.update(dt_ms);
        self.music.update(dt_ms);
        self.mixer.update_environment(dt_ms);
    }

    pub fn frame_digest(&self) -> u32 {
        self.bus.frame_digest()
    }

    // -- Music, needs the mixer's clip registry --

    pub fn register_music_track(&mut self, state: MusicState, track_id: &str) -> FxResult<()> {
        self.music.register_state_track(self.mixer.registry(), state, track_id)
    }

    pub fn add_music_layer(
        &mut self,
        state: MusicState,
        track_id: &str,
        gain: f32,
    ) -> FxResult<()> {
        self.music.add_layer(self.mixer.registry(), state, track_id, gain)
    }

    // -- Gameplay hooks --

    /// Trigger the `damage/<type>/...` keys for one damage event at the
    /// origin. Returns how many effects were queued.
    pub fn on_damage_event(&mut self, event: &DamageEvent) -> usize {
        self.map.trigger_damage(&mut self.bus, event)
    }
}

impl<B: AudioBackend> DamageObserver for FxPipeline<B> {
    fn on_damage(&mut self, event: &DamageEvent) {
        self.on_damage_event(event);
    }
}

/// Borrowed view of the pipeline that the bus dispatches into.
struct Dispatch<'a, B: AudioBackend> {
    mixer: &'a mut AudioMixer<B>,
    music: &'a MusicFsm,
    vfx: &'a mut VfxSim,
}

impl<B: AudioBackend> EffectSink for Dispatch<'_, B> {
    fn play_audio(&mut self, event: &EffectEvent) {
        if let Err(e) = self.mixer.dispatch_play(self.music, event) {
            log::debug!("fx dispatch: audio '{}' not played: {e}", event.id_str());
        }
    }

    fn spawn_vfx(&mut self, event: &EffectEvent) {
        // Failures are already logged by the simulator.
        let _ = self.vfx.dispatch_spawn(event);
    }
}
