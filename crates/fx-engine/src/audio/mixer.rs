use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::types::{EffectEvent, FxError, FxResult};
use crate::audio::backend::{AudioBackend, ClipHandle, NullBackend};
use crate::audio::music::MusicFsm;
use crate::audio::registry::{AudioCategory, AudioRegistry};
use crate::core::rng::FxRng;

pub const DEFAULT_VOICE_CAP: usize = 16;
pub const DEFAULT_FALLOFF_RADIUS: f32 = 10.0;
pub const DEFAULT_LOWPASS_STRENGTH: f32 = 0.8;
pub const DEFAULT_LOWPASS_MIN_FACTOR: f32 = 0.4;

/// Time constant of the reverb wet approach, in ms.
const REVERB_SMOOTH_MS: f32 = 250.0;

/// Multiplicative hash constant for variant selection.
const VARIANT_FRAME_MUL: u32 = 2_654_435_761;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    #[default]
    None,
    Cave,
    Hall,
    Chamber,
}

impl ReverbPreset {
    pub fn target_wet(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Cave => 0.55,
            Self::Hall => 0.40,
            Self::Chamber => 0.30,
        }
    }
}

/// Clip registry, gain staging and environment state in front of an
/// [`AudioBackend`].
///
/// Gain is a pure function of mixer and music state (`effective_gain`);
/// the backend only ever sees the final volume.
pub struct AudioMixer<B: AudioBackend = NullBackend> {
    registry: AudioRegistry,
    backend: B,
    rng: FxRng,

    master: f32,
    categories: [f32; AudioCategory::COUNT],
    muted: bool,

    positional: bool,
    listener: Vec2,
    falloff_radius: f32,

    lowpass_enabled: bool,
    lowpass_strength: f32,
    lowpass_min_factor: f32,

    reverb_preset: ReverbPreset,
    reverb_target: f32,
    reverb_wet: f32,

    voice_cap: usize,
}

impl AudioMixer<NullBackend> {
    pub fn new(seed: u32) -> Self {
        Self::with_backend(NullBackend::default(), seed)
    }
}

impl<B: AudioBackend> AudioMixer<B> {
    pub fn with_backend(backend: B, seed: u32) -> Self {
        Self {
            registry: AudioRegistry::new(),
            backend,
            rng: FxRng::new(seed),
            master: 1.0,
            categories: [1.0; AudioCategory::COUNT],
            muted: false,
            positional: false,
            listener: Vec2::ZERO,
            falloff_radius: DEFAULT_FALLOFF_RADIUS,
            lowpass_enabled: false,
            lowpass_strength: DEFAULT_LOWPASS_STRENGTH,
            lowpass_min_factor: DEFAULT_LOWPASS_MIN_FACTOR,
            reverb_preset: ReverbPreset::None,
            reverb_target: 0.0,
            reverb_wet: 0.0,
            voice_cap: DEFAULT_VOICE_CAP,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn registry(&self) -> &AudioRegistry {
        &self.registry
    }

    // -- Registry --

    /// Upsert a clip. A previously loaded resource for the same id is
    /// released and reloaded lazily on next play.
    pub fn register_clip(
        &mut self,
        id: &str,
        path: &str,
        category: AudioCategory,
        base_gain: f32,
    ) -> FxResult<()> {
        if let Some(old) = self.registry.register(id, path, category, base_gain)? {
            self.backend.unload_clip(old);
        }
        Ok(())
    }

    pub fn clip_path(&self, id: &str) -> Option<&str> {
        self.registry.clip_path(id)
    }

    /// Drop every clip and reset reverb and low-pass to defaults. Gains,
    /// mute and positional settings are kept.
    pub fn clear(&mut self) {
        for handle in self.registry.clear() {
            self.backend.unload_clip(handle);
        }
        self.reverb_preset = ReverbPreset::None;
        self.reverb_target = 0.0;
        self.reverb_wet = 0.0;
        self.lowpass_enabled = false;
        self.lowpass_strength = DEFAULT_LOWPASS_STRENGTH;
        self.lowpass_min_factor = DEFAULT_LOWPASS_MIN_FACTOR;
    }

    // -- Gain staging --

    pub fn set_master(&mut self, gain: f32) {
        self.master = gain.clamp(0.0, 1.0);
    }

    pub fn master(&self) -> f32 {
        self.master
    }

    pub fn set_category_gain(&mut self, category: AudioCategory, gain: f32) {
        self.categories[category as usize] = gain.clamp(0.0, 1.0);
    }

    pub fn category_gain(&self, category: AudioCategory) -> f32 {
        self.categories[category as usize]
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_voice_cap(&mut self, cap: usize) {
        self.voice_cap = cap;
    }

    // -- Positional --

    pub fn set_listener(&mut self, pos: Vec2) {
        self.listener = pos;
    }

    pub fn listener(&self) -> Vec2 {
        self.listener
    }

    pub fn enable_positional(&mut self, enabled: bool) {
        self.positional = enabled;
    }

    /// Non-positive radii are ignored.
    pub fn set_falloff_radius(&mut self, radius: f32) {
        if radius > 0.0 {
            self.falloff_radius = radius;
        }
    }

    pub fn falloff_radius(&self) -> f32 {
        self.falloff_radius
    }

    /// Linear distance attenuation in [0, 1]; 1 when positional audio is off.
    pub fn attenuation(&self, pos: Vec2) -> f32 {
        if !self.positional {
            return 1.0;
        }
        let d2 = pos.distance_squared(self.listener);
        if d2 >= self.falloff_radius * self.falloff_radius {
            return 0.0;
        }
        (1.0 - d2.sqrt() / self.falloff_radius).clamp(0.0, 1.0)
    }

    // -- Environment --

    pub fn enable_lowpass(&mut self, enabled: bool) {
        self.lowpass_enabled = enabled;
    }

    pub fn lowpass_enabled(&self) -> bool {
        self.lowpass_enabled
    }

    pub fn set_lowpass_params(&mut self, strength: f32, min_factor: f32) {
        self.lowpass_strength = strength.clamp(0.0, 1.0);
        self.lowpass_min_factor = min_factor.clamp(0.0, 1.0);
    }

    /// (strength, min factor)
    pub fn lowpass_params(&self) -> (f32, f32) {
        (self.lowpass_strength, self.lowpass_min_factor)
    }

    pub fn set_reverb_preset(&mut self, preset: ReverbPreset) {
        self.reverb_preset = preset;
        self.reverb_target = preset.target_wet();
    }

    pub fn reverb_preset(&self) -> ReverbPreset {
        self.reverb_preset
    }

    pub fn reverb_wet(&self) -> f32 {
        self.reverb_wet
    }

    /// Move the reverb wet level toward its preset target.
    pub fn update_environment(&mut self, dt_ms: u32) {
        let target = self.reverb_target.clamp(0.0, 1.0);
        let step = (dt_ms as f32 / REVERB_SMOOTH_MS).min(1.0);
        self.reverb_wet += (target - self.reverb_wet) * step;
    }

    // -- Playback --

    /// Final volume for `id` played `repeats` times at `pos`. Unknown ids
    /// are silent.
    pub fn effective_gain(&self, music: &MusicFsm, id: &str, repeats: u32, pos: Vec2) -> f32 {
        let Some(clip) = self.registry.find(id) else {
            return 0.0;
        };
        let repeats = repeats.max(1) as f32;
        let base = (clip.base_gain * (0.7 + 0.3 * repeats)).min(1.0);

        let mut category_gain = self.categories[clip.category as usize];
        let mut music_weight = 1.0;
        if clip.category == AudioCategory::Music {
            music_weight = music.music_weight(&clip.id);
            category_gain *= music.duck_gain();
        }

        let attenuation = self.attenuation(pos);
        let mut lowpass = 1.0;
        if self.lowpass_enabled && clip.category != AudioCategory::Music {
            let min = self.lowpass_min_factor;
            let hf = (min + (1.0 - min) * attenuation).clamp(min, 1.0);
            lowpass = (1.0 - self.lowpass_strength * (1.0 - hf)).max(0.0);
        }

        if self.muted {
            return 0.0;
        }
        (base * self.master * category_gain * music_weight * attenuation * lowpass).clamp(0.0, 1.0)
    }

    /// Pick among `<id>_<suffix>` variants, falling back to `id` itself.
    pub fn resolve_variant(&mut self, id: &str, frame: u32, seq: u32) -> String {
        let variants = self.registry.variants_of(id);
        if variants.is_empty() {
            return id.to_owned();
        }
        let s = frame.wrapping_mul(VARIANT_FRAME_MUL) ^ seq ^ self.rng.next_u32();
        variants[(s % variants.len() as u32) as usize].to_owned()
    }

    /// Play a bus event: resolve a variant, load lazily, respect the voice
    /// cap and set the channel volume to the effective gain.
    pub fn dispatch_play(&mut self, music: &MusicFsm, event: &EffectEvent) -> FxResult<()> {
        let chosen = self.resolve_variant(event.id_str(), event.emit_frame, event.seq);
        let handle = self.ensure_loaded(&chosen)?;
        if self.voice_cap_reached() {
            log::debug!("audio: voice cap {} reached, skipping '{chosen}'", self.voice_cap);
            return Ok(());
        }
        let repeats = event.effective_repeats() as u32;
        let gain = self.effective_gain(music, &chosen, repeats, Vec2::new(event.x, event.y));
        self.backend.set_volume(gain);
        self.backend.play(handle)
    }

    /// Play a clip by exact id, no variant resolution or volume change.
    pub fn play_by_id(&mut self, id: &str) -> FxResult<()> {
        let handle = self.ensure_loaded(id)?;
        if self.voice_cap_reached() {
            return Ok(());
        }
        self.backend.play(handle)
    }

    fn voice_cap_reached(&self) -> bool {
        self.voice_cap > 0 && self.backend.playing_voices() >= self.voice_cap
    }

    fn ensure_loaded(&mut self, id: &str) -> FxResult<ClipHandle> {
        let Some(clip) = self.registry.find_mut(id) else {
            log::warn!("audio id not found: {id}");
            return Err(FxError::UnknownAudio(id.to_owned()));
        };
        if let Some(handle) = clip.handle {
            return Ok(handle);
        }
        match self.backend.load_clip(&clip.path) {
            Ok(handle) => {
                clip.handle = Some(handle);
                Ok(handle)
            }
            Err(e) => {
                log::warn!("audio lazy load failed id={id} path={}: {e}", clip.path);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Priority;
    use crate::audio::backend::{BackendCall, RecordingBackend};
    use crate::audio::music::MusicState;

    const EPS: f32 = 1e-5;

    fn mixer() -> AudioMixer<RecordingBackend> {
        let mut m = AudioMixer::with_backend(RecordingBackend::new(), 1);
        m.register_clip("hit", "sfx/hit.wav", AudioCategory::Sfx, 0.5).unwrap();
        m.register_clip("click", "ui/click.wav", AudioCategory::Ui, 1.0).unwrap();
        m.register_clip("theme", "music/theme.ogg", AudioCategory::Music, 1.0).unwrap();
        m.register_clip("battle", "music/battle.ogg", AudioCategory::Music, 1.0).unwrap();
        m
    }

    #[test]
    fn repeats_boost_is_capped() {
        let m = mixer();
        let music = MusicFsm::new();
        assert!((m.effective_gain(&music, "hit", 1, Vec2::ZERO) - 0.5).abs() < EPS);
        assert!((m.effective_gain(&music, "hit", 0, Vec2::ZERO) - 0.5).abs() < EPS);
        assert!((m.effective_gain(&music, "hit", 2, Vec2::ZERO) - 0.65).abs() < EPS);
        assert_eq!(m.effective_gain(&music, "hit", 10, Vec2::ZERO), 1.0);
        assert_eq!(m.effective_gain(&music, "missing", 1, Vec2::ZERO), 0.0);
    }

    #[test]
    fn master_category_and_mute() {
        let mut m = mixer();
        let music = MusicFsm::new();
        m.set_master(0.5);
        m.set_category_gain(AudioCategory::Ui, 0.5);
        assert!((m.effective_gain(&music, "click", 1, Vec2::ZERO) - 0.25).abs() < EPS);
        m.set_master(3.0);
        assert_eq!(m.master(), 1.0);
        m.set_mute(true);
        assert_eq!(m.effective_gain(&music, "click", 1, Vec2::ZERO), 0.0);
    }

    #[test]
    fn positional_attenuation() {
        let mut m = mixer();
        let music = MusicFsm::new();
        m.enable_positional(true);
        m.set_listener(Vec2::new(1.0, 1.0));
        m.set_falloff_radius(10.0);
        assert!((m.attenuation(Vec2::new(6.0, 1.0)) - 0.5).abs() < EPS);
        assert_eq!(m.attenuation(Vec2::new(11.0, 1.0)), 0.0);
        assert_eq!(m.attenuation(Vec2::new(50.0, 1.0)), 0.0);
        assert!((m.effective_gain(&music, "click", 1, Vec2::new(6.0, 1.0)) - 0.5).abs() < EPS);
        m.set_falloff_radius(-1.0);
        assert_eq!(m.falloff_radius(), 10.0);
        m.enable_positional(false);
        assert_eq!(m.attenuation(Vec2::new(50.0, 1.0)), 1.0);
    }

    #[test]
    fn lowpass_skips_music() {
        let mut m = mixer();
        let mut music = MusicFsm::new();
        m.enable_positional(true);
        m.enable_lowpass(true);
        // attenuation 0.5 → hf = 0.4 + 0.6·0.5 = 0.7 → lp = 1 - 0.8·0.3 = 0.76
        let g = m.effective_gain(&music, "click", 1, Vec2::new(5.0, 0.0));
        assert!((g - 0.5 * 0.76).abs() < EPS);

        music.register_state_track(m.registry(), MusicState::Explore, "theme").unwrap();
        music.set_state(MusicState::Explore, 0).unwrap();
        let g = m.effective_gain(&music, "theme", 1, Vec2::new(5.0, 0.0));
        assert!((g - 0.5).abs() < EPS);
    }

    #[test]
    fn lowpass_params_clamp() {
        let mut m = mixer();
        assert_eq!(m.lowpass_params(), (0.8, 0.4));
        m.set_lowpass_params(2.0, -1.0);
        assert_eq!(m.lowpass_params(), (1.0, 0.0));
    }

    #[test]
    fn music_gain_uses_crossfade_and_duck() {
        let m = mixer();
        let mut music = MusicFsm::new();
        music.register_state_track(m.registry(), MusicState::Explore, "theme").unwrap();
        music.register_state_track(m.registry(), MusicState::Combat, "battle").unwrap();
        music.set_state(MusicState::Explore, 0).unwrap();
        music.set_state(MusicState::Combat, 1000).unwrap();
        music.update(250);
        assert!((m.effective_gain(&music, "battle", 1, Vec2::ZERO) - 0.25).abs() < EPS);
        assert!((m.effective_gain(&music, "theme", 1, Vec2::ZERO) - 0.75).abs() < EPS);

        music.duck_music(0.5, 0, 1000, 0);
        assert!((m.effective_gain(&music, "battle", 1, Vec2::ZERO) - 0.125).abs() < EPS);
        // Ducking never touches other categories.
        assert!((m.effective_gain(&music, "click", 1, Vec2::ZERO) - 1.0).abs() < EPS);
    }

    #[test]
    fn reverb_approaches_target() {
        let mut m = mixer();
        m.set_reverb_preset(ReverbPreset::Cave);
        m.update_environment(125);
        assert!((m.reverb_wet() - 0.275).abs() < EPS);
        m.update_environment(1000);
        assert!((m.reverb_wet() - 0.55).abs() < EPS);
        m.set_reverb_preset(ReverbPreset::None);
        m.update_environment(0);
        assert!((m.reverb_wet() - 0.55).abs() < EPS);
    }

    #[test]
    fn dispatch_loads_lazily_and_sets_volume() {
        let mut m = mixer();
        let music = MusicFsm::new();
        let ev = EffectEvent::audio("click", Priority::Ui, 0.0, 0.0);
        m.dispatch_play(&music, &ev).unwrap();
        m.dispatch_play(&music, &ev).unwrap();
        let loads = m.backend().calls.iter().filter(|c| matches!(c, BackendCall::Load(_))).count();
        assert_eq!(loads, 1);
        assert_eq!(m.backend().played_paths(), vec!["ui/click.wav", "ui/click.wav"]);
        assert_eq!(m.backend().play_volumes(), vec![1.0, 1.0]);
    }

    #[test]
    fn dispatch_unknown_and_failed_load() {
        let mut m = mixer();
        let music = MusicFsm::new();
        let ev = EffectEvent::audio("ghost", Priority::Ui, 0.0, 0.0);
        assert_eq!(m.dispatch_play(&music, &ev), Err(FxError::UnknownAudio("ghost".into())));

        m.backend_mut().failing_paths.push("sfx/hit.wav".into());
        let ev = EffectEvent::audio("hit", Priority::Combat, 0.0, 0.0);
        assert!(matches!(m.dispatch_play(&music, &ev), Err(FxError::Backend(_))));
        assert!(m.backend().played_paths().is_empty());
    }

    #[test]
    fn voice_cap_skips_play() {
        let mut m = mixer();
        let music = MusicFsm::new();
        m.backend_mut().voices = DEFAULT_VOICE_CAP;
        let ev = EffectEvent::audio("click", Priority::Ui, 0.0, 0.0);
        assert!(m.dispatch_play(&music, &ev).is_ok());
        assert!(m.backend().played_paths().is_empty());
        m.set_voice_cap(0);
        m.dispatch_play(&music, &ev).unwrap();
        assert_eq!(m.backend().played_paths().len(), 1);
    }

    #[test]
    fn variants_resolve_deterministically() {
        let pick = || {
            let mut m = AudioMixer::new(99);
            for id in ["step_1", "step_2", "step_3"] {
                m.register_clip(id, "p.wav", AudioCategory::Sfx, 1.0).unwrap();
            }
            (0..8).map(|f| m.resolve_variant("step", f, 0)).collect::<Vec<_>>()
        };
        let a = pick();
        assert_eq!(a, pick());
        assert!(a.iter().all(|id| id.starts_with("step_")));
    }

    #[test]
    fn dispatch_plays_a_variant() {
        let mut m = mixer();
        let music = MusicFsm::new();
        m.register_clip("hit_a", "sfx/hit_a.wav", AudioCategory::Sfx, 1.0).unwrap();
        m.dispatch_play(&music, &EffectEvent::audio("hit", Priority::Combat, 0.0, 0.0)).unwrap();
        assert_eq!(m.backend().played_paths(), vec!["sfx/hit_a.wav"]);
    }

    #[test]
    fn reregister_unloads_and_clear_resets_environment() {
        let mut m = mixer();
        m.play_by_id("hit").unwrap();
        m.register_clip("hit", "sfx/hit_v2.wav", AudioCategory::Sfx, 1.0).unwrap();
        assert!(m.backend().calls.iter().any(|c| matches!(c, BackendCall::Unload(_))));
        assert_eq!(m.clip_path("hit"), Some("sfx/hit_v2.wav"));

        m.enable_lowpass(true);
        m.set_reverb_preset(ReverbPreset::Hall);
        m.clear();
        assert!(m.registry().is_empty());
        assert!(!m.lowpass_enabled());
        assert_eq!(m.reverb_preset(), ReverbPreset::None);
    }
}
