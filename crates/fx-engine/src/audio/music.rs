//! Music state machine: per-state base tracks, linear cross-fades,
//! bar-aligned transitions, the ducking envelope and sweetener layers.

use serde::{Deserialize, Serialize};

use crate::api::types::{FxError, FxResult};
use crate::audio::registry::{AudioCategory, AudioRegistry};

/// Sweetener tracks a single state may carry.
pub const MAX_LAYERS_PER_STATE: usize = 4;

pub const DEFAULT_BPM: f32 = 120.0;
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Gameplay music context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MusicState {
    #[default]
    Explore = 0,
    Combat = 1,
    Boss = 2,
    Town = 3,
}

impl MusicState {
    pub const COUNT: usize = 4;

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Explore),
            1 => Some(Self::Combat),
            2 => Some(Self::Boss),
            3 => Some(Self::Town),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Layer {
    track_id: String,
    gain: f32,
}

/// Attack/hold/release envelope measured from the `duck_music` call.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Duck {
    target: f32,
    attack_ms: u32,
    hold_ms: u32,
    release_ms: u32,
    elapsed_ms: u32,
}

impl Duck {
    /// Gain at the current elapsed time, and whether the envelope is done.
    fn sample(&self) -> (f32, bool) {
        let e = self.elapsed_ms;
        let attack_end = self.attack_ms;
        let hold_end = self.attack_ms.saturating_add(self.hold_ms);
        if e <= attack_end {
            let t = if self.attack_ms > 0 {
                (e as f32 / self.attack_ms as f32).clamp(0.0, 1.0)
            } else {
                1.0
            };
            (1.0 + t * (self.target - 1.0), false)
        } else if e <= hold_end {
            (self.target, false)
        } else {
            let rel = e - hold_end;
            if rel >= self.release_ms {
                return (1.0, true);
            }
            let t = rel as f32 / self.release_ms as f32;
            (self.target + t * (1.0 - self.target), false)
        }
    }
}

pub struct MusicFsm {
    state_tracks: [Option<String>; MusicState::COUNT],
    current_state: MusicState,

    active: Option<String>,
    fadeout: Option<String>,
    active_weight: f32,
    fadeout_weight: f32,
    fade_ms: u32,
    fade_elapsed_ms: u32,

    duck: Option<Duck>,
    duck_gain: f32,

    bpm: f32,
    beats_per_bar: u32,
    bar_accum_ms: f32,
    pending_bar: Option<(MusicState, u32)>,

    layers: [Vec<Layer>; MusicState::COUNT],
    sweetener: Option<Layer>,

    /// Frame index mixed into sweetener selection.
    frame: u32,
}

impl Default for MusicFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicFsm {
    pub fn new() -> Self {
        Self {
            state_tracks: Default::default(),
            current_state: MusicState::Explore,
            active: None,
            fadeout: None,
            active_weight: 0.0,
            fadeout_weight: 0.0,
            fade_ms: 0,
            fade_elapsed_ms: 0,
            duck: None,
            duck_gain: 1.0,
            bpm: DEFAULT_BPM,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            bar_accum_ms: 0.0,
            pending_bar: None,
            layers: Default::default(),
            sweetener: None,
            frame: 0,
        }
    }

    /// Forget tracks, layers and playback. Tempo and ducking are kept.
    pub fn clear(&mut self) {
        self.state_tracks = Default::default();
        self.layers = Default::default();
        self.active = None;
        self.fadeout = None;
        self.sweetener = None;
        self.active_weight = 0.0;
        self.fadeout_weight = 0.0;
        self.fade_ms = 0;
        self.fade_elapsed_ms = 0;
        self.pending_bar = None;
    }

    pub fn sync_frame(&mut self, frame_index: u32) {
        self.frame = frame_index;
    }

    /// Bind the base track for `state`. The id must name a Music clip.
    pub fn register_state_track(
        &mut self,
        registry: &AudioRegistry,
        state: MusicState,
        track_id: &str,
    ) -> FxResult<()> {
        let id = music_clip(registry, track_id)?;
        self.state_tracks[state.index()] = Some(id);
        Ok(())
    }

    /// Add a sweetener layer to `state`. Gain is clamped to [0, 1].
    pub fn add_layer(
        &mut self,
        registry: &AudioRegistry,
        state: MusicState,
        track_id: &str,
        gain: f32,
    ) -> FxResult<()> {
        let id = music_clip(registry, track_id)?;
        let layers = &mut self.layers[state.index()];
        if layers.len() >= MAX_LAYERS_PER_STATE {
            return Err(FxError::LayerLimit);
        }
        layers.push(Layer {
            track_id: id,
            gain: gain.clamp(0.0, 1.0),
        });
        Ok(())
    }

    pub fn clear_layers(&mut self) {
        self.layers = Default::default();
        self.sweetener = None;
    }

    pub fn layer_count(&self, state: MusicState) -> usize {
        self.layers[state.index()].len()
    }

    /// Switch to `state` now, cross-fading over `crossfade_ms`.
    pub fn set_state(&mut self, state: MusicState, crossfade_ms: u32) -> FxResult<()> {
        self.current_state = state;
        let track = self.state_tracks[state.index()]
            .clone()
            .ok_or_else(|| FxError::UnknownTrack(format!("{state:?}")))?;
        log::debug!("music: -> {state:?} ({track}, {crossfade_ms} ms)");
        self.begin_crossfade(track, crossfade_ms);
        Ok(())
    }

    /// Schedule a switch for the next bar boundary. Replaces any earlier
    /// pending switch.
    pub fn set_state_on_next_bar(&mut self, state: MusicState, crossfade_ms: u32) -> FxResult<()> {
        if self.state_tracks[state.index()].is_none() {
            return Err(FxError::UnknownTrack(format!("{state:?}")));
        }
        self.pending_bar = Some((state, crossfade_ms));
        Ok(())
    }

    /// Change tempo keeping the phase within the current bar.
    pub fn set_tempo(&mut self, bpm: f32, beats_per_bar: u32) {
        let bpm = bpm.clamp(20.0, 300.0);
        let beats_per_bar = beats_per_bar.clamp(1, 16);
        let prev_bar = self.bar_ms();
        let phase = if prev_bar > 1e-6 { self.bar_accum_ms / prev_bar } else { 0.0 };
        self.bpm = bpm;
        self.beats_per_bar = beats_per_bar;
        let bar = self.bar_ms();
        self.bar_accum_ms = (phase * bar).max(0.0);
        if self.bar_accum_ms > bar {
            self.bar_accum_ms %= bar;
        }
    }

    pub fn bar_ms(&self) -> f32 {
        60_000.0 / self.bpm * self.beats_per_bar as f32
    }

    pub fn tempo(&self) -> (f32, u32) {
        (self.bpm, self.beats_per_bar)
    }

    /// Duck the Music category: ramp 1 → `target` over `attack_ms`, hold,
    /// then ramp back to 1 over `release_ms`. A zero attack applies the
    /// target immediately.
    pub fn duck_music(&mut self, target: f32, attack_ms: u32, hold_ms: u32, release_ms: u32) {
        let target = target.clamp(0.0, 1.0);
        self.duck = Some(Duck {
            target,
            attack_ms,
            hold_ms,
            release_ms,
            elapsed_ms: 0,
        });
        if attack_ms == 0 {
            self.duck_gain = target;
        }
    }

    pub fn duck_gain(&self) -> f32 {
        self.duck_gain
    }

    /// Advance tempo, any cross-fade and the duck envelope by `dt_ms`.
    pub fn update(&mut self, dt_ms: u32) {
        let mut fade_dt = dt_ms;

        let bar = self.bar_ms();
        self.bar_accum_ms += dt_ms as f32;
        if self.bar_accum_ms >= bar {
            self.bar_accum_ms = (self.bar_accum_ms % bar).max(0.0);
            let since_boundary = (self.bar_accum_ms + 0.5) as u32;
            if !self.fade_in_progress() {
                if let Some((state, crossfade_ms)) = self.pending_bar.take() {
                    self.current_state = state;
                    if let Some(track) = self.state_tracks[state.index()].clone() {
                        log::debug!("music: bar boundary -> {state:?} ({track})");
                        self.begin_crossfade(track, crossfade_ms);
                        fade_dt = since_boundary.min(dt_ms);
                    }
                }
            }
        }

        if self.fade_in_progress() {
            self.fade_elapsed_ms = self.fade_elapsed_ms.saturating_add(fade_dt);
            if self.fade_elapsed_ms >= self.fade_ms {
                self.active_weight = 1.0;
                self.fadeout_weight = 0.0;
                self.fadeout = None;
                self.fade_ms = 0;
            } else {
                let t = (self.fade_elapsed_ms as f32 / self.fade_ms as f32).clamp(0.0, 1.0);
                self.active_weight = t;
                self.fadeout_weight = 1.0 - t;
            }
        }

        if let Some(duck) = self.duck.as_mut() {
            duck.elapsed_ms = duck.elapsed_ms.saturating_add(dt_ms);
            let (gain, done) = duck.sample();
            self.duck_gain = gain.clamp(0.0, 1.0);
            if done {
                self.duck = None;
            }
        }
    }

    pub fn fade_in_progress(&self) -> bool {
        self.fade_ms > 0 && self.fade_elapsed_ms < self.fade_ms
    }

    /// Cross-fade weight of a base track; 0 if it is neither active nor
    /// fading out.
    pub fn track_weight(&self, track_id: &str) -> f32 {
        if track_id.is_empty() {
            return 0.0;
        }
        if self.active.as_deref() == Some(track_id) {
            self.active_weight
        } else if self.fadeout.as_deref() == Some(track_id) {
            self.fadeout_weight
        } else {
            0.0
        }
    }

    /// Weight the mixer applies to a Music clip. With no music playing every
    /// Music clip passes at full weight; the chosen sweetener follows the
    /// active track's weight scaled by its layer gain.
    pub fn music_weight(&self, clip_id: &str) -> f32 {
        if self.active.is_none() && self.fadeout.is_none() {
            return 1.0;
        }
        if self.active.is_some() {
            if let Some(layer) = self.sweetener.as_ref().filter(|l| l.track_id == clip_id) {
                return self.active_weight * layer.gain;
            }
        }
        self.track_weight(clip_id)
    }

    pub fn current_state(&self) -> MusicState {
        self.current_state
    }

    pub fn current_track(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn fadeout_track(&self) -> Option<&str> {
        self.fadeout.as_deref()
    }

    pub fn current_layer(&self) -> Option<&str> {
        self.sweetener.as_ref().map(|l| l.track_id.as_str())
    }

    pub fn pending_transition(&self) -> Option<MusicState> {
        self.pending_bar.map(|(s, _)| s)
    }

    fn begin_crossfade(&mut self, track: String, crossfade_ms: u32) {
        if crossfade_ms == 0 || self.active.is_none() {
            self.active = Some(track);
            self.fadeout = None;
            self.active_weight = 1.0;
            self.fadeout_weight = 0.0;
            self.fade_ms = 0;
            self.fade_elapsed_ms = 0;
        } else {
            self.fadeout = self.active.replace(track);
            self.fade_ms = crossfade_ms;
            self.fade_elapsed_ms = 0;
            self.active_weight = 0.0;
            self.fadeout_weight = 1.0;
        }
        self.pick_sweetener();
    }

    /// Deterministic layer choice from (frame, state, layer count).
    fn pick_sweetener(&mut self) {
        let layers = &self.layers[self.current_state.index()];
        let count = layers.len() as u32;
        self.sweetener = None;
        if count == 0 {
            return;
        }
        let seed = self.frame
            ^ (self.current_state as u32).wrapping_mul(0x9E37_79B9)
            ^ count.wrapping_mul(0x85EB_CA6B);
        let seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let pick = if count == 1 { 0 } else { seed % count };
        self.sweetener = layers.get(pick as usize).cloned();
    }
}

fn music_clip(registry: &AudioRegistry, track_id: &str) -> FxResult<String> {
    if track_id.is_empty() {
        return Err(FxError::InvalidParam("empty track id"));
    }
    let clip = registry
        .find(track_id)
        .ok_or_else(|| FxError::UnknownTrack(track_id.to_owned()))?;
    if clip.category != AudioCategory::Music {
        return Err(FxError::NotMusicTrack(track_id.to_owned()));
    }
    Ok(clip.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn registry() -> AudioRegistry {
        let mut reg = AudioRegistry::new();
        reg.register("explore", "m/explore.ogg", AudioCategory::Music, 1.0).unwrap();
        reg.register("combat", "m/combat.ogg", AudioCategory::Music, 1.0).unwrap();
        reg.register("boss", "m/boss.ogg", AudioCategory::Music, 1.0).unwrap();
        reg.register("drums", "m/drums.ogg", AudioCategory::Music, 1.0).unwrap();
        reg.register("strings", "m/strings.ogg", AudioCategory::Music, 1.0).unwrap();
        reg.register("hit", "sfx/hit.wav", AudioCategory::Sfx, 1.0).unwrap();
        reg
    }

    fn fsm() -> MusicFsm {
        let reg = registry();
        let mut m = MusicFsm::new();
        m.register_state_track(&reg, MusicState::Explore, "explore").unwrap();
        m.register_state_track(&reg, MusicState::Combat, "combat").unwrap();
        m.register_state_track(&reg, MusicState::Boss, "boss").unwrap();
        m
    }

    #[test]
    fn register_requires_music_clip() {
        let reg = registry();
        let mut m = MusicFsm::new();
        assert_eq!(
            m.register_state_track(&reg, MusicState::Town, "hit"),
            Err(FxError::NotMusicTrack("hit".into()))
        );
        assert_eq!(
            m.register_state_track(&reg, MusicState::Town, "nope"),
            Err(FxError::UnknownTrack("nope".into()))
        );
        assert!(m.set_state(MusicState::Town, 0).is_err());
    }

    #[test]
    fn immediate_switch() {
        let mut m = fsm();
        m.set_state(MusicState::Explore, 0).unwrap();
        assert_eq!(m.track_weight("explore"), 1.0);
        m.set_state(MusicState::Combat, 0).unwrap();
        assert_eq!(m.track_weight("combat"), 1.0);
        assert_eq!(m.track_weight("explore"), 0.0);
        assert!(m.fadeout_track().is_none());
    }

    #[test]
    fn first_state_ignores_crossfade() {
        let mut m = fsm();
        m.set_state(MusicState::Explore, 800).unwrap();
        assert_eq!(m.track_weight("explore"), 1.0);
        assert!(!m.fade_in_progress());
    }

    #[test]
    fn crossfade_weights_sum_to_one() {
        let mut m = fsm();
        m.set_state(MusicState::Explore, 0).unwrap();
        m.set_state(MusicState::Combat, 1000).unwrap();
        for _ in 0..9 {
            m.update(100);
            let sum = m.track_weight("explore") + m.track_weight("combat");
            assert!((sum - 1.0).abs() < EPS);
        }
        m.update(100);
        assert_eq!(m.track_weight("combat"), 1.0);
        assert_eq!(m.track_weight("explore"), 0.0);
    }

    #[test]
    fn next_bar_transition_uses_post_boundary_time() {
        let mut m = fsm();
        m.set_state(MusicState::Explore, 0).unwrap();
        // 120 bpm, 4/4 → 2000 ms bars.
        m.update(1900);
        m.set_state_on_next_bar(MusicState::Combat, 1000).unwrap();
        m.update(50);
        assert_eq!(m.current_track(), Some("explore"));
        m.update(350);
        // Boundary at 2000; the 300 ms past it count toward the fade.
        assert_eq!(m.current_track(), Some("combat"));
        assert!((m.track_weight("combat") - 0.3).abs() < EPS);
        assert!(m.pending_transition().is_none());
    }

    #[test]
    fn pending_bar_waits_for_running_fade() {
        let mut m = fsm();
        m.set_state(MusicState::Explore, 0).unwrap();
        m.set_state(MusicState::Combat, 5000).unwrap();
        m.set_state_on_next_bar(MusicState::Boss, 0).unwrap();
        m.update(2000);
        assert_eq!(m.current_track(), Some("combat"));
        assert_eq!(m.pending_transition(), Some(MusicState::Boss));
        m.update(2000);
        m.update(2000);
        // Fade completes at 6000, after that boundary was checked.
        assert_eq!(m.current_track(), Some("combat"));
        assert!(!m.fade_in_progress());
        m.update(2000);
        assert_eq!(m.current_track(), Some("boss"));
        assert_eq!(m.track_weight("boss"), 1.0);
    }

    #[test]
    fn set_tempo_clamps_and_keeps_phase() {
        let mut m = fsm();
        m.update(1000); // half of a 2000 ms bar
        m.set_tempo(60.0, 4); // 4000 ms bars
        m.set_state_on_next_bar(MusicState::Combat, 0).unwrap();
        m.update(1999);
        assert!(m.pending_transition().is_some());
        m.update(2);
        assert!(m.pending_transition().is_none());

        m.set_tempo(1000.0, 40);
        assert_eq!(m.tempo(), (300.0, 16));
        m.set_tempo(1.0, 0);
        assert_eq!(m.tempo(), (20.0, 1));
    }

    #[test]
    fn duck_envelope_phases() {
        let mut m = fsm();
        m.duck_music(0.2, 100, 200, 100);
        m.update(100);
        assert!((m.duck_gain() - 0.2).abs() < 1e-3);
        m.update(200);
        assert!((m.duck_gain() - 0.2).abs() < 1e-3);
        m.update(50);
        assert!((m.duck_gain() - 0.6).abs() < 1e-3);
        m.update(50);
        assert_eq!(m.duck_gain(), 1.0);
    }

    #[test]
    fn zero_attack_snaps() {
        let mut m = fsm();
        m.duck_music(0.5, 0, 100, 0);
        assert_eq!(m.duck_gain(), 0.5);
        m.update(100);
        assert_eq!(m.duck_gain(), 0.5);
        m.update(1);
        assert_eq!(m.duck_gain(), 1.0);
    }

    #[test]
    fn layer_limit_and_count() {
        let reg = registry();
        let mut m = fsm();
        for _ in 0..MAX_LAYERS_PER_STATE {
            m.add_layer(&reg, MusicState::Combat, "drums", 0.5).unwrap();
        }
        assert_eq!(m.add_layer(&reg, MusicState::Combat, "drums", 0.5), Err(FxError::LayerLimit));
        assert_eq!(m.layer_count(MusicState::Combat), 4);
        assert_eq!(m.layer_count(MusicState::Explore), 0);
    }

    #[test]
    fn sweetener_choice_is_deterministic() {
        let reg = registry();
        let pick = |frame: u32| {
            let mut m = fsm();
            m.add_layer(&reg, MusicState::Combat, "drums", 0.5).unwrap();
            m.add_layer(&reg, MusicState::Combat, "strings", 0.8).unwrap();
            m.sync_frame(frame);
            m.set_state(MusicState::Combat, 0).unwrap();
            m.current_layer().map(str::to_owned)
        };
        assert_eq!(pick(42), pick(42));
        assert!(pick(7).is_some());
    }

    #[test]
    fn sweetener_weight_follows_active_track() {
        let reg = registry();
        let mut m = fsm();
        m.add_layer(&reg, MusicState::Combat, "drums", 0.5).unwrap();
        m.set_state(MusicState::Explore, 0).unwrap();
        m.set_state(MusicState::Combat, 1000).unwrap();
        assert_eq!(m.current_layer(), Some("drums"));
        m.update(400);
        assert!((m.music_weight("drums") - 0.2).abs() < EPS);
        assert!((m.music_weight("combat") - 0.4).abs() < EPS);
        assert_eq!(m.music_weight("boss"), 0.0);
    }

    #[test]
    fn silence_lets_every_music_clip_through() {
        let m = fsm();
        assert_eq!(m.music_weight("boss"), 1.0);
        assert_eq!(m.track_weight("boss"), 0.0);
    }
}
