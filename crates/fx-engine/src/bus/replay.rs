//! Record/playback of bus traffic and the hashes used to compare runs.

use serde::{Deserialize, Serialize};

use crate::api::types::{EffectEvent, FxError, FxResult};
use crate::bus::queue::FxBus;
use crate::core::hash::{fnv1a64, FNV_OFFSET_BASIS, FNV_PRIME};

/// Default number of events a recording or playback buffer holds.
pub const REPLAY_CAPACITY: usize = 2048;

/// Capture buffer fed by `FxBus::emit` while a session is active.
#[derive(Debug, Clone)]
pub struct Recorder {
    events: Vec<EffectEvent>,
    capacity: usize,
    active: bool,
}

impl Recorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity,
            active: false,
        }
    }

    pub fn begin(&mut self) {
        self.events.clear();
        self.active = true;
    }

    /// Append a stamped event; silently ignored when inactive or full.
    pub fn capture(&mut self, event: &EffectEvent) {
        if self.active && self.events.len() < self.capacity {
            self.events.push(*event);
        }
    }

    pub fn end(&mut self) -> Vec<EffectEvent> {
        self.active = false;
        std::mem::take(&mut self.events)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Playback buffer plus the session hash accumulator.
#[derive(Debug, Clone)]
pub struct FxReplay {
    playback: Vec<EffectEvent>,
    capacity: usize,
    hash: u64,
}

impl FxReplay {
    pub fn new() -> Self {
        Self::with_capacity(REPLAY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            playback: Vec::new(),
            capacity,
            hash: FNV_OFFSET_BASIS,
        }
    }

    /// Replace the playback buffer. Anything past capacity is dropped.
    pub fn load(&mut self, events: &[EffectEvent]) {
        let n = events.len().min(self.capacity);
        self.playback.clear();
        self.playback.extend_from_slice(&events[..n]);
    }

    pub fn clear(&mut self) {
        self.playback.clear();
    }

    pub fn len(&self) -> usize {
        self.playback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playback.is_empty()
    }

    /// Re-emit into the bus's current frame every loaded event whose
    /// original `emit_frame` equals `frame_index`. Returns how many the bus
    /// accepted.
    pub fn enqueue_frame(&self, frame_index: u32, bus: &mut FxBus) -> usize {
        self.playback
            .iter()
            .filter(|e| e.emit_frame == frame_index)
            .filter(|e| bus.emit(**e).is_ok())
            .count()
    }

    /// Restart the session hash. Zero selects the FNV offset basis.
    pub fn hash_reset(&mut self, seed: u64) {
        self.hash = if seed == 0 { FNV_OFFSET_BASIS } else { seed };
    }

    /// Fold one frame digest into the session hash.
    pub fn accumulate_frame(&mut self, frame_digest: u32) {
        self.hash ^= frame_digest as u64;
        self.hash = self.hash.wrapping_mul(FNV_PRIME);
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }
}

impl Default for FxReplay {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a over the raw bytes of each event, chained. Empty input hashes to 0.
pub fn events_hash(events: &[EffectEvent]) -> u64 {
    if events.is_empty() {
        return 0;
    }
    events.iter().fold(FNV_OFFSET_BASIS, |h, ev| {
        (h ^ fnv1a64(bytemuck::bytes_of(ev))).wrapping_mul(FNV_PRIME)
    })
}

/// Serializable recorded session, for tooling that stores runs on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub events: Vec<EffectEvent>,
}

impl ReplayLog {
    pub fn new(events: Vec<EffectEvent>) -> Self {
        Self { events }
    }

    pub fn from_json(json: &str) -> FxResult<Self> {
        serde_json::from_str(json).map_err(|e| FxError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> FxResult<String> {
        serde_json::to_string(self).map_err(|e| FxError::Config(e.to_string()))
    }

    pub fn hash(&self) -> u64 {
        events_hash(&self.events)
    }
}
