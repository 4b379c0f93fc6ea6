use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Bytes reserved for an effect id, including the NUL terminator.
pub const EFFECT_ID_LEN: usize = 24;

/// What an effect event asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EffectKind {
    AudioPlay = 0,
    VfxSpawn = 1,
}

impl EffectKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AudioPlay),
            1 => Some(Self::VfxSpawn),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Declared dispatch priority. Lower values dispatch first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Priority {
    Ui = 0,
    #[default]
    Combat = 1,
    Environment = 2,
    Background = 3,
}

impl Priority {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ui),
            1 => Some(Self::Combat),
            2 => Some(Self::Environment),
            3 => Some(Self::Background),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A single effect request travelling through the frame bus.
///
/// Plain-old-data so that replay tooling can hash the exact bytes.
/// `emit_frame` and `seq` are stamped by the bus; callers leave them zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct EffectEvent {
    pub emit_frame: u32,
    pub seq: u32,
    pub priority: u8,
    pub kind: u8,
    /// Stacked occurrences; 0 is read as 1.
    pub repeats: u16,
    pub id: [u8; EFFECT_ID_LEN],
    pub x: f32,
    pub y: f32,
}

impl EffectEvent {
    pub fn new(kind: EffectKind, priority: Priority, id: &str, x: f32, y: f32) -> Self {
        Self {
            emit_frame: 0,
            seq: 0,
            priority: priority.as_u8(),
            kind: kind.as_u8(),
            repeats: 1,
            id: fixed_id(id),
            x,
            y,
        }
    }

    pub fn audio(id: &str, priority: Priority, x: f32, y: f32) -> Self {
        Self::new(EffectKind::AudioPlay, priority, id, x, y)
    }

    pub fn vfx(id: &str, priority: Priority, x: f32, y: f32) -> Self {
        Self::new(EffectKind::VfxSpawn, priority, id, x, y)
    }

    pub fn with_repeats(mut self, repeats: u16) -> Self {
        self.repeats = repeats;
        self
    }

    /// Decoded kind, or None for a corrupted tag.
    pub fn effect_kind(&self) -> Option<EffectKind> {
        EffectKind::from_u8(self.kind)
    }

    pub fn priority_level(&self) -> Option<Priority> {
        Priority::from_u8(self.priority)
    }

    pub fn effective_repeats(&self) -> u16 {
        if self.repeats == 0 { 1 } else { self.repeats }
    }

    /// Id bytes up to the first NUL.
    pub fn id_bytes(&self) -> &[u8] {
        let end = self.id.iter().position(|&b| b == 0).unwrap_or(EFFECT_ID_LEN);
        &self.id[..end]
    }

    pub fn id_str(&self) -> &str {
        std::str::from_utf8(self.id_bytes()).unwrap_or("")
    }

    /// Compaction identity: (kind, priority, id).
    pub fn same_identity(&self, other: &EffectEvent) -> bool {
        self.kind == other.kind
            && self.priority == other.priority
            && self.id_bytes() == other.id_bytes()
    }
}

/// Truncate `s` to at most `max_bytes`, never splitting a UTF-8 sequence.
pub fn truncate_id(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// NUL-padded fixed id; keeps room for the terminator.
pub fn fixed_id(s: &str) -> [u8; EFFECT_ID_LEN] {
    let mut out = [0u8; EFFECT_ID_LEN];
    let bytes = truncate_id(s, EFFECT_ID_LEN - 1).as_bytes();
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

/// Errors surfaced at the crate's API boundary. Nothing here is fatal:
/// callers may log or ignore every variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FxError {
    #[error("event queue full")]
    QueueFull,

    #[error("registry at capacity")]
    RegistryFull,

    #[error("pool exhausted")]
    PoolExhausted,

    #[error("unknown audio id: {0}")]
    UnknownAudio(String),

    #[error("unknown vfx id: {0}")]
    UnknownVfx(String),

    #[error("unknown decal id: {0}")]
    UnknownDecal(String),

    #[error("no track registered: {0}")]
    UnknownTrack(String),

    #[error("clip is not in the music category: {0}")]
    NotMusicTrack(String),

    #[error("music layer limit reached")]
    LayerLimit,

    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),

    #[error("audio backend: {0}")]
    Backend(String),

    #[error("config: {0}")]
    Config(String),
}

pub type FxResult<T> = Result<T, FxError>;
