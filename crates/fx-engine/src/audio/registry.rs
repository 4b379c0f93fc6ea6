use serde::{Deserialize, Serialize};

use crate::api::types::{truncate_id, FxError, FxResult, EFFECT_ID_LEN};
use crate::audio::backend::ClipHandle;

/// Maximum registered clips.
pub const AUDIO_REGISTRY_CAPACITY: usize = 64;

/// Longest stored clip path, in bytes.
pub const AUDIO_PATH_MAX: usize = 127;

/// Mixer channel group a clip belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AudioCategory {
    #[default]
    Sfx = 0,
    Ui = 1,
    Ambience = 2,
    Music = 3,
}

impl AudioCategory {
    pub const COUNT: usize = 4;

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Sfx),
            1 => Some(Self::Ui),
            2 => Some(Self::Ambience),
            3 => Some(Self::Music),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub id: String,
    pub path: String,
    pub category: AudioCategory,
    /// Always in [0, 1].
    pub base_gain: f32,
    /// Backend resource, populated on first play.
    pub handle: Option<ClipHandle>,
}

/// Fixed-capacity id → clip table. Insertion order is preserved; it is the
/// order variant candidates are enumerated in.
#[derive(Debug, Clone, Default)]
pub struct AudioRegistry {
    clips: Vec<AudioClip>,
}

impl AudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a clip. Updating replaces path/category/gain and
    /// drops any loaded handle, which is returned so the caller can release it.
    pub fn register(
        &mut self,
        id: &str,
        path: &str,
        category: AudioCategory,
        base_gain: f32,
    ) -> FxResult<Option<ClipHandle>> {
        if id.is_empty() {
            return Err(FxError::InvalidParam("empty clip id"));
        }
        if path.is_empty() {
            return Err(FxError::InvalidParam("empty clip path"));
        }
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        let path = truncate_id(path, AUDIO_PATH_MAX).to_owned();
        let base_gain = base_gain.clamp(0.0, 1.0);

        if let Some(clip) = self.clips.iter_mut().find(|c| c.id == id) {
            clip.path = path;
            clip.category = category;
            clip.base_gain = base_gain;
            return Ok(clip.handle.take());
        }
        if self.clips.len() >= AUDIO_REGISTRY_CAPACITY {
            return Err(FxError::RegistryFull);
        }
        self.clips.push(AudioClip {
            id: id.to_owned(),
            path,
            category,
            base_gain,
            handle: None,
        });
        Ok(None)
    }

    pub fn find(&self, id: &str) -> Option<&AudioClip> {
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut AudioClip> {
        let id = truncate_id(id, EFFECT_ID_LEN - 1);
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub fn clip_path(&self, id: &str) -> Option<&str> {
        self.find(id).map(|c| c.path.as_str())
    }

    /// Ids registered as variants of `base`, i.e. of the form `base_<suffix>`.
    /// The base id itself is not a variant.
    pub fn variants_of(&self, base: &str) -> Vec<&str> {
        self.clips
            .iter()
            .filter(|c| {
                c.id.len() > base.len()
                    && c.id.starts_with(base)
                    && c.id.as_bytes()[base.len()] == b'_'
            })
            .map(|c| c.id.as_str())
            .take(MAX_VARIANTS)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioClip> {
        self.clips.iter()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Remove every clip, returning the handles that were loaded.
    pub fn clear(&mut self) -> Vec<ClipHandle> {
        self.clips.drain(..).filter_map(|c| c.handle).collect()
    }
}

/// Upper bound on variant candidates considered per play.
pub const MAX_VARIANTS: usize = 32;
