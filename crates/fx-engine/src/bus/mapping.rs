//! Gameplay key → effect trigger table, and the damage hook that feeds it.

use crate::api::types::{
    truncate_id, EffectEvent, EffectKind, FxError, FxResult, Priority, EFFECT_ID_LEN,
};
use crate::bus::queue::FxBus;

/// Maximum mapping rows.
pub const MAP_CAPACITY: usize = 96;

/// Longest stored gameplay key, in bytes.
pub const MAP_KEY_MAX: usize = 31;

#[derive(Debug, Clone, PartialEq)]
struct MapEntry {
    key: String,
    kind: EffectKind,
    effect_id: String,
    priority: Priority,
}

/// Many-to-many table from opaque gameplay keys (`"damage/fire/crit"`) to
/// audio or VFX triggers. One key may fan out to several rows.
#[derive(Debug, Clone, Default)]
pub struct FxMap {
    entries: Vec<MapEntry>,
}

impl FxMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. Keys and ids are truncated to their stored widths.
    pub fn register(
        &mut self,
        key: &str,
        kind: EffectKind,
        effect_id: &str,
        priority: Priority,
    ) -> FxResult<()> {
        if key.is_empty() {
            return Err(FxError::InvalidParam("empty gameplay key"));
        }
        if effect_id.is_empty() {
            return Err(FxError::InvalidParam("empty effect id"));
        }
        if self.entries.len() >= MAP_CAPACITY {
            return Err(FxError::RegistryFull);
        }
        self.entries.push(MapEntry {
            key: truncate_id(key, MAP_KEY_MAX).to_owned(),
            kind,
            effect_id: truncate_id(effect_id, EFFECT_ID_LEN - 1).to_owned(),
            priority,
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit one event per row registered under `key`, in registration order.
    /// Returns how many the bus accepted.
    pub fn trigger(&self, bus: &mut FxBus, key: &str, x: f32, y: f32) -> usize {
        if key.is_empty() {
            return 0;
        }
        let key = truncate_id(key, MAP_KEY_MAX);
        self.entries
            .iter()
            .filter(|e| e.key == key)
            .filter(|e| bus.emit(EffectEvent::new(e.kind, e.priority, &e.effect_id, x, y)).is_ok())
            .count()
    }

    /// Trigger the `damage/<type>/…` keys for one damage event at the origin.
    pub fn trigger_damage(&self, bus: &mut FxBus, event: &DamageEvent) -> usize {
        event
            .keys()
            .iter()
            .map(|key| self.trigger(bus, key, 0.0, 0.0))
            .sum()
    }
}

/// Damage types the combat module reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DamageType {
    Physical = 0,
    Bleed = 1,
    Fire = 2,
    Frost = 3,
    Arcane = 4,
    Poison = 5,
    True = 6,
}

impl DamageType {
    pub const COUNT: usize = 7;

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Physical),
            1 => Some(Self::Bleed),
            2 => Some(Self::Fire),
            3 => Some(Self::Frost),
            4 => Some(Self::Arcane),
            5 => Some(Self::Poison),
            6 => Some(Self::True),
            _ => None,
        }
    }

    /// Path segment used in gameplay keys.
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Bleed => "bleed",
            Self::Fire => "fire",
            Self::Frost => "frost",
            Self::Arcane => "arcane",
            Self::Poison => "poison",
            Self::True => "true",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub damage_type: DamageType,
    pub crit: bool,
    pub execution: bool,
}

impl DamageEvent {
    pub fn new(damage_type: DamageType) -> Self {
        Self {
            damage_type,
            crit: false,
            execution: false,
        }
    }

    pub fn with_crit(mut self, crit: bool) -> Self {
        self.crit = crit;
        self
    }

    pub fn with_execution(mut self, execution: bool) -> Self {
        self.execution = execution;
        self
    }

    /// `hit` always, then `crit` and `execution` when flagged.
    pub fn keys(&self) -> Vec<String> {
        let t = self.damage_type.as_key();
        let mut keys = vec![format!("damage/{t}/hit")];
        if self.crit {
            keys.push(format!("damage/{t}/crit"));
        }
        if self.execution {
            keys.push(format!("damage/{t}/execution"));
        }
        keys
    }
}

/// Hook held by the combat module; called once per resolved damage event.
pub trait DamageObserver {
    fn on_damage(&mut self, event: &DamageEvent);
}
