//! Frame-stepped effect event bus: double-buffered queue, deterministic
//! ordering and compaction, replay capture and gameplay key mapping.

pub mod mapping;
pub mod queue;
pub mod replay;

pub use mapping::{DamageEvent, DamageObserver, DamageType, FxMap, MAP_CAPACITY};
pub use queue::{EffectSink, FxBus, QUEUE_CAPACITY};
pub use replay::{events_hash, FxReplay, Recorder, ReplayLog, REPLAY_CAPACITY};
