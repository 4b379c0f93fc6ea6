pub mod api;
pub mod assets;
pub mod audio;
pub mod bus;
pub mod components;
pub mod core;
pub mod renderer;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::pipeline::{FxConfig, FxPipeline};
pub use api::types::{EffectEvent, EffectKind, FxError, FxResult, Priority, EFFECT_ID_LEN};
pub use assets::manifest::{ApplyReport, EffectsManifest};
pub use audio::{
    AudioBackend, AudioCategory, AudioMixer, AudioRegistry, BackendCall, ClipHandle, MusicFsm,
    MusicState, NullBackend, RecordingBackend, ReverbPreset,
};
#[cfg(feature = "rodio-backend")]
pub use audio::RodioBackend;
pub use bus::{
    events_hash, DamageEvent, DamageObserver, DamageType, EffectSink, FxBus, FxMap, FxReplay,
    ReplayLog,
};
pub use components::emitter::{EmitterParams, TrailParams, Variation};
pub use components::layer::{BlendMode, VfxLayer};
pub use crate::core::pool::{Handle, PoolAudit, SlotPool};
pub use crate::core::rng::FxRng;
pub use renderer::{ScreenSprite, ScreenTransform};
pub use systems::vfx::{CompositeMode, PostFx, VfxFrameStats, VfxOverrides, VfxSim};
