pub mod backend;
pub mod mixer;
pub mod music;
pub mod registry;

pub use backend::{AudioBackend, BackendCall, ClipHandle, NullBackend, RecordingBackend};
#[cfg(feature = "rodio-backend")]
pub use backend::RodioBackend;
pub use mixer::{AudioMixer, ReverbPreset};
pub use music::{MusicFsm, MusicState};
pub use registry::{AudioCategory, AudioClip, AudioRegistry};
