//! The seam between the mixer and whatever actually makes sound.
//!
//! The mixer only ever asks a backend to load a clip, set the channel volume
//! and start a voice. `NullBackend` is silent, `RecordingBackend` logs calls
//! for tests, and `RodioBackend` (feature `rodio-backend`) plays through the
//! default output device.

use crate::api::types::{FxError, FxResult};

/// Opaque backend resource id for a loaded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipHandle(pub u32);

pub trait AudioBackend {
    /// Load the clip at `path` and return a handle for later plays.
    fn load_clip(&mut self, path: &str) -> FxResult<ClipHandle>;

    fn unload_clip(&mut self, handle: ClipHandle);

    /// Volume in [0, 1] applied to the next `play`.
    fn set_volume(&mut self, gain: f32);

    fn play(&mut self, handle: ClipHandle) -> FxResult<()>;

    /// Voices currently sounding.
    fn playing_voices(&self) -> usize;
}

/// Backend that accepts everything and plays nothing.
#[derive(Debug, Default)]
pub struct NullBackend {
    next_handle: u32,
}

impl AudioBackend for NullBackend {
    fn load_clip(&mut self, _path: &str) -> FxResult<ClipHandle> {
        self.next_handle += 1;
        Ok(ClipHandle(self.next_handle))
    }

    fn unload_clip(&mut self, _handle: ClipHandle) {}

    fn set_volume(&mut self, _gain: f32) {}

    fn play(&mut self, _handle: ClipHandle) -> FxResult<()> {
        Ok(())
    }

    fn playing_voices(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Load(String),
    Unload(ClipHandle),
    Volume(f32),
    Play(ClipHandle),
}

/// Test double that records every call. Loads of paths listed in
/// `failing_paths` fail; `voices` is reported as the playing-voice count.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub failing_paths: Vec<String>,
    pub voices: usize,
    paths: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every clip started, in play order.
    pub fn played_paths(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Play(h) => self.paths.get(h.0 as usize).map(|p| p.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Volume set immediately before each play.
    pub fn play_volumes(&self) -> Vec<f32> {
        let mut volume = 1.0;
        let mut out = Vec::new();
        for call in &self.calls {
            match call {
                BackendCall::Volume(v) => volume = *v,
                BackendCall::Play(_) => out.push(volume),
                _ => {}
            }
        }
        out
    }
}

impl AudioBackend for RecordingBackend {
    fn load_clip(&mut self, path: &str) -> FxResult<ClipHandle> {
        self.calls.push(BackendCall::Load(path.to_owned()));
        if self.failing_paths.iter().any(|p| p == path) {
            return Err(FxError::Backend(format!("cannot load {path}")));
        }
        self.paths.push(path.to_owned());
        Ok(ClipHandle((self.paths.len() - 1) as u32))
    }

    fn unload_clip(&mut self, handle: ClipHandle) {
        self.calls.push(BackendCall::Unload(handle));
    }

    fn set_volume(&mut self, gain: f32) {
        self.calls.push(BackendCall::Volume(gain));
    }

    fn play(&mut self, handle: ClipHandle) -> FxResult<()> {
        self.calls.push(BackendCall::Play(handle));
        Ok(())
    }

    fn playing_voices(&self) -> usize {
        self.voices
    }
}

#[cfg(feature = "rodio-backend")]
pub use self::rodio_impl::RodioBackend;

#[cfg(feature = "rodio-backend")]
mod rodio_impl {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use super::{AudioBackend, ClipHandle};
    use crate::api::types::{FxError, FxResult};

    /// Plays clips on the default output device, one `Sink` per voice.
    /// Clip bytes stay in memory so replays decode from a cursor.
    pub struct RodioBackend {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        clips: Vec<Option<Arc<[u8]>>>,
        voices: Vec<Sink>,
        volume: f32,
    }

    impl RodioBackend {
        pub fn new() -> FxResult<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| FxError::Backend(format!("failed to open audio output: {e}")))?;
            Ok(Self {
                _stream: stream,
                handle,
                clips: Vec::new(),
                voices: Vec::new(),
                volume: 1.0,
            })
        }

        fn reap(&mut self) {
            self.voices.retain(|s| !s.empty());
        }
    }

    impl AudioBackend for RodioBackend {
        fn load_clip(&mut self, path: &str) -> FxResult<ClipHandle> {
            let bytes = std::fs::read(path).map_err(|e| FxError::Backend(format!("{path}: {e}")))?;
            // Undecodable files fail here rather than at play.
            Decoder::new(Cursor::new(bytes.clone()))
                .map_err(|e| FxError::Backend(format!("{path}: {e}")))?;
            self.clips.push(Some(Arc::from(bytes)));
            Ok(ClipHandle((self.clips.len() - 1) as u32))
        }

        fn unload_clip(&mut self, handle: ClipHandle) {
            if let Some(slot) = self.clips.get_mut(handle.0 as usize) {
                *slot = None;
            }
        }

        fn set_volume(&mut self, gain: f32) {
            self.volume = gain.clamp(0.0, 1.0);
        }

        fn play(&mut self, handle: ClipHandle) -> FxResult<()> {
            self.reap();
            let bytes = self
                .clips
                .get(handle.0 as usize)
                .and_then(|c| c.clone())
                .ok_or_else(|| FxError::Backend(format!("clip {} not loaded", handle.0)))?;
            let source =
                Decoder::new(Cursor::new(bytes)).map_err(|e| FxError::Backend(e.to_string()))?;
            let sink = Sink::try_new(&self.handle).map_err(|e| FxError::Backend(e.to_string()))?;
            sink.set_volume(self.volume);
            sink.append(source);
            self.voices.push(sink);
            Ok(())
        }

        fn playing_voices(&self) -> usize {
            self.voices.iter().filter(|s| !s.empty()).count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_backend_tracks_calls() {
        let mut b = RecordingBackend::new();
        let h = b.load_clip("a.wav").unwrap();
        b.set_volume(0.25);
        b.play(h).unwrap();
        assert_eq!(b.played_paths(), vec!["a.wav"]);
        assert_eq!(b.play_volumes(), vec![0.25]);
    }

    #[test]
    fn recording_backend_failing_load() {
        let mut b = RecordingBackend::new();
        b.failing_paths.push("missing.wav".into());
        assert!(matches!(b.load_clip("missing.wav"), Err(FxError::Backend(_))));
    }

    #[test]
    fn null_backend_hands_out_distinct_handles() {
        let mut b = NullBackend::default();
        let a = b.load_clip("a").unwrap();
        let c = b.load_clip("b").unwrap();
        assert_ne!(a, c);
        assert_eq!(b.playing_voices(), 0);
    }
}
