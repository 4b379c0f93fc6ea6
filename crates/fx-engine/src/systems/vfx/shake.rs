use std::f32::consts::TAU;

use glam::Vec2;

use crate::api::types::{FxError, FxResult};

/// Concurrent shakes.
pub const MAX_SHAKES: usize = 8;

/// Decaying sinusoidal camera shake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenShake {
    pub amplitude: f32,
    pub frequency_hz: f32,
    pub duration_ms: u32,
    pub age_ms: u32,
}

impl ScreenShake {
    /// All three parameters must be positive.
    pub fn new(amplitude: f32, frequency_hz: f32, duration_ms: u32) -> FxResult<Self> {
        let valid = amplitude > 0.0 && frequency_hz > 0.0 && duration_ms > 0;
        if !valid {
            return Err(FxError::InvalidParam(
                "shake amplitude, frequency and duration must be positive",
            ));
        }
        Ok(Self {
            amplitude,
            frequency_hz,
            duration_ms,
            age_ms: 0,
        })
    }

    /// Returns false once the shake has run its full duration.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        self.age_ms = self.age_ms.saturating_add(dt_ms);
        self.age_ms < self.duration_ms
    }

    /// Offset contributed at the current age. Amplitude fades linearly to 0;
    /// y runs at 0.7× the x phase so the motion is not a straight line.
    pub fn offset(&self) -> Vec2 {
        let t = self.age_ms as f32 * 0.001;
        let phase = t * self.frequency_hz * TAU;
        let fade = (1.0 - self.age_ms as f32 / self.duration_ms as f32).max(0.0);
        let a = self.amplitude * fade;
        Vec2::new(a * phase.sin(), a * (phase * 0.7).cos())
    }
}
