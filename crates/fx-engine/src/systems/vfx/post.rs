use serde::{Deserialize, Serialize};

/// Post-processing parameters handed to the renderer as-is. Nothing in the
/// simulation reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFx {
    pub bloom_enabled: bool,
    pub bloom_threshold: f32,
    pub bloom_intensity: f32,
    /// Active colour-grading LUT, with its blend strength in (0, 1].
    pub color_lut: Option<ColorLut>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLut {
    pub id: String,
    pub strength: f32,
}

impl Default for PostFx {
    fn default() -> Self {
        Self {
            bloom_enabled: false,
            bloom_threshold: 1.0,
            bloom_intensity: 0.5,
            color_lut: None,
        }
    }
}

impl PostFx {
    pub fn set_bloom_enabled(&mut self, enabled: bool) {
        self.bloom_enabled = enabled;
    }

    /// Negative values clamp to 0.
    pub fn set_bloom_params(&mut self, threshold: f32, intensity: f32) {
        self.bloom_threshold = threshold.max(0.0);
        self.bloom_intensity = intensity.max(0.0);
    }

    /// An empty id or non-positive strength clears the LUT.
    pub fn set_color_lut(&mut self, id: &str, strength: f32) {
        if id.is_empty() || strength.is_nan() || strength <= 0.0 {
            self.color_lut = None;
            return;
        }
        self.color_lut = Some(ColorLut {
            id: id.to_owned(),
            strength: strength.min(1.0),
        });
    }

    pub fn color_lut(&self) -> Option<(&str, f32)> {
        self.color_lut.as_ref().map(|l| (l.id.as_str(), l.strength))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = PostFx::default();
        assert!(!p.bloom_enabled);
        assert_eq!(p.bloom_threshold, 1.0);
        assert_eq!(p.bloom_intensity, 0.5);
        assert!(p.color_lut().is_none());
    }

    #[test]
    fn bloom_params_clamp() {
        let mut p = PostFx::default();
        p.set_bloom_params(-1.0, 3.0);
        assert_eq!(p.bloom_threshold, 0.0);
        assert_eq!(p.bloom_intensity, 3.0);
    }

    #[test]
    fn lut_set_and_cleared() {
        let mut p = PostFx::default();
        p.set_color_lut("sepia", 4.0);
        assert_eq!(p.color_lut(), Some(("sepia", 1.0)));
        p.set_color_lut("sepia", 0.0);
        assert!(p.color_lut().is_none());
        p.set_color_lut("night", 0.25);
        p.set_color_lut("", 0.5);
        assert!(p.color_lut().is_none());
    }
}
