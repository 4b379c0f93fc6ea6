use serde::{Deserialize, Serialize};

/// VFX draw layer. Layers are drawn back-to-front: `Bg` first, `Ui` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum VfxLayer {
    Bg = 0,
    #[default]
    Mid = 1,
    Fg = 2,
    Ui = 3,
}

impl VfxLayer {
    /// Total number of layers.
    pub const COUNT: usize = 4;

    pub const ALL: [VfxLayer; Self::COUNT] = [Self::Bg, Self::Mid, Self::Fg, Self::Ui];

    /// Returns None if the value is out of range.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bg),
            1 => Some(Self::Mid),
            2 => Some(Self::Fg),
            3 => Some(Self::Ui),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// How a renderer should composite a VFX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
}
