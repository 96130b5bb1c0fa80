//! RGB colors and two-stop tint gradients.
//!
//! Colors are stored as `f64` components in [0, 1] so that schema morphs can
//! blend channels without 8-bit quantization; only the final tint handed to a
//! host renderer is packed into `0xRRGGBB`.

use crate::error::StarfieldError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// sRGB color with components in [0, 1].
///
/// Serializes as a hex string `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Builds a color from 8-bit channels.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Parses `"#rrggbb"` or `"rrggbb"` (case insensitive).
    pub fn from_hex(hex: &str) -> Result<Rgb, StarfieldError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(StarfieldError::InvalidColor(format!(
                "expected 6 hex digits, got {hex:?}"
            )));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| StarfieldError::InvalidColor(format!("invalid {name} component: {e}")))
        };
        Ok(Rgb::from_u8(
            channel(0..2, "red")?,
            channel(2..4, "green")?,
            channel(4..6, "blue")?,
        ))
    }

    /// Quantized 8-bit channels, clamped and rounded.
    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Formats as `"#rrggbb"`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_u8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Packs into a `0xRRGGBB` integer, the tint format host renderers take.
    pub fn to_packed(self) -> u32 {
        let [r, g, b] = self.to_u8();
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }

    /// Per-channel linear interpolation; `t` is not clamped.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        Rgb {
            r: lerp(t, self.r, other.r),
            g: lerp(t, self.g, other.g),
            b: lerp(t, self.b, other.b),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Two-stop tint gradient sampled by a particle's response value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorGradient {
    pub from: Rgb,
    pub to: Rgb,
}

impl ColorGradient {
    pub fn new(from: Rgb, to: Rgb) -> Self {
        Self { from, to }
    }

    /// Color at `t` in [0, 1] (clamped), packed as `0xRRGGBB`.
    pub fn blend(&self, t: f64) -> u32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.from.lerp(self.to, t).to_packed()
    }

    /// Interpolates both stops toward `other`, channel by channel.
    pub fn lerp(&self, other: &ColorGradient, t: f64) -> ColorGradient {
        ColorGradient {
            from: self.from.lerp(other.from, t),
            to: self.to.lerp(other.to, t),
        }
    }
}

/// `a + t * (b - a)`.
pub fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}
