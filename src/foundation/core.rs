use crate::foundation::error::{PixelwallError, PixelwallResult};

pub use kurbo::{Affine, Vec2};

/// Opaque 24-bit colour packed as `0xRRGGBB`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rgb(pub u32);

impl Rgb {
    /// Colour of an unpainted pixel.
    pub const WHITE: Rgb = Rgb(0xFF_FF_FF);

    /// Pack 8-bit channels.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self(u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b))
    }

    /// Parse `rrggbb`, `#rrggbb` or `0xrrggbb`.
    pub fn from_hex(s: &str) -> PixelwallResult<Self> {
        let t = s.trim();
        let digits = t
            .strip_prefix('#')
            .or_else(|| t.strip_prefix("0x"))
            .or_else(|| t.strip_prefix("0X"))
            .unwrap_or(t);
        if digits.is_empty() || digits.len() > 6 {
            return Err(PixelwallError::validation(format!(
                "colour '{s}' must have 1..=6 hex digits"
            )));
        }
        let v = u32::from_str_radix(digits, 16)
            .map_err(|e| PixelwallError::validation(format!("colour '{s}' is not hex: {e}")))?;
        Ok(Self(v))
    }

    /// Red channel.
    pub fn r(self) -> u8 {
        (self.0 >> 16 & 0xFF) as u8
    }

    /// Green channel.
    pub fn g(self) -> u8 {
        (self.0 >> 8 & 0xFF) as u8
    }

    /// Blue channel.
    pub fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Opaque RGBA8 pixel.
    pub fn to_rgba8(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), 255]
    }

    /// Read the colour part of an RGBA8 pixel; alpha is ignored.
    pub fn from_rgba8(px: &[u8]) -> Self {
        Self::new(px[0], px[1], px[2])
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06x}", self.0)
    }
}

/// Index into the palette, transmitted as a short code on the wire.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ColorCode(pub u8);

impl ColorCode {
    /// Code reserved for the blank (white) map colour.
    pub const BLANK: ColorCode = ColorCode(0);

    /// Parse a decimal code (`"12"`) or a single base-36 character (`"C"`).
    pub fn parse(s: &str) -> PixelwallResult<Self> {
        let t = s.trim();
        if let Ok(v) = t.parse::<u8>() {
            return Ok(Self(v));
        }
        let mut chars = t.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(PixelwallError::validation(format!("bad colour code '{s}'"))),
        }
    }

    /// Single base-36 digit (`0-9`, then `A-Z` case-insensitive).
    pub fn from_char(c: char) -> PixelwallResult<Self> {
        c.to_digit(36)
            .map(|d| Self(d as u8))
            .ok_or_else(|| PixelwallError::validation(format!("bad colour code '{c}'")))
    }

    /// Code as a palette index.
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

impl std::fmt::Display for ColorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pixel's new colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Delta {
    /// Row-major pixel index (`y * width + x`).
    pub index: u32,
    /// Palette code of the new colour.
    pub code: ColorCode,
}

impl Delta {
    /// Delta setting pixel `index` to palette code `code`.
    pub fn new(index: u32, code: u8) -> Self {
        Self {
            index,
            code: ColorCode(code),
        }
    }
}

/// Pixel dimensions of the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MapSize {
    /// Pixels per row.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl MapSize {
    /// Validated size: both sides non-zero and the RGBA byte length fits in `u32`.
    pub fn new(width: u32, height: u32) -> PixelwallResult<Self> {
        if width == 0 || height == 0 {
            return Err(PixelwallError::validation(format!(
                "map size must be non-zero, got {width}x{height}"
            )));
        }
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| PixelwallError::validation("map size overflows"))?;
        Ok(Self { width, height })
    }

    /// `width * height`.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA8 byte length of a buffer of this size.
    pub fn byte_len(self) -> usize {
        self.pixel_count() * 4
    }

    /// True for the zero-sized default.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
