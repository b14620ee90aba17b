//! Fixed colour palette and its inverse lookup.

use std::collections::HashMap;

use crate::foundation::core::{ColorCode, Rgb};
use crate::foundation::error::{PixelwallError, PixelwallResult};

/// Largest palette addressable by single-character base-36 codes.
pub const MAX_PALETTE_LEN: usize = 36;

/// Ordered palette. Immutable once built; every entry is a distinct RGB so that
/// `code -> rgb` and `rgb -> code` stay consistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
    reverse: HashMap<Rgb, ColorCode>,
}

impl Palette {
    /// Palette with code `i` for `colors[i]`. Rejects empty, oversized and duplicate entries.
    pub fn new(colors: Vec<Rgb>) -> PixelwallResult<Self> {
        if colors.is_empty() || colors.len() > MAX_PALETTE_LEN {
            return Err(PixelwallError::validation(format!(
                "palette must have 1..={MAX_PALETTE_LEN} colours, got {}",
                colors.len()
            )));
        }

        let mut reverse = HashMap::with_capacity(colors.len());
        for (i, &rgb) in colors.iter().enumerate() {
            let code = ColorCode(i as u8);
            if let Some(prev) = reverse.insert(rgb, code) {
                return Err(PixelwallError::validation(format!(
                    "palette colour {rgb} appears at codes {prev} and {code}"
                )));
            }
        }
        Ok(Self { colors, reverse })
    }

    /// Build from wire hex fields (`"ffffff"`, `"#000000"`, ...).
    pub fn from_hex_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> PixelwallResult<Self> {
        let colors = codes
            .into_iter()
            .map(Rgb::from_hex)
            .collect::<PixelwallResult<Vec<_>>>()?;
        Self::new(colors)
    }

    /// Number of colours.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false for a validated palette.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colours in code order.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Whether `code` addresses a palette entry.
    pub fn contains(&self, code: ColorCode) -> bool {
        code.as_usize() < self.colors.len()
    }

    /// Colour for `code`. An unknown code is a protocol violation.
    pub fn color(&self, code: ColorCode) -> PixelwallResult<Rgb> {
        self.colors.get(code.as_usize()).copied().ok_or_else(|| {
            PixelwallError::protocol(format!(
                "colour code {code} outside palette of {}",
                self.colors.len()
            ))
        })
    }

    /// Palette code whose colour equals `rgb`. White maps to [`ColorCode::BLANK`]
    /// when the palette itself does not carry it.
    pub fn reverse_of(&self, rgb: Rgb) -> Option<ColorCode> {
        match self.reverse.get(&rgb) {
            Some(&code) => Some(code),
            None if rgb == Rgb::WHITE => Some(ColorCode::BLANK),
            None => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixels/palette.rs"]
mod tests;
