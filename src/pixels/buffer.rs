//! Raw RGBA pixel storage addressed by row-major pixel index.

use crate::foundation::core::{ColorCode, Delta, MapSize, Rgb};
use crate::foundation::error::{PixelwallError, PixelwallResult};
use crate::pixels::palette::Palette;

/// `width * height * 4` bytes of opaque RGBA8, row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    size: MapSize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// All-white map.
    pub fn blank(size: MapSize) -> Self {
        let mut data = Vec::with_capacity(size.byte_len());
        for _ in 0..size.pixel_count() {
            data.extend_from_slice(&Rgb::WHITE.to_rgba8());
        }
        Self { size, data }
    }

    /// Wrap decoded RGBA8 bytes. Alpha is forced to opaque.
    pub fn from_rgba8(size: MapSize, mut data: Vec<u8>) -> PixelwallResult<Self> {
        if data.len() != size.byte_len() {
            return Err(PixelwallError::validation(format!(
                "expected {} rgba bytes for {}x{}, got {}",
                size.byte_len(),
                size.width,
                size.height,
                data.len()
            )));
        }
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Ok(Self { size, data })
    }

    /// One colour-code character per pixel, row-major.
    pub fn from_color_codes(size: MapSize, palette: &Palette, codes: &str) -> PixelwallResult<Self> {
        let count = codes.chars().count();
        if count != size.pixel_count() {
            return Err(PixelwallError::validation(format!(
                "colour string has {count} codes for {} pixels",
                size.pixel_count()
            )));
        }
        let mut data = Vec::with_capacity(size.byte_len());
        for ch in codes.chars() {
            let code = ColorCode::from_char(ch)?;
            data.extend_from_slice(&palette.color(code)?.to_rgba8());
        }
        Ok(Self { size, data })
    }

    /// Map size of this buffer.
    pub fn size(&self) -> MapSize {
        self.size
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Colour at row-major `index`, `None` outside the map.
    pub fn pixel(&self, index: u32) -> Option<Rgb> {
        let i = index as usize * 4;
        self.data.get(i..i + 4).map(Rgb::from_rgba8)
    }

    /// Check every delta before anything is written: indices must address the map and
    /// codes must exist in the palette.
    pub fn validate(&self, deltas: &[Delta], palette: &Palette) -> PixelwallResult<()> {
        let n = self.size.pixel_count();
        for d in deltas {
            if d.index as usize >= n {
                return Err(PixelwallError::protocol(format!(
                    "pixel index {} out of range for {} pixels",
                    d.index, n
                )));
            }
            if !palette.contains(d.code) {
                return Err(PixelwallError::protocol(format!(
                    "colour code {} outside palette of {}",
                    d.code,
                    palette.len()
                )));
            }
        }
        Ok(())
    }

    /// Overwrite each delta's pixel with its palette colour, in order (last write wins).
    pub fn apply_deltas(&mut self, deltas: &[Delta], palette: &Palette) -> PixelwallResult<()> {
        self.validate(deltas, palette)?;
        for d in deltas {
            self.set_pixel(d.index, palette.color(d.code)?);
        }
        Ok(())
    }

    /// Like [`apply_deltas`](Self::apply_deltas) but returns, per delta, the colour it
    /// replaced.
    pub fn swap_deltas(&mut self, deltas: &[Delta], palette: &Palette) -> PixelwallResult<Vec<Rgb>> {
        self.validate(deltas, palette)?;
        let mut old = Vec::with_capacity(deltas.len());
        for d in deltas {
            old.push(self.swap_pixel(d.index, palette.color(d.code)?));
        }
        Ok(old)
    }

    /// Replace the whole content with `other`, which must have the same size.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> PixelwallResult<()> {
        if self.size != other.size {
            return Err(PixelwallError::validation("copy_from expects equal-size buffers"));
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub(crate) fn set_pixel(&mut self, index: u32, rgb: Rgb) {
        let i = index as usize * 4;
        self.data[i..i + 4].copy_from_slice(&rgb.to_rgba8());
    }

    pub(crate) fn swap_pixel(&mut self, index: u32, rgb: Rgb) -> Rgb {
        let i = index as usize * 4;
        let old = Rgb::from_rgba8(&self.data[i..i + 4]);
        self.data[i..i + 4].copy_from_slice(&rgb.to_rgba8());
        old
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixels/buffer.rs"]
mod tests;
