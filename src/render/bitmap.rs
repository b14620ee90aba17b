use std::sync::Arc;

use crate::foundation::core::Rgb;

/// Displayable image built from a pixel buffer at one point in time.
///
/// Never mutated after construction: a regeneration produces a new `Bitmap` that
/// replaces the old one, so a draw can never observe a half-built image.
#[derive(Clone, Debug)]
pub struct Bitmap {
    image: Arc<image::RgbaImage>,
    generation: u64,
}

impl Bitmap {
    pub(crate) fn new(image: image::RgbaImage, generation: u64) -> Self {
        Self {
            image: Arc::new(image),
            generation,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Monotonic regeneration counter, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Underlying RGBA8 image.
    pub fn image(&self) -> &image::RgbaImage {
        &self.image
    }

    /// Colour at `(x, y)`, `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(Rgb::from_rgba8(&self.image.get_pixel(x, y).0))
    }
}
