//! Drawing targets for the map bitmap.

use kurbo::Point;

use crate::foundation::core::Affine;
use crate::render::bitmap::Bitmap;
use crate::transform::viewport::Viewport;

/// A 2D canvas the engine paints the map bitmap onto.
pub trait Surface {
    /// Apply size, transform and smoothing together. Resizing discards the content.
    fn configure(&mut self, viewport: &Viewport);

    /// Clear the whole canvas, ignoring the current transform.
    fn clear(&mut self);

    /// Draw `bitmap` stretched over the user-space rectangle `(0, 0, dst_w, dst_h)`,
    /// through the current transform.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst_w: f64, dst_h: f64);
}

/// CPU canvas backed by an RGBA8 image. Sampling is always nearest-neighbour; the
/// smoothing flag is kept for inspection only.
#[derive(Clone, Debug)]
pub struct RasterSurface {
    target: image::RgbaImage,
    transform: Affine,
    smoothing: bool,
    draws: u64,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self {
            target: image::RgbaImage::new(0, 0),
            transform: Affine::IDENTITY,
            smoothing: false,
            draws: 0,
        }
    }
}

impl RasterSurface {
    /// Surface configured for `viewport`.
    pub fn new(viewport: &Viewport) -> Self {
        let mut s = Self::default();
        s.configure(viewport);
        s
    }

    /// Current canvas content.
    pub fn image(&self) -> &image::RgbaImage {
        &self.target
    }

    /// Transform applied to the next draw.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Smoothing flag from the last `configure`.
    pub fn smoothing(&self) -> bool {
        self.smoothing
    }

    /// Number of `draw_bitmap` calls so far.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }
}

impl Surface for RasterSurface {
    fn configure(&mut self, viewport: &Viewport) {
        if self.target.dimensions() != (viewport.width, viewport.height) {
            self.target = image::RgbaImage::new(viewport.width, viewport.height);
        }
        self.transform = viewport.affine();
        self.smoothing = viewport.smoothing;
    }

    fn clear(&mut self) {
        for px in self.target.pixels_mut() {
            px.0 = [0, 0, 0, 0];
        }
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dst_w: f64, dst_h: f64) {
        self.draws += 1;
        if bitmap.is_empty() || dst_w <= 0.0 || dst_h <= 0.0 {
            return;
        }
        let det = self.transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return;
        }
        let inv = self.transform.inverse();
        let sx = f64::from(bitmap.width()) / dst_w;
        let sy = f64::from(bitmap.height()) / dst_h;
        let src = bitmap.image();

        let (w, h) = self.target.dimensions();
        for y in 0..h {
            for x in 0..w {
                // sample at the destination pixel centre
                let p = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if p.x < 0.0 || p.y < 0.0 || p.x >= dst_w || p.y >= dst_h {
                    continue;
                }
                let bx = ((p.x * sx) as u32).min(bitmap.width() - 1);
                let by = ((p.y * sy) as u32).min(bitmap.height() - 1);
                self.target.put_pixel(x, y, *src.get_pixel(bx, by));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
