//! Pan / zoom / resize state of a drawing surface.

use crate::foundation::core::{Affine, Vec2};
use crate::foundation::error::{PixelwallError, PixelwallResult};

/// Canvas size plus the affine transform applied when drawing the map.
///
/// Updates build a new value and hand it to the surface in a single call, so a redraw
/// sees either the old or the new viewport, never a mix.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Zoom factor.
    pub scale: f64,
    /// Offset of the map origin on the canvas.
    pub translate: Vec2,
    /// Bitmap smoothing. Pixel art is never anti-aliased, so every resize turns it off.
    pub smoothing: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            scale: 1.0,
            translate: Vec2::ZERO,
            smoothing: false,
        }
    }
}

impl Viewport {
    /// Untransformed surface of a fixed size (the minimap).
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// `p -> scale * p + translate`.
    pub fn affine(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }

    /// Viewport after `update`; omitted fields keep their previous value.
    pub fn apply(&self, update: &TransUpdate) -> PixelwallResult<Self> {
        let mut next = *self;
        next.translate = Vec2::new(update.dx, update.dy);
        if let Some(s) = update.scale {
            if !(s.is_finite() && s > 0.0) {
                return Err(PixelwallError::validation(format!(
                    "zoom must be positive, got {s}"
                )));
            }
            next.scale = s;
        }
        if let Some((w, h)) = update.resize {
            next.width = w;
            next.height = h;
            next.smoothing = false;
        }
        Ok(next)
    }
}

/// Move, optionally scale, optionally resize.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransUpdate {
    /// New x offset.
    pub dx: f64,
    /// New y offset.
    pub dy: f64,
    /// New zoom, if given.
    pub scale: Option<f64>,
    /// New canvas size, if given.
    pub resize: Option<(u32, u32)>,
}

impl TransUpdate {
    /// Move only.
    pub fn translate(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            scale: None,
            resize: None,
        }
    }

    /// Also set the zoom.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Also resize the canvas.
    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/viewport.rs"]
mod tests;
