use anyhow::Context;
use image::imageops::FilterType;

use crate::foundation::core::MapSize;
use crate::foundation::error::PixelwallResult;
use crate::pixels::buffer::PixelBuffer;

/// Decode a snapshot image and fit it to exactly `size` pixels.
///
/// An image whose dimensions differ from the declared map size is scaled to fit with
/// nearest-neighbour sampling (never smoothed). Translucent pixels are flattened over
/// white, the colour of an unpainted pixel.
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_snapshot(bytes: &[u8], size: MapSize) -> PixelwallResult<PixelBuffer> {
    let dyn_img = image::load_from_memory(bytes).context("decode snapshot image")?;
    fit_snapshot(dyn_img, size)
}

/// Fit an already decoded image to `size`. See [`decode_snapshot`].
pub fn fit_snapshot(img: image::DynamicImage, size: MapSize) -> PixelwallResult<PixelBuffer> {
    let rgba = img.to_rgba8();
    let rgba = if rgba.dimensions() == (size.width, size.height) {
        rgba
    } else {
        tracing::debug!(
            from_w = rgba.width(),
            from_h = rgba.height(),
            to_w = size.width,
            to_h = size.height,
            "snapshot size differs from map, scaling"
        );
        image::imageops::resize(&rgba, size.width, size.height, FilterType::Nearest)
    };

    let mut data = rgba.into_raw();
    flatten_over_white_in_place(&mut data);
    PixelBuffer::from_rgba8(size, data)
}

fn flatten_over_white_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        let inv = 255 - a;
        px[0] = ((px[0] as u16 * a + 255 * inv + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 255 * inv + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 255 * inv + 127) / 255) as u8;
        px[3] = 255;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
