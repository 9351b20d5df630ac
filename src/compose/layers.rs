use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::CanvasError;

/// Largest canvas edge accepted by the compositor
pub const MAX_CANVAS_DIMENSION: u64 = 16_384;

/// Scale a pixel length, truncating toward zero
pub fn scaled_len(len: u32, scale: f64) -> u64 {
    (len as f64 * scale).floor() as u64
}

/// Scale a placement offset, rounding to the nearest pixel
pub fn scaled_offset(offset: i64, scale: f64) -> i64 {
    (offset as f64 * scale).round() as i64
}

fn check_scale(scale: f64) -> Result<(), CanvasError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CanvasError::InvalidScale { scale });
    }
    Ok(())
}

fn check_canvas(width: u64, height: u64) -> Result<(u32, u32), CanvasError> {
    if width == 0 || height == 0 || width > MAX_CANVAS_DIMENSION || height > MAX_CANVAS_DIMENSION {
        return Err(CanvasError::InvalidDimensions { width, height });
    }
    Ok((width as u32, height as u32))
}

/// Resample to the target size with a triangle filter; no-op when equal
fn resample(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, FilterType::Triangle)
    }
}

/// Hard binary cut: wherever the mask pixel is pure black the target pixel
/// becomes fully transparent. Mask alpha is ignored. Both images must share
/// dimensions.
pub fn apply_mask(target: &mut RgbaImage, mask: &RgbaImage) {
    for (pixel, mask_pixel) in target.pixels_mut().zip(mask.pixels()) {
        let [r, g, b, _] = mask_pixel.0;
        if r == 0 && g == 0 && b == 0 {
            pixel.0[3] = 0;
        }
    }
}

fn mul_div255(x: u32, y: u32) -> u32 {
    (x * y + 127) / 255
}

/// Straight-alpha source-over for a single pixel
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = mul_div255(u32::from(dst[3]), 255 - sa);
    let out_a = sa + da;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let premul = u32::from(src[i]) * sa + u32::from(dst[i]) * da;
        out[i] = ((premul + out_a / 2) / out_a).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    Rgba(out)
}

/// Part of a layer of `size` placed at `origin` that lands on the canvas,
/// as `(x, y, width, height)` in layer coordinates
fn visible_window(origin: (i64, i64), size: (u64, u64), canvas: (u32, u32)) -> Option<(u64, u64, u32, u32)> {
    let span = |start: i64, len: u64, limit: u32| {
        let lo = start.max(0);
        let hi = start.saturating_add(len as i64).min(i64::from(limit));
        (lo < hi).then(|| ((lo - start) as u64, (hi - lo) as u32))
    };
    let (x, width) = span(origin.0, size.0, canvas.0)?;
    let (y, height) = span(origin.1, size.1, canvas.1)?;
    Some((x, y, width, height))
}

/// Resample only `window` of `image`, as if the whole image had first been
/// scaled to `full`. Exact crop when no scaling is involved.
fn resample_window(image: &RgbaImage, full: (u64, u64), window: (u64, u64, u32, u32)) -> RgbaImage {
    let (x, y, width, height) = window;
    let (image_w, image_h) = (u64::from(image.width()), u64::from(image.height()));
    if (image_w, image_h) == full {
        return imageops::crop_imm(image, x as u32, y as u32, width, height).to_image();
    }

    let source_span = |start: u64, len: u32, full: u64, available: u64| {
        let lo = start * available / full;
        let hi = ((start + u64::from(len)) * available).div_ceil(full).clamp(lo + 1, available);
        (lo as u32, (hi - lo) as u32)
    };
    let (sx, sw) = source_span(x, width, full.0, image_w);
    let (sy, sh) = source_span(y, height, full.1, image_h);
    let source = imageops::crop_imm(image, sx, sy, sw, sh).to_image();
    resample(&source, width, height)
}

/// Draw `src` over `dst` with its top-left corner at `(x, y)`, clipped to `dst`
pub fn blend_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
    let (src_w, src_h) = (i64::from(src.width()), i64::from(src.height()));

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(src_w).min(dst_w);
    let y1 = y.saturating_add(src_h).min(dst_h);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for dy in y0..y1 {
        for dx in x0..x1 {
            let s = *src.get_pixel((dx - x) as u32, (dy - y) as u32);
            let d = dst.get_pixel_mut(dx as u32, dy as u32);
            *d = blend_pixel(*d, s);
        }
    }
}

/// Composite a screenshot into frame artwork
///
/// The canvas is the artwork scaled by `scale`. The screenshot is scaled by
/// the same factor, cut by the mask (resampled to the scaled screenshot
/// size) when one is given, and drawn at the scaled offset. The artwork is
/// drawn last across the whole canvas. A screenshot larger than the canvas
/// limit is still drawn; only its visible part is ever materialized.
pub fn compose_layers(
    screenshot: &RgbaImage,
    artwork: &RgbaImage,
    mask: Option<&RgbaImage>,
    offset: (i64, i64),
    scale: f64,
) -> Result<RgbaImage, CanvasError> {
    check_scale(scale)?;
    let (canvas_w, canvas_h) = check_canvas(
        scaled_len(artwork.width(), scale),
        scaled_len(artwork.height(), scale),
    )?;

    let origin = (scaled_offset(offset.0, scale), scaled_offset(offset.1, scale));
    let shot_w = scaled_len(screenshot.width(), scale);
    let shot_h = scaled_len(screenshot.height(), scale);

    let mut canvas = RgbaImage::new(canvas_w, canvas_h);

    // only the part of the screenshot that lands on the canvas is resampled
    match visible_window(origin, (shot_w, shot_h), (canvas_w, canvas_h)) {
        Some(window) => {
            let mut layer = resample_window(screenshot, (shot_w, shot_h), window);
            if let Some(mask) = mask {
                let mask = resample_window(mask, (shot_w, shot_h), window);
                apply_mask(&mut layer, &mask);
            }
            let (x, y) = (window.0 as i64, window.1 as i64);
            blend_over(&mut canvas, &layer, origin.0.saturating_add(x), origin.1.saturating_add(y));
        }
        None => debug!(
            "Screenshot {}x{} at {:?} falls outside the {}x{} canvas",
            shot_w, shot_h, origin, canvas_w, canvas_h
        ),
    }

    let artwork_layer = resample(artwork, canvas_w, canvas_h);
    blend_over(&mut canvas, &artwork_layer, 0, 0);

    Ok(canvas)
}
