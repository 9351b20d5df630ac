//! # Image Compositing Module
//!
//! Places a screenshot inside device frame artwork, cut by the frame's
//! optional mask.

pub mod layers;

use image::RgbaImage;
use tracing::{debug, info};

use crate::assets::{decode_raster, encode_png, load_frame_assets, AssetSource};
use crate::catalog::Frame;
use crate::error::Result;

pub use layers::{apply_mask, blend_over, blend_pixel, compose_layers, MAX_CANVAS_DIMENSION};

/// Scale used for exported images
pub const EXPORT_SCALE: f64 = 1.0;

/// Scale that fits the artwork into the preview area: bounded by both the
/// configured maximum width and the available width, never upscaling.
pub fn preview_scale(artwork_width: u32, available_width: u32, max_width: u32) -> f64 {
    if artwork_width == 0 {
        return 1.0;
    }
    let bound = max_width.min(available_width) as f64;
    (bound / artwork_width as f64).min(1.0)
}

/// Composites screenshots into frames loaded from an asset source
pub struct ImageCompositor<S> {
    assets: S,
}

impl<S: AssetSource> ImageCompositor<S> {
    pub fn new(assets: S) -> Self {
        Self { assets }
    }

    /// Load the frame's artwork and mask, then composite at `scale`
    pub async fn compose(&self, screenshot: &RgbaImage, frame: &Frame, scale: f64) -> Result<RgbaImage> {
        let offset = frame.offset()?;
        let assets = load_frame_assets(&self.assets, frame).await?;

        debug!(
            "Compositing {}x{} screenshot into {} at scale {}",
            screenshot.width(),
            screenshot.height(),
            frame.id,
            scale
        );

        let composed = compose_layers(screenshot, &assets.artwork, assets.mask.as_ref(), offset, scale)?;
        Ok(composed)
    }

    /// Decode an encoded screenshot, composite at export scale and encode PNG
    pub async fn compose_encoded(&self, screenshot: &[u8], frame: &Frame) -> Result<Vec<u8>> {
        let screenshot = decode_raster(screenshot, "screenshot")?;
        let composed = self.compose(&screenshot, frame, EXPORT_SCALE).await?;
        let png = encode_png(&composed)?;
        info!("Framed screenshot with {} ({} bytes)", frame.id, png.len());
        Ok(png)
    }

    /// Composite at the scale that fits the artwork into `available_width`
    pub async fn preview(
        &self,
        screenshot: &RgbaImage,
        frame: &Frame,
        available_width: u32,
        max_width: u32,
    ) -> Result<RgbaImage> {
        let assets = load_frame_assets(&self.assets, frame).await?;
        let scale = preview_scale(assets.artwork.width(), available_width, max_width);
        let offset = frame.offset()?;
        Ok(compose_layers(screenshot, &assets.artwork, assets.mask.as_ref(), offset, scale)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::catalog::Coordinates;
    use crate::error::{AssetError, FramerError};
    use image::Rgba;

    fn png(image: &RgbaImage) -> Vec<u8> {
        encode_png(image).unwrap()
    }

    fn iphone() -> Frame {
        Frame::new(
            "AppleDevice",
            "iPhone 15",
            None,
            None,
            None,
            Coordinates::new("100", "200", "iphone15").with_screenshot_size(1000, 2000),
        )
    }

    #[test]
    fn test_preview_scale() {
        assert_eq!(preview_scale(1600, 2000, 800), 0.5);
        assert_eq!(preview_scale(1600, 400, 800), 0.25);
        assert_eq!(preview_scale(400, 2000, 800), 1.0);
        assert_eq!(preview_scale(0, 100, 800), 1.0);
    }

    #[tokio::test]
    async fn test_fully_black_mask_leaves_only_artwork() {
        // artwork 1200x2400, opaque only in a 50px bezel
        let artwork = RgbaImage::from_fn(1200, 2400, |x, y| {
            if x < 50 || y < 50 || x >= 1150 || y >= 2350 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mask = RgbaImage::from_pixel(1000, 2000, Rgba([0, 0, 0, 255]));
        let assets = MemoryAssets::new()
            .with_file("iphone15.png", png(&artwork))
            .with_file("iphone15_mask.png", png(&mask));

        let compositor = ImageCompositor::new(assets);
        let screenshot = RgbaImage::from_pixel(1000, 2000, Rgba([255, 0, 0, 255]));
        let out = compositor.compose(&screenshot, &iphone(), 1.0).await.unwrap();

        assert_eq!(out.dimensions(), (1200, 2400));
        for y in (200..2200).step_by(37) {
            for x in (100..1100).step_by(29) {
                let pixel = out.get_pixel(x, y);
                assert_eq!(*pixel, *artwork.get_pixel(x, y), "pixel ({}, {})", x, y);
            }
        }
    }

    #[tokio::test]
    async fn test_without_mask_screenshot_is_visible() {
        let artwork = RgbaImage::from_pixel(1200, 2400, Rgba([0, 0, 0, 0]));
        let assets = MemoryAssets::new().with_file("iphone15.png", png(&artwork));

        let compositor = ImageCompositor::new(assets);
        let screenshot = RgbaImage::from_pixel(1000, 2000, Rgba([0, 255, 0, 255]));
        let out = compositor.compose(&screenshot, &iphone(), 1.0).await.unwrap();

        assert_eq!(*out.get_pixel(100, 200), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(99, 200), Rgba([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn test_missing_artwork() {
        let compositor = ImageCompositor::new(MemoryAssets::new());
        let screenshot = RgbaImage::new(10, 10);
        let err = compositor.compose(&screenshot, &iphone(), 1.0).await.unwrap_err();
        assert!(matches!(err, FramerError::Asset(AssetError::ArtworkMissing { .. })));
    }

    #[tokio::test]
    async fn test_compose_encoded_outputs_png() {
        let artwork = RgbaImage::from_pixel(1200, 2400, Rgba([0, 0, 0, 0]));
        let compositor = ImageCompositor::new(MemoryAssets::new().with_file("iphone15.png", png(&artwork)));
        let screenshot = png(&RgbaImage::from_pixel(1000, 2000, Rgba([9, 9, 9, 255])));

        let bytes = compositor.compose_encoded(&screenshot, &iphone()).await.unwrap();
        let decoded = decode_raster(&bytes, "output").unwrap();
        assert_eq!(decoded.dimensions(), (1200, 2400));
        assert_eq!(*decoded.get_pixel(500, 500), Rgba([9, 9, 9, 255]));
    }
}
