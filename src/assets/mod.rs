//! # Frame Assets Module
//!
//! Locates and decodes the artwork (`{name}.png`) and optional mask
//! (`{name}_mask.png`) of a frame.

mod source;

use std::io::Cursor;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::catalog::Frame;
use crate::error::AssetError;

pub use source::{AssetSource, DirectoryAssets, MemoryAssets};

/// Decoded frame layers ready for compositing
#[derive(Debug, Clone)]
pub struct DecodedAssets {
    pub artwork: RgbaImage,
    pub mask: Option<RgbaImage>,
}

/// Encoded frame files for the media engine
#[derive(Debug, Clone)]
pub struct FrameFiles {
    pub artwork: Vec<u8>,
    pub mask: Option<Vec<u8>>,

    /// Artwork pixel size read from the image header
    pub artwork_size: (u32, u32),
}

/// Decode any supported raster format into RGBA8
pub fn decode_raster(bytes: &[u8], what: &str) -> Result<RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| AssetError::DecodeFailed {
            what: what.to_string(),
            reason: e.to_string(),
        })
}

/// Pixel size from the image header without decoding the pixels
pub fn raster_dimensions(bytes: &[u8], what: &str) -> Result<(u32, u32), AssetError> {
    let decode_failed = |reason: String| AssetError::DecodeFailed {
        what: what.to_string(),
        reason,
    };
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_failed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| decode_failed(e.to_string()))
}

async fn fetch_artwork<S: AssetSource>(source: &S, frame: &Frame) -> Result<Vec<u8>, AssetError> {
    let file = frame.artwork_file();
    source
        .fetch(&file)
        .await
        .map_err(|e| AssetError::ReadFailed {
            path: source.describe(&file),
            reason: e.to_string(),
        })?
        .ok_or_else(|| AssetError::ArtworkMissing {
            path: source.describe(&file),
        })
}

/// Mask bytes, or `None` when the mask is absent or unreadable
async fn fetch_mask<S: AssetSource>(source: &S, frame: &Frame) -> Option<Vec<u8>> {
    let file = frame.mask_file();
    match source.fetch(&file).await {
        Ok(Some(bytes)) => Some(bytes),
        Ok(None) => {
            debug!("No mask for frame {}", frame.id);
            None
        }
        Err(e) => {
            warn!("Ignoring unreadable mask {}: {}", source.describe(&file), e);
            None
        }
    }
}

/// Load and decode artwork and mask for a frame. Missing artwork is an
/// error; a missing or undecodable mask is not.
pub async fn load_frame_assets<S: AssetSource>(
    source: &S,
    frame: &Frame,
) -> Result<DecodedAssets, AssetError> {
    let artwork_bytes = fetch_artwork(source, frame).await?;
    let artwork = decode_raster(&artwork_bytes, &frame.artwork_file())?;

    let mask = match fetch_mask(source, frame).await {
        Some(bytes) => match decode_raster(&bytes, &frame.mask_file()) {
            Ok(mask) => Some(mask),
            Err(e) => {
                warn!("Treating mask as absent: {}", e);
                None
            }
        },
        None => None,
    };

    debug!(
        "Loaded assets for {}: artwork {}x{}, mask {}",
        frame.id,
        artwork.width(),
        artwork.height(),
        if mask.is_some() { "present" } else { "absent" }
    );
    Ok(DecodedAssets { artwork, mask })
}

/// Load the encoded artwork and mask for handing to the media engine.
/// Masks that do not decode are dropped, as on the image path.
pub async fn load_frame_files<S: AssetSource>(
    source: &S,
    frame: &Frame,
) -> Result<FrameFiles, AssetError> {
    let artwork = fetch_artwork(source, frame).await?;
    let artwork_size = raster_dimensions(&artwork, &frame.artwork_file())?;

    let mask = match fetch_mask(source, frame).await {
        Some(bytes) => match raster_dimensions(&bytes, &frame.mask_file()) {
            Ok(_) => Some(bytes),
            Err(e) => {
                warn!("Treating mask as absent: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(FrameFiles {
        artwork,
        mask,
        artwork_size,
    })
}

/// Encode an RGBA raster as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, AssetError> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .map_err(|e| AssetError::EncodeFailed {
            reason: e.to_string(),
        })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Coordinates;
    use image::Rgba;

    fn frame() -> Frame {
        Frame::new("Phone", "Test", None, None, None, Coordinates::new("1", "2", "test"))
    }

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(width, height, Rgba(color))).unwrap()
    }

    #[tokio::test]
    async fn test_missing_artwork_is_an_error() {
        let assets = MemoryAssets::new();
        let err = load_frame_assets(&assets, &frame()).await.unwrap_err();
        assert!(matches!(err, AssetError::ArtworkMissing { .. }));
    }

    #[tokio::test]
    async fn test_mask_is_optional() {
        let assets = MemoryAssets::new().with_file("test.png", png(4, 3, [1, 2, 3, 255]));
        let loaded = load_frame_assets(&assets, &frame()).await.unwrap();
        assert_eq!(loaded.artwork.dimensions(), (4, 3));
        assert!(loaded.mask.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_mask_is_treated_as_absent() {
        let assets = MemoryAssets::new()
            .with_file("test.png", png(4, 3, [1, 2, 3, 255]))
            .with_file("test_mask.png", b"not an image".to_vec());
        let loaded = load_frame_assets(&assets, &frame()).await.unwrap();
        assert!(loaded.mask.is_none());

        let files = load_frame_files(&assets, &frame()).await.unwrap();
        assert!(files.mask.is_none());
        assert_eq!(files.artwork_size, (4, 3));
    }

    #[tokio::test]
    async fn test_undecodable_artwork_fails() {
        let assets = MemoryAssets::new().with_file("test.png", b"garbage".to_vec());
        let err = load_frame_assets(&assets, &frame()).await.unwrap_err();
        assert!(matches!(err, AssetError::DecodeFailed { .. }));
    }
}
