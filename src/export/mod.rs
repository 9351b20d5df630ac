//! # Batch Export Module
//!
//! Frames many screenshots with the current frame and collects the results
//! as named archive entries. One item failing never stops the batch.

mod archive;

use std::path::Path;

use tracing::{info, warn};

use crate::assets::AssetSource;
use crate::catalog::Frame;
use crate::compose::ImageCompositor;
use crate::error::FramerError;

pub use archive::{ArchiveEntry, ArchivePackager, ZipPackager};

/// Default name of the batch archive
pub const ARCHIVE_NAME: &str = "framed-screenshots.zip";

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "mov", "m4v", "webm", "mkv", "avi", "3gp"];

/// Kind of an uploaded media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by file extension; anything not known as video is an image
    pub fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => Self::Video,
            _ => Self::Image,
        }
    }
}

/// An uploaded screenshot or clip
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub name: String,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

impl MediaItem {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            kind: MediaKind::from_name(&name),
            name,
            bytes,
        }
    }
}

/// Drop the final extension: `shot.final.png` becomes `shot.final`
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Output name for a framed item, e.g. `framed-shot.png`
pub fn framed_name(name: &str, extension: &str) -> String {
    format!("framed-{}.{}", base_name(name), extension)
}

/// A batch item that could not be framed
#[derive(Debug)]
pub struct ExportFailure {
    pub item: String,
    pub error: FramerError,
}

/// Outcome of a batch export
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Framed images, one per distinct output name
    pub entries: Vec<ArchiveEntry>,
    pub failures: Vec<ExportFailure>,

    /// Names of items that were not images
    pub skipped: Vec<String>,
}

impl BatchReport {
    /// Add an entry, replacing any earlier entry with the same name
    pub fn push_entry(&mut self, entry: ArchiveEntry) {
        match self.entries.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => {
                warn!("Replacing duplicate archive entry {}", entry.name);
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Frames every screenshot in a batch with a single frame
pub struct BatchExporter<S> {
    compositor: ImageCompositor<S>,
}

impl<S: AssetSource> BatchExporter<S> {
    pub fn new(compositor: ImageCompositor<S>) -> Self {
        Self { compositor }
    }

    /// Frame items strictly in order at export scale. Videos are skipped,
    /// per-item errors are recorded and the batch carries on.
    pub async fn export_all(&self, items: &[MediaItem], frame: &Frame) -> BatchReport {
        let mut report = BatchReport::default();

        for item in items {
            if item.kind == MediaKind::Video {
                info!("Skipping video {} in batch export", item.name);
                report.skipped.push(item.name.clone());
                continue;
            }

            match self.compositor.compose_encoded(&item.bytes, frame).await {
                Ok(bytes) => report.push_entry(ArchiveEntry {
                    name: framed_name(&item.name, "png"),
                    bytes,
                }),
                Err(error) => {
                    warn!("Failed to frame {}: {}", item.name, error);
                    report.failures.push(ExportFailure {
                        item: item.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Batch export finished: {} framed, {} failed, {} skipped",
            report.entries.len(),
            report.failures.len(),
            report.skipped.len()
        );
        report
    }

    /// Export and package the successful entries
    pub async fn export_archive<P: ArchivePackager>(
        &self,
        items: &[MediaItem],
        frame: &Frame,
        packager: &P,
    ) -> crate::error::Result<(Vec<u8>, BatchReport)> {
        let report = self.export_all(items, frame).await;
        let archive = packager.package(&report.entries)?;
        Ok((archive, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{encode_png, MemoryAssets};
    use crate::catalog::Coordinates;
    use image::{Rgba, RgbaImage};

    fn frame() -> Frame {
        Frame::new("Phone", "Test", None, None, None, Coordinates::new("2", "2", "test"))
    }

    fn exporter() -> BatchExporter<MemoryAssets> {
        let artwork = encode_png(&RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]))).unwrap();
        let assets = MemoryAssets::new().with_file("test.png", artwork);
        BatchExporter::new(ImageCompositor::new(assets))
    }

    fn screenshot() -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255]))).unwrap()
    }

    #[test]
    fn test_output_naming() {
        assert_eq!(framed_name("shot.png", "png"), "framed-shot.png");
        assert_eq!(framed_name("shot.final.jpeg", "png"), "framed-shot.final.png");
        assert_eq!(framed_name("noext", "png"), "framed-noext.png");
        assert_eq!(framed_name("trailing.", "png"), "framed-trailing..png");
        assert_eq!(framed_name("clip.MOV", "mp4"), "framed-clip.mp4");
    }

    #[test]
    fn test_media_kind() {
        assert_eq!(MediaKind::from_name("a.PNG"), MediaKind::Image);
        assert_eq!(MediaKind::from_name("a.MOV"), MediaKind::Video);
        assert_eq!(MediaKind::from_name("a.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_name("noext"), MediaKind::Image);
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let items = vec![
            MediaItem::new("one.png", screenshot()),
            MediaItem::new("broken.png", b"not a png".to_vec()),
            MediaItem::new("two.jpg", screenshot()),
            MediaItem::new("three.png", screenshot()),
        ];

        let report = exporter().export_all(&items, &frame()).await;
        let names: Vec<&str> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["framed-one.png", "framed-two.png", "framed-three.png"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "broken.png");
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_videos_skipped_and_duplicates_replaced() {
        let items = vec![
            MediaItem::new("shot.png", screenshot()),
            MediaItem::new("clip.mp4", vec![0; 16]),
            MediaItem::new("shot.jpg", screenshot()),
        ];

        let report = exporter().export_all(&items, &frame()).await;
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].name, "framed-shot.png");
        assert_eq!(report.skipped, vec!["clip.mp4".to_string()]);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_missing_artwork_fails_every_item() {
        let exporter = BatchExporter::new(ImageCompositor::new(MemoryAssets::new()));
        let items = vec![MediaItem::new("a.png", screenshot()), MediaItem::new("b.png", screenshot())];

        let (archive, report) = exporter.export_archive(&items, &frame(), &ZipPackager).await.unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(!archive.is_empty());
    }
}
