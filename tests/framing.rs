use std::io::{Cursor, Read};
use std::path::Path;

use image::{Rgba, RgbaImage};
use tempfile::tempdir;

use device_framer::assets::{decode_raster, encode_png, DirectoryAssets};
use device_framer::catalog::{FrameCatalog, FrameMatcher};
use device_framer::compose::ImageCompositor;
use device_framer::config::VideoConfig;
use device_framer::export::{ArchivePackager, BatchExporter, MediaItem, ZipPackager};
use device_framer::video::{is_ffmpeg_available, CancellationToken, EngineEvent, VideoFramer};

const DESCRIPTOR: &str = r#"{
    "version": "3",
    "Phone": {
        "Test Phone": {
            "2": {
                "Silver": {
                    "Portrait": { "x": "10", "y": "20", "name": "phone", "screenshotWidth": 40, "screenshotHeight": 80 },
                    "Landscape": { "x": "20", "y": "10", "name": "phone-land", "screenshotWidth": 80, "screenshotHeight": 40 }
                }
            },
            "1": { "x": "0", "y": "0", "name": "old-phone" }
        }
    }
}"#;

/// 60x120 artwork, opaque 5px bezel, clear inside
fn write_assets(root: &Path) {
    let artwork = RgbaImage::from_fn(60, 120, |x, y| {
        if x < 5 || y < 5 || x >= 55 || y >= 115 {
            Rgba([30, 30, 30, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    // left half of the screen is cut away
    let mask = RgbaImage::from_fn(40, 80, |x, _| {
        if x < 20 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });

    std::fs::write(root.join("Frames.json"), DESCRIPTOR).unwrap();
    std::fs::write(root.join("phone.png"), encode_png(&artwork).unwrap()).unwrap();
    std::fs::write(root.join("phone_mask.png"), encode_png(&mask).unwrap()).unwrap();
}

fn screenshot(width: u32, height: u32) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, Rgba([0, 200, 0, 255]))).unwrap()
}

#[tokio::test]
async fn test_detect_and_compose_from_directory() {
    let dir = tempdir().unwrap();
    write_assets(dir.path());

    let catalog = FrameCatalog::load(dir.path().join("Frames.json")).await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.frames()[0].id, "Phone-Test Phone-1");

    let frame = catalog.detect(&FrameMatcher::default(), 41, 79).unwrap();
    assert_eq!(frame.id, "Phone-Test Phone-2-Silver-Portrait");

    let compositor = ImageCompositor::new(DirectoryAssets::new(dir.path()));
    let shot = decode_raster(&screenshot(40, 80), "shot").unwrap();
    let out = compositor.compose(&shot, frame, 1.0).await.unwrap();

    assert_eq!(out.dimensions(), (60, 120));
    // masked half is transparent, visible half shows the screenshot
    assert_eq!(*out.get_pixel(15, 50), Rgba([0, 0, 0, 0]));
    assert_eq!(*out.get_pixel(40, 50), Rgba([0, 200, 0, 255]));
    // bezel on top
    assert_eq!(*out.get_pixel(2, 50), Rgba([30, 30, 30, 255]));
}

#[tokio::test]
async fn test_batch_export_to_zip() {
    let dir = tempdir().unwrap();
    write_assets(dir.path());

    let catalog = FrameCatalog::load(dir.path().join("Frames.json")).await.unwrap();
    let frame = catalog.get("Phone-Test Phone-2-Silver-Portrait").unwrap();

    let items = vec![
        MediaItem::new("a.png", screenshot(40, 80)),
        MediaItem::new("b.png", screenshot(40, 80)),
        MediaItem::new("c.png", screenshot(40, 80)),
        MediaItem::new("d.png", b"corrupt".to_vec()),
    ];

    let exporter = BatchExporter::new(ImageCompositor::new(DirectoryAssets::new(dir.path())));
    let report = exporter.export_all(&items, frame).await;
    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.failures.len(), 1);

    let blob = ZipPackager.package(&report.entries).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(blob)).unwrap();
    assert_eq!(archive.len(), 3);

    let mut png = Vec::new();
    archive.by_name("framed-b.png").unwrap().read_to_end(&mut png).unwrap();
    assert_eq!(decode_raster(&png, "framed-b.png").unwrap().dimensions(), (60, 120));
}

#[tokio::test]
async fn test_frame_without_artwork_fails() {
    let dir = tempdir().unwrap();
    write_assets(dir.path());

    let catalog = FrameCatalog::load(dir.path().join("Frames.json")).await.unwrap();
    let frame = catalog.get("Phone-Test Phone-2-Silver-Landscape").unwrap();

    let compositor = ImageCompositor::new(DirectoryAssets::new(dir.path()));
    let shot = decode_raster(&screenshot(80, 40), "shot").unwrap();
    let err = compositor.compose(&shot, frame, 1.0).await.unwrap_err();
    assert!(err.user_message().contains("phone-land.png"));
}

/// Encode a short test clip with ffmpeg's own test source
fn make_clip(dir: &Path, ffmpeg: &Path) -> Vec<u8> {
    let path = dir.join("clip.mp4");
    let status = std::process::Command::new(ffmpeg)
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=40x80:rate=10:duration=1",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_video_roundtrip_with_ffmpeg() {
    let config = VideoConfig::default();
    if !is_ffmpeg_available(&config.ffmpeg_path) {
        eprintln!("ffmpeg not on PATH, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    write_assets(dir.path());
    let clip = make_clip(dir.path(), &config.ffmpeg_path);

    let catalog = FrameCatalog::load(dir.path().join("Frames.json")).await.unwrap();
    let mut framer = VideoFramer::new(&config, DirectoryAssets::new(dir.path()));
    let cancel = CancellationToken::new();

    let extracted = framer.extract_first_frame(&clip, &cancel).await.unwrap();
    assert_eq!(extracted.image.dimensions(), (40, 80));
    let duration = extracted.duration.unwrap();
    assert!(duration > 0.5 && duration < 1.5);

    let frame = extracted.detect(&FrameMatcher::default(), catalog.frames()).unwrap();
    assert_eq!(frame.id, "Phone-Test Phone-2-Silver-Portrait");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let output = framer
        .frame_video(&clip, frame, duration, Some(tx), &cancel)
        .await
        .unwrap();
    assert!(!output.is_empty());

    let mut saw_progress = false;
    while let Some(event) = rx.recv().await {
        if let EngineEvent::Progress(fraction) = event {
            assert!((0.0..=1.0).contains(&fraction));
            saw_progress = true;
        }
    }
    assert!(saw_progress);
}
