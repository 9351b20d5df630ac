//! # Device-Framer
//!
//! Place screenshots and screen recordings inside realistic device frames.
//!
//! This library parses a nested device-frame descriptor into a flat catalog,
//! picks the right frame for a screenshot by its pixel size, composites the
//! screenshot into the frame artwork through an optional mask, and expresses
//! the same operation as an ffmpeg filter graph for video clips.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use device_framer::{
//!     assets::{decode_raster, DirectoryAssets},
//!     catalog::{FrameCatalog, FrameMatcher},
//!     compose::ImageCompositor,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let catalog = FrameCatalog::load("frames/Frames.json").await?;
//! let screenshot = decode_raster(&std::fs::read("shot.png")?, "shot.png")?;
//!
//! let frame = catalog
//!     .detect(&FrameMatcher::default(), screenshot.width(), screenshot.height())
//!     .ok_or_else(|| anyhow::anyhow!("no device detected"))?;
//!
//! let compositor = ImageCompositor::new(DirectoryAssets::new("frames"));
//! let framed = compositor.compose(&screenshot, frame, 1.0).await?;
//! framed.save("framed-shot.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`catalog`] - Frame descriptor parsing, size matching and drill-down selection
//! - [`assets`] - Frame artwork and mask loading
//! - [`compose`] - Masked image compositing
//! - [`video`] - Filter-graph programs and the ffmpeg session
//! - [`export`] - Batch framing and archive packaging
//! - [`config`] - Configuration management

pub mod assets;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    catalog::{Frame, FrameCatalog, FrameMatcher},
    compose::ImageCompositor,
    config::Config,
    error::{FramerError, Result},
    export::BatchExporter,
    video::{VideoFramer, VideoProgramBuilder},
};
