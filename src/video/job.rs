use image::RgbaImage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::assets::{decode_raster, load_frame_files, AssetSource};
use crate::catalog::{Frame, FrameMatcher};
use crate::config::VideoConfig;
use crate::error::Result;
use crate::video::engine::{check_cancelled, parse_ffmpeg_duration, EngineEvent, MediaEngine};
use crate::video::program::{
    VideoProgramBuilder, FIRST_FRAME_IMAGE, FRAME_IMAGE, INPUT_VIDEO, MASK_IMAGE,
};

/// First frame of a clip plus what the engine reported about it
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    pub image: RgbaImage,

    /// Encoded PNG as produced by the engine
    pub png: Vec<u8>,

    /// Clip duration in seconds, when the engine reported one
    pub duration: Option<f64>,
}

impl ExtractedFrame {
    /// Default frame for the clip, matched on the first frame's size
    pub fn detect<'a>(&self, matcher: &FrameMatcher, frames: &'a [Frame]) -> Option<&'a Frame> {
        matcher.find(frames, self.image.width(), self.image.height())
    }
}

/// Runs video jobs on an exclusive media engine session
pub struct VideoFramer<S> {
    engine: MediaEngine,
    programs: VideoProgramBuilder,
    assets: S,
}

impl<S: AssetSource> VideoFramer<S> {
    pub fn new(config: &VideoConfig, assets: S) -> Self {
        Self {
            engine: MediaEngine::new(config),
            programs: VideoProgramBuilder::from_config(config),
            assets,
        }
    }

    pub fn engine(&self) -> &MediaEngine {
        &self.engine
    }

    /// Start a fresh session: drop the previous workspace and reload
    async fn fresh_session(&mut self) -> Result<()> {
        self.engine.reset();
        self.engine.load().await
    }

    /// Extract the clip's first frame as a still image
    pub async fn extract_first_frame(&mut self, video: &[u8], cancel: &CancellationToken) -> Result<ExtractedFrame> {
        self.fresh_session().await?;
        self.engine.write_file(INPUT_VIDEO, video).await?;
        check_cancelled(cancel)?;

        let program = self.programs.extract_first_frame(INPUT_VIDEO);
        self.engine.exec(&program, None, None, cancel).await?;

        let png = self.engine.read_file(FIRST_FRAME_IMAGE).await?;
        let image = decode_raster(&png, FIRST_FRAME_IMAGE)?;
        let duration = parse_ffmpeg_duration(&self.engine.log().contents());
        if duration.is_none() {
            warn!("Engine did not report a clip duration");
        }

        info!("Extracted first frame {}x{}", image.width(), image.height());
        Ok(ExtractedFrame { image, png, duration })
    }

    /// Frame a clip and return the encoded output video
    pub async fn frame_video(
        &mut self,
        video: &[u8],
        frame: &Frame,
        duration: f64,
        events: Option<mpsc::UnboundedSender<EngineEvent>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        frame.required_screenshot_size()?;
        let files = load_frame_files(&self.assets, frame).await?;
        let program = self.programs.overlay(
            INPUT_VIDEO,
            frame,
            duration,
            files.mask.is_some(),
            Some(files.artwork_size),
        )?;
        check_cancelled(cancel)?;

        self.fresh_session().await?;
        self.engine.write_file(INPUT_VIDEO, video).await?;
        self.engine.write_file(FRAME_IMAGE, &files.artwork).await?;
        if let Some(mask) = &files.mask {
            self.engine.write_file(MASK_IMAGE, mask).await?;
        }
        check_cancelled(cancel)?;

        info!("Framing {:.2}s clip with {}", duration, frame.id);
        self.engine.exec(&program, Some(duration), events, cancel).await?;

        let output = self.engine.read_file(&program.output).await?;
        info!("Framed video ready ({} bytes)", output.len());
        Ok(output)
    }
}
