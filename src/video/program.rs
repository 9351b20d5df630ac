//! Filter-graph programs for the external media engine
//!
//! Programs reference files by their name inside the engine's workspace;
//! the engine session resolves them.

use crate::catalog::Frame;
use crate::config::VideoConfig;
use crate::error::ConfigError;

/// Source clip inside the engine workspace
pub const INPUT_VIDEO: &str = "input.mp4";
/// Frame artwork inside the engine workspace
pub const FRAME_IMAGE: &str = "frame.png";
/// Frame mask inside the engine workspace
pub const MASK_IMAGE: &str = "mask.png";
/// Framed clip produced by the overlay program
pub const OUTPUT_VIDEO: &str = "output.mp4";
/// Still produced by the first-frame program
pub const FIRST_FRAME_IMAGE: &str = "video.png";

/// Builder for a `-filter_complex` graph made of labelled chains
#[derive(Debug, Default)]
pub struct FilterGraph {
    chains: Vec<String>,
}

impl FilterGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one chain: `[in1][in2]filters[out]`
    #[must_use]
    pub fn chain(mut self, inputs: &[&str], filters: &str, output: &str) -> Self {
        let mut chain = String::new();
        for input in inputs {
            chain.push('[');
            chain.push_str(input);
            chain.push(']');
        }
        chain.push_str(filters);
        chain.push('[');
        chain.push_str(output);
        chain.push(']');
        self.chains.push(chain);
        self
    }

    /// Join all chains into a single graph description
    #[must_use]
    pub fn build(self) -> String {
        self.chains.join("; ")
    }
}

/// An argument list for the engine with the files it reads and writes
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProgram {
    /// Workspace files that must exist before execution
    pub inputs: Vec<String>,

    /// Engine arguments, without the session's global flags
    pub args: Vec<String>,

    /// Workspace file produced on success
    pub output: String,
}

impl EngineProgram {
    pub fn filter_graph(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == "-filter_complex")
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Geometry of an overlay job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    pub screenshot_size: (u32, u32),
    pub offset: (i64, i64),

    /// Artwork size when known; widens the canvas so the bezel is never cropped
    pub artwork_size: Option<(u32, u32)>,
}

impl OverlayLayout {
    /// Layout from a frame's coordinates. Requires the screenshot size.
    pub fn for_frame(frame: &Frame, artwork_size: Option<(u32, u32)>) -> Result<Self, ConfigError> {
        Ok(Self {
            screenshot_size: frame.required_screenshot_size()?,
            offset: frame.offset()?,
            artwork_size,
        })
    }

    /// Canvas holding the placed screenshot and the artwork
    pub fn canvas_size(&self) -> (i64, i64) {
        let (sw, sh) = self.screenshot_size;
        let mut width = i64::from(sw).saturating_add(self.offset.0).max(1);
        let mut height = i64::from(sh).saturating_add(self.offset.1).max(1);
        if let Some((aw, ah)) = self.artwork_size {
            width = width.max(i64::from(aw));
            height = height.max(i64::from(ah));
        }
        (width, height)
    }
}

/// Synthesizes engine programs for first-frame extraction and overlays
#[derive(Debug, Clone)]
pub struct VideoProgramBuilder {
    video_codec: String,
    pixel_format: String,
}

impl Default for VideoProgramBuilder {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default())
    }
}

impl VideoProgramBuilder {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            pixel_format: config.pixel_format.clone(),
        }
    }

    #[must_use]
    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = codec.into();
        self
    }

    #[must_use]
    pub fn with_pixel_format(mut self, pixel_format: impl Into<String>) -> Self {
        self.pixel_format = pixel_format.into();
        self
    }

    /// Single still PNG of the first video frame
    pub fn extract_first_frame(&self, input: &str) -> EngineProgram {
        EngineProgram {
            inputs: vec![input.to_string()],
            args: strings(&["-i", input, "-vframes", "1", "-f", "image2", FIRST_FRAME_IMAGE]),
            output: FIRST_FRAME_IMAGE.to_string(),
        }
    }

    /// Place the clip inside the frame artwork, optionally cut by the mask
    ///
    /// Inputs: 0 is the clip, 1 the artwork, 2 the mask when present.
    pub fn overlay(
        &self,
        input: &str,
        frame: &Frame,
        duration: f64,
        has_mask: bool,
        artwork_size: Option<(u32, u32)>,
    ) -> Result<EngineProgram, ConfigError> {
        let layout = OverlayLayout::for_frame(frame, artwork_size)?;
        self.overlay_with_layout(input, &layout, duration, has_mask)
    }

    pub fn overlay_with_layout(
        &self,
        input: &str,
        layout: &OverlayLayout,
        duration: f64,
        has_mask: bool,
    ) -> Result<EngineProgram, ConfigError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "duration".to_string(),
                value: duration.to_string(),
            });
        }

        let graph = overlay_graph(layout, duration, has_mask);
        let duration = duration.to_string();

        let mut inputs = vec![input.to_string(), FRAME_IMAGE.to_string()];
        let mut args = strings(&["-i", input, "-i", FRAME_IMAGE]);
        if has_mask {
            inputs.push(MASK_IMAGE.to_string());
            args.extend(strings(&["-i", MASK_IMAGE]));
        }

        args.extend(strings(&[
            "-filter_complex",
            &graph,
            "-map",
            "[out]",
            "-map",
            "0:a?",
            "-c:v",
            &self.video_codec,
            "-pix_fmt",
            &self.pixel_format,
            "-c:a",
            "copy",
            "-shortest",
            "-t",
            &duration,
            OUTPUT_VIDEO,
        ]));

        Ok(EngineProgram {
            inputs,
            args,
            output: OUTPUT_VIDEO.to_string(),
        })
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

fn transparent_source(width: i64, height: i64, duration: f64) -> String {
    format!("color=color=0x00000000:size={}x{}:d={},format=rgba", width, height, duration)
}

/// Any non-black mask pixel becomes white so the matte is a hard cut
fn binary_matte(width: u32, height: u32) -> String {
    let lit = "'255*gt(r(X,Y)+g(X,Y)+b(X,Y),0)'";
    format!(
        "scale={}:{},format=gbrp,geq=r={lit}:g={lit}:b={lit},format=gray",
        width,
        height,
        lit = lit
    )
}

fn overlay_graph(layout: &OverlayLayout, duration: f64, has_mask: bool) -> String {
    let (sw, sh) = layout.screenshot_size;
    let (x, y) = layout.offset;
    let (canvas_w, canvas_h) = layout.canvas_size();
    let mut graph = FilterGraph::new();

    let placed = if has_mask {
        // alphamerge needs equal sizes, so the clip is fitted to the matte
        graph = graph
            .chain(&["0:v"], &format!("scale={}:{},format=rgba", sw, sh), "vid")
            .chain(&["2:v"], &binary_matte(sw, sh), "matte")
            .chain(&["vid", "matte"], "alphamerge", "masked")
            .chain(&[], &transparent_source(i64::from(sw), i64::from(sh), duration), "transparent")
            .chain(&["transparent", "masked"], "overlay=0:0", "placed");
        "placed"
    } else {
        graph = graph.chain(&["0:v"], "format=rgba", "vid");
        "vid"
    };

    graph
        .chain(&[], &transparent_source(canvas_w, canvas_h, duration), "canvas")
        .chain(&["canvas", placed], &format!("overlay={}:{}", x, y), "screenshot_on_canvas")
        .chain(&["screenshot_on_canvas", "1:v"], "overlay=0:0:format=auto", "final")
        .chain(&["final"], "pad=width=ceil(iw/2)*2:height=ceil(ih/2)*2", "out")
        .build()
}
