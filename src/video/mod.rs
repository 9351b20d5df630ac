//! # Video Processing Module
//!
//! Frames video clips by driving an external ffmpeg binary: filter-graph
//! program synthesis, the engine session, and job orchestration.

pub mod engine;
pub mod job;
pub mod program;

pub use engine::{
    check_cancelled, is_ffmpeg_available, parse_ffmpeg_duration, EngineEvent, LogBuffer,
    MediaEngine, SessionState,
};
pub use tokio_util::sync::CancellationToken;
pub use job::{ExtractedFrame, VideoFramer};
pub use program::{EngineProgram, FilterGraph, OverlayLayout, VideoProgramBuilder};
