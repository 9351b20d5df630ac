use thiserror::Error;

/// Main error type for the device-framer library
#[derive(Error, Debug)]
pub enum FramerError {
    #[error("Frame catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Asset loading error: {0}")]
    Asset(#[from] AssetError),

    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("No matching device found for size {width}x{height}px")]
    NoMatchingFrame { width: u32, height: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Frame descriptor errors. Always fatal to the catalog load.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Frame descriptor is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Malformed frame descriptor at '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("Duplicate device definition: {id}")]
    DuplicateId { id: String },

    #[error("Failed to read frame descriptor: {path}")]
    ReadFailed { path: String },
}

/// Frame artwork, mask and screenshot loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Frame artwork not found: {path}")]
    ArtworkMissing { path: String },

    #[error("Failed to read asset {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to decode {what}: {reason}")]
    DecodeFailed { what: String, reason: String },

    #[error("Failed to encode image: {reason}")]
    EncodeFailed { reason: String },

    #[error("Failed to build archive: {reason}")]
    ArchiveFailed { reason: String },
}

/// Rendering surface errors
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Invalid render scale: {scale}")]
    InvalidScale { scale: f64 },

    #[error("Canvas size {width}x{height} is not drawable")]
    InvalidDimensions { width: u64, height: u64 },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Frame '{frame_id}' is missing screenshotWidth/screenshotHeight")]
    MissingScreenshotSize { frame_id: String },

    #[error("Frame '{frame_id}' has an invalid {axis} offset: {value}")]
    InvalidOffset {
        frame_id: String,
        axis: &'static str,
        value: String,
    },
}

/// External media engine errors. Never retried automatically.
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Media engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("Media engine is {state}, expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    #[error("Media engine failed: {reason}")]
    EngineFailed { reason: String, log: String },

    #[error("Media engine produced no output file: {name}")]
    OutputMissing { name: String, log: String },

    #[error("Video job cancelled")]
    Cancelled,

    #[error("Could not determine the clip duration")]
    UnknownDuration,
}

/// Convenience type alias for Results using FramerError
pub type Result<T> = std::result::Result<T, FramerError>;

impl FramerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Asset(AssetError::ReadFailed { .. }) => true,
            // Advisory only; the caller keeps its previous selection
            Self::NoMatchingFrame { .. } => true,
            _ => false,
        }
    }

    /// Diagnostic log captured from the media engine, if any
    pub fn engine_log(&self) -> Option<&str> {
        match self {
            Self::Video(VideoError::EngineFailed { log, .. })
            | Self::Video(VideoError::OutputMissing { log, .. }) => Some(log),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Asset(AssetError::ArtworkMissing { path }) => {
                format!("Frame artwork '{}' could not be found. Check the frames directory.", path)
            }
            Self::Config(ConfigError::MissingScreenshotSize { frame_id }) => {
                format!("Frame '{}' cannot be used for video: it has no screenshot size.", frame_id)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Video(VideoError::EngineUnavailable { .. }) => {
                "FFmpeg not found. Please install FFmpeg or set video.ffmpeg_path.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
