use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for device-framer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame artwork and descriptor location
    pub assets: AssetsConfig,

    /// Screenshot-size auto-detection settings
    pub matching: MatchingConfig,

    /// Interactive preview settings
    pub preview: PreviewConfig,

    /// External media engine settings
    pub video: VideoConfig,

    /// Batch export settings
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.assets.validate()?;
        self.preview.validate()?;
        self.video.validate()?;
        self.export.validate()?;
        Ok(())
    }

    /// Full path of the frame descriptor document
    pub fn descriptor_path(&self) -> PathBuf {
        self.assets.root.join(&self.assets.descriptor)
    }
}

/// Where frame artwork lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory holding `{name}.png`, `{name}_mask.png` and the descriptor
    pub root: PathBuf,

    /// Descriptor file name, relative to `root`
    pub descriptor: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("frames"),
            descriptor: "Frames.json".to_string(),
        }
    }
}

impl AssetsConfig {
    fn validate(&self) -> Result<()> {
        if self.descriptor.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "assets.descriptor".to_string(),
                value: self.descriptor.clone()
            }.into());
        }

        Ok(())
    }
}

/// Screenshot-size matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum per-axis pixel difference for a dimension match
    pub tolerance: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { tolerance: 2 }
    }
}

/// Preview rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Upper bound for the preview canvas width in pixels
    pub max_width: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { max_width: 800 }
    }
}

impl PreviewConfig {
    fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "preview.max_width".to_string(),
                value: self.max_width.to_string()
            }.into());
        }

        Ok(())
    }
}

/// External media engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// FFmpeg executable, looked up on PATH when not absolute
    pub ffmpeg_path: PathBuf,

    /// Encoder for framed video output
    pub video_codec: String,

    /// Output pixel format
    pub pixel_format: String,

    /// Number of engine log lines kept for diagnostics
    pub log_capacity: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            log_capacity: 500,
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.video_codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.video_codec".to_string(),
                value: self.video_codec.clone()
            }.into());
        }

        if self.pixel_format.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.pixel_format".to_string(),
                value: self.pixel_format.clone()
            }.into());
        }

        if self.log_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "video.log_capacity".to_string(),
                value: self.log_capacity.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Batch export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// File name of the batch archive
    pub archive_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            archive_name: "framed-screenshots.zip".to_string(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if self.archive_name.trim().is_empty() || self.archive_name.contains('/') {
            return Err(ConfigError::InvalidValue {
                key: "export.archive_name".to_string(),
                value: self.archive_name.clone()
            }.into());
        }

        Ok(())
    }
}
