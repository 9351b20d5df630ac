use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// Device orientation of a frame variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Portrait" => Ok(Self::Portrait),
            "Landscape" => Ok(Self::Landscape),
            other => Err(format!("unknown orientation '{}'", other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portrait => f.write_str("Portrait"),
            Self::Landscape => f.write_str("Landscape"),
        }
    }
}

/// Leaf placement descriptor for one frame artwork
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Horizontal placement offset, integer text as stored in the descriptor
    pub x: String,

    /// Vertical placement offset, integer text as stored in the descriptor
    pub y: String,

    /// Base file name (no extension) of the artwork and its optional mask
    pub name: String,

    /// Expected screenshot width, used only for auto-detection and video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_width: Option<u32>,

    /// Expected screenshot height, used only for auto-detection and video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_height: Option<u32>,
}

impl Coordinates {
    /// Create coordinates without screenshot size metadata
    pub fn new(x: impl Into<String>, y: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            name: name.into(),
            screenshot_width: None,
            screenshot_height: None,
        }
    }

    /// Attach the expected screenshot size
    pub fn with_screenshot_size(mut self, width: u32, height: u32) -> Self {
        self.screenshot_width = Some(width);
        self.screenshot_height = Some(height);
        self
    }

    /// Parsed placement offset, `None` when either axis has no integer prefix
    pub fn offset(&self) -> Option<(i64, i64)> {
        Some((parse_int_prefix(&self.x)?, parse_int_prefix(&self.y)?))
    }

    /// Expected screenshot size when both dimensions are present
    pub fn screenshot_size(&self) -> Option<(u32, u32)> {
        match (self.screenshot_width, self.screenshot_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

/// Flattened catalog record for one device/orientation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// `category-model[-version][-variant][-orientation]`
    pub id: String,
    pub category: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub coordinates: Coordinates,
}

impl Frame {
    /// Build a frame, deriving its id from the present path segments
    pub fn new(
        category: impl Into<String>,
        model: impl Into<String>,
        version: Option<String>,
        variant: Option<String>,
        orientation: Option<Orientation>,
        coordinates: Coordinates,
    ) -> Self {
        let category = category.into();
        let model = model.into();

        let mut id = format!("{}-{}", category, model);
        for segment in [version.as_deref(), variant.as_deref()].into_iter().flatten() {
            id.push('-');
            id.push_str(segment);
        }
        if let Some(orientation) = orientation {
            id.push('-');
            id.push_str(&orientation.to_string());
        }

        Self {
            id,
            category,
            model,
            version,
            variant,
            orientation,
            coordinates,
        }
    }

    /// Placement offset in artwork pixel space
    pub fn offset(&self) -> Result<(i64, i64), ConfigError> {
        let x = parse_int_prefix(&self.coordinates.x).ok_or_else(|| ConfigError::InvalidOffset {
            frame_id: self.id.clone(),
            axis: "x",
            value: self.coordinates.x.clone(),
        })?;
        let y = parse_int_prefix(&self.coordinates.y).ok_or_else(|| ConfigError::InvalidOffset {
            frame_id: self.id.clone(),
            axis: "y",
            value: self.coordinates.y.clone(),
        })?;
        Ok((x, y))
    }

    /// Expected screenshot size, required by the video path
    pub fn required_screenshot_size(&self) -> Result<(u32, u32), ConfigError> {
        self.coordinates
            .screenshot_size()
            .ok_or_else(|| ConfigError::MissingScreenshotSize {
                frame_id: self.id.clone(),
            })
    }

    /// Artwork file name inside the asset root
    pub fn artwork_file(&self) -> String {
        format!("{}.png", self.coordinates.name)
    }

    /// Optional mask file name inside the asset root
    pub fn mask_file(&self) -> String {
        format!("{}_mask.png", self.coordinates.name)
    }

    /// Human readable label, e.g. `iPhone 15 Pro Black Titanium (Portrait)`
    pub fn label(&self) -> String {
        let mut label = self.model.clone();
        for part in [self.version.as_deref(), self.variant.as_deref()].into_iter().flatten() {
            label.push(' ');
            label.push_str(part);
        }
        if let Some(orientation) = self.orientation {
            label.push_str(&format!(" ({})", orientation));
        }
        label
    }
}

/// Leading-integer parse: optional whitespace, optional sign, decimal digits.
/// Anything after the digits is ignored; no digits yields `None`.
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
