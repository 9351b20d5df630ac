use tracing::debug;

use crate::catalog::frame::Frame;

/// Per-axis pixel slack accepted when matching screenshot sizes
pub const DEFAULT_TOLERANCE: u32 = 2;

/// Picks a default frame for an observed screenshot size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMatcher {
    tolerance: u32,
}

impl Default for FrameMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl FrameMatcher {
    pub fn new(tolerance: u32) -> Self {
        Self { tolerance }
    }

    /// First frame in catalog order whose expected screenshot size is within
    /// tolerance on both axes. Frames without size metadata never match.
    pub fn find<'a>(&self, frames: &'a [Frame], width: u32, height: u32) -> Option<&'a Frame> {
        let found = frames.iter().find(|frame| self.accepts(frame, width, height));

        match found {
            Some(frame) => debug!("Matched {}x{} to frame {}", width, height, frame.id),
            None => debug!("No frame matches {}x{}", width, height),
        }
        found
    }

    /// Whether a single frame accepts the observed size
    pub fn accepts(&self, frame: &Frame, width: u32, height: u32) -> bool {
        match frame.coordinates.screenshot_size() {
            Some((expected_w, expected_h)) => {
                expected_w.abs_diff(width) <= self.tolerance
                    && expected_h.abs_diff(height) <= self.tolerance
            }
            None => false,
        }
    }
}

/// Match with the default tolerance
pub fn find_frame_by_screenshot_size(frames: &[Frame], width: u32, height: u32) -> Option<&Frame> {
    FrameMatcher::default().find(frames, width, height)
}
