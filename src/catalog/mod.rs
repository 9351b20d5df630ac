//! # Frame Catalog Module
//!
//! Parses the nested device-frame descriptor into a flat, ordered list of
//! frames and offers size matching and drill-down selection over it.

pub mod frame;
pub mod matcher;
pub mod parser;
pub mod selection;
pub mod tree;

use std::path::Path;

use tracing::info;

use crate::error::CatalogError;

pub use frame::{Coordinates, Frame, Orientation};
pub use matcher::{find_frame_by_screenshot_size, FrameMatcher, DEFAULT_TOLERANCE};
pub use selection::Selection;
pub use tree::{DescriptorTree, Node};

/// Immutable, catalog-ordered frame table
#[derive(Debug, Clone, Default)]
pub struct FrameCatalog {
    schema_version: Option<String>,
    frames: Vec<Frame>,
}

impl FrameCatalog {
    /// Parse a descriptor JSON document
    pub fn parse(json: &str) -> Result<Self, CatalogError> {
        let tree = DescriptorTree::from_json(json)?;
        Self::from_tree(&tree)
    }

    /// Flatten an already parsed descriptor tree
    pub fn from_tree(tree: &DescriptorTree) -> Result<Self, CatalogError> {
        Ok(Self {
            schema_version: tree.schema_version.clone(),
            frames: parser::flatten(tree)?,
        })
    }

    /// Read and parse a descriptor file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| CatalogError::ReadFailed {
                path: path.display().to_string(),
            })?;

        let catalog = Self::parse(&text)?;
        info!(
            "Loaded {} frames from {} (schema {})",
            catalog.len(),
            path.display(),
            catalog.schema_version().unwrap_or("unversioned")
        );
        Ok(catalog)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|frame| frame.id == id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Default frame for a screenshot size
    pub fn detect(&self, matcher: &FrameMatcher, width: u32, height: u32) -> Option<&Frame> {
        matcher.find(&self.frames, width, height)
    }
}

impl<'a> IntoIterator for &'a FrameCatalog {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DESCRIPTOR: &str = r#"{
        "version": "1.0",
        "AppleDevice": {
            "iPhone 15": {
                "15": {
                    "Black": {
                        "Portrait": { "x": "100", "y": "200", "name": "iphone15", "screenshotWidth": 1179, "screenshotHeight": 2556 },
                        "Landscape": { "x": "200", "y": "100", "name": "iphone15-l", "screenshotWidth": 2556, "screenshotHeight": 1179 }
                    }
                }
            },
            "Apple Watch": { "x": "40", "y": "80", "name": "watch" }
        }
    }"#;

    #[test]
    fn test_parse_is_idempotent() {
        let first = FrameCatalog::parse(DESCRIPTOR).unwrap();
        let second = FrameCatalog::parse(DESCRIPTOR).unwrap();
        assert_eq!(first.frames(), second.frames());
        assert_eq!(first.len(), 3);
        assert_eq!(first.schema_version(), Some("1.0"));
    }

    #[test]
    fn test_ids_are_unique_and_sorted() {
        let catalog = FrameCatalog::parse(DESCRIPTOR).unwrap();
        let mut ids: Vec<&str> = catalog.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids[0], "AppleDevice-Apple Watch");
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_detect_and_get() {
        let catalog = FrameCatalog::parse(DESCRIPTOR).unwrap();
        let found = catalog.detect(&FrameMatcher::default(), 2555, 1180).unwrap();
        assert_eq!(found.id, "AppleDevice-iPhone 15-15-Black-Landscape");
        assert!(catalog.get("AppleDevice-Apple Watch").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Frames.json");
        tokio::fs::write(&path, DESCRIPTOR).await.unwrap();

        let catalog = FrameCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.len(), 3);

        let missing = FrameCatalog::load(dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(CatalogError::ReadFailed { .. })));
    }
}
