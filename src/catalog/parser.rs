use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::catalog::frame::{parse_int_prefix, Coordinates, Frame, Orientation};
use crate::catalog::tree::{DescriptorTree, Node};
use crate::error::CatalogError;

/// category, model, version, variant, orientation
const MAX_DEPTH: usize = 5;

/// Flatten the descriptor tree into catalog-ordered frames
pub fn flatten(tree: &DescriptorTree) -> Result<Vec<Frame>, CatalogError> {
    let mut walker = Walker::default();

    for (category, node) in &tree.categories {
        match node {
            Node::Leaf(_) => {
                return Err(CatalogError::Malformed {
                    path: category.clone(),
                    reason: "a category must contain device models, not coordinates".to_string(),
                })
            }
            Node::Branch(models) => {
                for (model, child) in models {
                    let mut segments = vec![category.as_str(), model.as_str()];
                    walker.walk(&mut segments, child)?;
                }
            }
        }
    }

    let mut frames = walker.frames;
    sort_frames(&mut frames);
    debug!("Flattened {} frames from {} categories", frames.len(), tree.categories.len());
    Ok(frames)
}

#[derive(Default)]
struct Walker {
    frames: Vec<Frame>,
    seen: HashSet<String>,
}

impl Walker {
    fn walk<'a>(&mut self, segments: &mut Vec<&'a str>, node: &'a Node) -> Result<(), CatalogError> {
        match node {
            Node::Leaf(coordinates) => {
                let frame = frame_from_segments(segments, coordinates.clone())?;
                if !self.seen.insert(frame.id.clone()) {
                    return Err(CatalogError::DuplicateId { id: frame.id });
                }
                self.frames.push(frame);
                Ok(())
            }
            Node::Branch(children) => {
                if segments.len() >= MAX_DEPTH {
                    return Err(CatalogError::Malformed {
                        path: segments.join("/"),
                        reason: "nesting continues past the orientation level".to_string(),
                    });
                }
                for (key, child) in children {
                    segments.push(key.as_str());
                    let result = self.walk(segments, child);
                    segments.pop();
                    result?;
                }
                Ok(())
            }
        }
    }
}

fn frame_from_segments(
    segments: &[&str],
    coordinates: Coordinates,
) -> Result<Frame, CatalogError> {
    let owned = |i: usize| segments.get(i).map(|s| s.to_string());

    let orientation = match segments.get(4) {
        Some(raw) => Some(raw.parse::<Orientation>().map_err(|reason| CatalogError::Malformed {
            path: segments.join("/"),
            reason,
        })?),
        None => None,
    };

    Ok(Frame::new(
        segments[0],
        segments[1],
        owned(2),
        owned(3),
        orientation,
        coordinates,
    ))
}

/// Stable sort by (category, model, version), unversioned entries last
pub fn sort_frames(frames: &mut [Frame]) {
    frames.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.model.cmp(&b.model))
            .then_with(|| compare_versions(a.version.as_deref(), b.version.as_deref()))
    });
}

/// Numeric version order using the leading number (`"12-13"` sorts as 12).
/// Versions without a number follow numeric ones; absent versions go last.
pub fn compare_versions(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (parse_int_prefix(a), parse_int_prefix(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
