//! Drill-down over the flattened catalog: category, model, version,
//! variant and finally orientation.

use crate::catalog::frame::{Frame, Orientation};

fn distinct<'a, I>(values: I) -> Vec<&'a str>
where
    I: Iterator<Item = &'a str>,
{
    let mut out: Vec<&str> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Distinct categories in catalog order
pub fn categories(frames: &[Frame]) -> Vec<&str> {
    distinct(frames.iter().map(|f| f.category.as_str()))
}

/// Distinct models of a category
pub fn models<'a>(frames: &'a [Frame], category: &str) -> Vec<&'a str> {
    distinct(
        frames
            .iter()
            .filter(|f| f.category == category)
            .map(|f| f.model.as_str()),
    )
}

/// Distinct versions of a model; unversioned frames contribute nothing
pub fn versions<'a>(frames: &'a [Frame], category: &str, model: &str) -> Vec<&'a str> {
    distinct(
        frames
            .iter()
            .filter(|f| f.category == category && f.model == model)
            .filter_map(|f| f.version.as_deref()),
    )
}

/// Distinct variants under a model and optional version
pub fn variants<'a>(
    frames: &'a [Frame],
    category: &str,
    model: &str,
    version: Option<&str>,
) -> Vec<&'a str> {
    distinct(
        frames
            .iter()
            .filter(|f| f.category == category && f.model == model)
            .filter(|f| version.is_none() || f.version.as_deref() == version)
            .filter_map(|f| f.variant.as_deref()),
    )
}

/// Orientations available for an exact version/variant path
pub fn orientations(
    frames: &[Frame],
    category: &str,
    model: &str,
    version: Option<&str>,
    variant: Option<&str>,
) -> Vec<Orientation> {
    let mut out = Vec::new();
    for frame in frames {
        if frame.category == category
            && frame.model == model
            && frame.version.as_deref() == version
            && frame.variant.as_deref() == variant
        {
            if let Some(orientation) = frame.orientation {
                if !out.contains(&orientation) {
                    out.push(orientation);
                }
            }
        }
    }
    out
}

/// Partial user choice; unset levels fall back to the first available entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub category: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub variant: Option<String>,
    pub orientation: Option<Orientation>,
}

impl Selection {
    /// Selection pointing at a specific frame
    pub fn of(frame: &Frame) -> Self {
        Self {
            category: Some(frame.category.clone()),
            model: Some(frame.model.clone()),
            version: frame.version.clone(),
            variant: frame.variant.clone(),
            orientation: frame.orientation,
        }
    }

    /// Resolve to a frame. Missing levels take the first value in catalog
    /// order; without an explicit orientation Portrait wins when the final
    /// candidates offer more than one.
    pub fn resolve<'a>(&self, frames: &'a [Frame]) -> Option<&'a Frame> {
        let category = match self.category.as_deref() {
            Some(category) => category,
            None => *categories(frames).first()?,
        };
        let model = match self.model.as_deref() {
            Some(model) => model,
            None => *models(frames, category).first()?,
        };
        let version = match self.version.as_deref() {
            Some(version) => Some(version),
            None => versions(frames, category, model).first().copied(),
        };
        let variant = match self.variant.as_deref() {
            Some(variant) => Some(variant),
            None => variants(frames, category, model, version).first().copied(),
        };

        let candidates: Vec<&Frame> = frames
            .iter()
            .filter(|f| f.category == category && f.model == model)
            .filter(|f| f.version.as_deref() == version)
            .filter(|f| f.variant.as_deref() == variant)
            .collect();

        if let Some(wanted) = self.orientation {
            return candidates.into_iter().find(|f| f.orientation == Some(wanted));
        }

        if candidates.len() > 1 {
            if let Some(portrait) = candidates
                .iter()
                .find(|f| f.orientation == Some(Orientation::Portrait))
            {
                return Some(*portrait);
            }
        }
        candidates.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::frame::Coordinates;

    fn frame(
        model: &str,
        version: Option<&str>,
        variant: Option<&str>,
        orientation: Option<Orientation>,
    ) -> Frame {
        Frame::new(
            "Phone",
            model,
            version.map(str::to_string),
            variant.map(str::to_string),
            orientation,
            Coordinates::new("0", "0", "f"),
        )
    }

    fn sample() -> Vec<Frame> {
        vec![
            frame("iPhone 15", Some("15"), Some("Blue"), Some(Orientation::Landscape)),
            frame("iPhone 15", Some("15"), Some("Blue"), Some(Orientation::Portrait)),
            frame("iPhone 15", Some("15"), Some("Pink"), None),
            frame("iPhone 15", Some("Pro"), Some("Black"), Some(Orientation::Landscape)),
            frame("Pixel", None, None, None),
        ]
    }

    #[test]
    fn test_drill_down_lists() {
        let frames = sample();
        assert_eq!(categories(&frames), vec!["Phone"]);
        assert_eq!(models(&frames, "Phone"), vec!["iPhone 15", "Pixel"]);
        assert_eq!(versions(&frames, "Phone", "iPhone 15"), vec!["15", "Pro"]);
        assert!(versions(&frames, "Phone", "Pixel").is_empty());
        assert_eq!(variants(&frames, "Phone", "iPhone 15", Some("15")), vec!["Blue", "Pink"]);
        assert_eq!(
            orientations(&frames, "Phone", "iPhone 15", Some("15"), Some("Blue")),
            vec![Orientation::Landscape, Orientation::Portrait]
        );
    }

    #[test]
    fn test_portrait_preferred_when_unspecified() {
        let frames = sample();
        let resolved = Selection::default().resolve(&frames).unwrap();
        assert_eq!(resolved.id, "Phone-iPhone 15-15-Blue-Portrait");
    }

    #[test]
    fn test_single_orientation_taken_as_is() {
        let frames = sample();
        let selection = Selection {
            category: Some("Phone".to_string()),
            model: Some("iPhone 15".to_string()),
            version: Some("Pro".to_string()),
            ..Selection::default()
        };
        let resolved = selection.resolve(&frames).unwrap();
        assert_eq!(resolved.orientation, Some(Orientation::Landscape));
    }

    #[test]
    fn test_explicit_orientation_and_unversioned_model() {
        let frames = sample();
        let selection = Selection {
            orientation: Some(Orientation::Landscape),
            ..Selection::default()
        };
        assert_eq!(selection.resolve(&frames).unwrap().id, "Phone-iPhone 15-15-Blue-Landscape");

        let selection = Selection {
            model: Some("Pixel".to_string()),
            ..Selection::default()
        };
        assert_eq!(selection.resolve(&frames).unwrap().id, "Phone-Pixel");
        assert_eq!(Selection::of(&frames[2]).resolve(&frames).unwrap().id, frames[2].id);
    }

    #[test]
    fn test_unknown_selection_resolves_to_none() {
        let frames = sample();
        let selection = Selection {
            model: Some("Galaxy".to_string()),
            ..Selection::default()
        };
        assert!(selection.resolve(&frames).is_none());
    }
}
