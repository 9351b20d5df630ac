use serde_json::{Map, Value};

use crate::catalog::frame::{parse_int_prefix, Coordinates};
use crate::error::CatalogError;

/// Top-level key holding the descriptor schema version
const SCHEMA_VERSION_KEY: &str = "version";

/// One level of the descriptor tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Placement data; never descended further
    Leaf(Coordinates),

    /// Named children in descriptor order
    Branch(Vec<(String, Node)>),
}

impl Node {
    /// Classify a JSON value by shape. An object carrying `x`, `y` and `name`
    /// is a leaf even if it also has nested objects.
    pub fn from_value(value: &Value, path: &str) -> Result<Self, CatalogError> {
        let map = value.as_object().ok_or_else(|| CatalogError::Malformed {
            path: path.to_string(),
            reason: format!("expected an object, found {}", json_kind(value)),
        })?;

        if is_coordinates_shape(map) {
            return coordinates_from_map(map, path).map(Node::Leaf);
        }

        let mut children = Vec::with_capacity(map.len());
        for (key, child) in map {
            let child_path = format!("{}/{}", path, key);
            children.push((key.clone(), Node::from_value(child, &child_path)?));
        }
        Ok(Node::Branch(children))
    }
}

/// Raw device-frame description: category name to device subtree
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorTree {
    /// Schema version of the descriptor document, not a device version
    pub schema_version: Option<String>,

    /// Categories in document order
    pub categories: Vec<(String, Node)>,
}

impl DescriptorTree {
    /// Parse the descriptor JSON document
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text).map_err(|e| CatalogError::InvalidJson {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, CatalogError> {
        let root = value.as_object().ok_or_else(|| CatalogError::Malformed {
            path: String::new(),
            reason: format!("descriptor root must be an object, found {}", json_kind(value)),
        })?;

        let mut schema_version = None;
        let mut categories = Vec::with_capacity(root.len());

        for (key, child) in root {
            if key == SCHEMA_VERSION_KEY {
                let version = child.as_str().ok_or_else(|| CatalogError::Malformed {
                    path: key.clone(),
                    reason: "catalog version must be a string".to_string(),
                })?;
                schema_version = Some(version.to_string());
                continue;
            }
            categories.push((key.clone(), Node::from_value(child, key)?));
        }

        Ok(Self {
            schema_version,
            categories,
        })
    }
}

fn is_coordinates_shape(map: &Map<String, Value>) -> bool {
    map.contains_key("x") && map.contains_key("y") && map.contains_key("name")
}

fn coordinates_from_map(map: &Map<String, Value>, path: &str) -> Result<Coordinates, CatalogError> {
    let x = offset_text(map, "x", path)?;
    let y = offset_text(map, "y", path)?;

    let name = match map.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => {
            return Err(CatalogError::Malformed {
                path: path.to_string(),
                reason: "'name' must be a non-empty string".to_string(),
            })
        }
    };

    Ok(Coordinates {
        x,
        y,
        name,
        screenshot_width: map.get("screenshotWidth").and_then(dimension),
        screenshot_height: map.get("screenshotHeight").and_then(dimension),
    })
}

fn offset_text(map: &Map<String, Value>, key: &str, path: &str) -> Result<String, CatalogError> {
    let text = match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        other => {
            return Err(CatalogError::Malformed {
                path: path.to_string(),
                reason: format!(
                    "'{}' must be an integer string, found {}",
                    key,
                    other.map_or("nothing", json_kind)
                ),
            })
        }
    };

    match parse_int_prefix(&text) {
        None => Err(CatalogError::Malformed {
            path: path.to_string(),
            reason: format!("'{}' is not an integer: {:?}", key, text),
        }),
        Some(value) if i32::try_from(value).is_err() => Err(CatalogError::Malformed {
            path: path.to_string(),
            reason: format!("'{}' is out of range: {}", key, value),
        }),
        Some(_) => Ok(text),
    }
}

/// Screenshot dimensions only count when they are whole, non-negative numbers
fn dimension(value: &Value) -> Option<u32> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(n) = number.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = number.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
