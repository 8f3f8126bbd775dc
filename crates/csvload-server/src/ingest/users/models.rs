// Users ingestion data models

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A dot-separated column name split into its segments (`address.city` -> `["address", "city"]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPath {
    segments: Vec<String>,
}

impl HeaderPath {
    /// Split a raw header token on `.`; a token without dots is a single segment
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw.split('.').map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl std::fmt::Display for HeaderPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Node of a reconstructed row: empty cell, text cell, or a group of nested columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedValue {
    Null,
    Scalar(String),
    Map(BTreeMap<String, NestedValue>),
}

impl NestedValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            NestedValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, NestedValue>> {
        match self {
            NestedValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Nesting depth below this node; scalars and nulls are depth 0
    pub fn depth(&self) -> usize {
        match self {
            NestedValue::Map(m) => 1 + m.values().map(NestedValue::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Copy with whitespace trimmed from scalars and every empty leaf removed.
    ///
    /// Returns `None` when nothing non-empty remains.
    pub fn pruned(&self) -> Option<NestedValue> {
        match self {
            NestedValue::Null => None,
            NestedValue::Scalar(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| NestedValue::Scalar(trimmed.to_string()))
            },
            NestedValue::Map(m) => {
                let kept: BTreeMap<String, NestedValue> = m
                    .iter()
                    .filter_map(|(k, v)| v.pruned().map(|v| (k.clone(), v)))
                    .collect();
                (!kept.is_empty()).then_some(NestedValue::Map(kept))
            },
        }
    }
}

impl From<&NestedValue> for Value {
    fn from(value: &NestedValue) -> Self {
        match value {
            NestedValue::Null => Value::Null,
            NestedValue::Scalar(s) => Value::String(s.clone()),
            NestedValue::Map(m) => {
                Value::Object(m.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
            },
        }
    }
}

/// One input row rebuilt as a tree keyed by the first header segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedRecord {
    fields: BTreeMap<String, NestedValue>,
}

impl NestedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fields_mut(&mut self) -> &mut BTreeMap<String, NestedValue> {
        &mut self.fields
    }

    pub fn fields(&self) -> &BTreeMap<String, NestedValue> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&NestedValue> {
        self.fields.get(key)
    }

    /// Look up a value by path segments, e.g. `["name", "firstName"]`
    pub fn get_path(&self, path: &[&str]) -> Option<&NestedValue> {
        let (first, rest) = path.split_first()?;
        let mut current = self.fields.get(*first)?;
        for segment in rest {
            current = current.as_map()?.get(*segment)?;
        }
        Some(current)
    }

    /// Scalar at `path`, trimmed; `None` for missing, null, nested or blank values
    pub fn scalar_at(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path)
            .and_then(NestedValue::as_scalar)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.fields.values().map(|v| 1 + v.depth()).max().unwrap_or(0)
    }
}

/// Fixed-shape row persisted to the `users` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// "first last", never empty
    pub name: String,
    pub age: i32,
    /// Known address parts (`line1`, `line2`, `city`, `state`) that carried a value
    pub address: Option<BTreeMap<String, String>>,
    /// Residual columns that carried a value
    pub additional_info: Option<BTreeMap<String, NestedValue>>,
}

impl UserRecord {
    /// `address` as the JSON document stored in the `address` column
    pub fn address_json(&self) -> Option<Value> {
        self.address.as_ref().map(|address| {
            Value::Object(
                address
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            )
        })
    }

    /// `additional_info` as the JSON document stored in the `additional_info` column
    pub fn additional_info_json(&self) -> Option<Value> {
        self.additional_info.as_ref().map(|info| {
            Value::Object(info.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
        })
    }
}
