// Line parsing and nested record reconstruction
//
// Fields are comma-separated and never quoted. A comma inside a value is
// indistinguishable from a delimiter.

use std::collections::BTreeMap;
use tracing::warn;

use super::models::{HeaderPath, NestedRecord, NestedValue};

/// Split one line on `,` and trim every token
pub fn parse_line(line: &str) -> Vec<String> {
    line.split(',').map(|token| token.trim().to_string()).collect()
}

/// Decode a raw line as read from disk and trim surrounding whitespace, line
/// terminator included.
///
/// Lines that are not valid UTF-8 yield `None` so the caller can skip them.
/// A line holding only whitespace, Unicode spaces included, decodes to `""`.
pub fn decode_line(raw: &[u8]) -> Option<&str> {
    match std::str::from_utf8(raw) {
        Ok(line) => Some(line.trim()),
        Err(e) => {
            warn!(error = %e, bytes = raw.len(), "Line is not valid UTF-8, ignoring it");
            None
        },
    }
}

/// Interpret header tokens as dot-separated paths
pub fn parse_header(fields: &[String]) -> Vec<HeaderPath> {
    fields.iter().map(|f| HeaderPath::parse(f)).collect()
}

/// Rebuild the nested shape of a row from its header paths.
///
/// Missing values and empty tokens become `Null`; surplus values are ignored.
/// When two paths collide the later column wins, whether it assigns a scalar
/// over a group or nests under a key that previously held a scalar.
pub fn build_record(headers: &[HeaderPath], values: &[String]) -> NestedRecord {
    let mut record = NestedRecord::new();

    for (index, header) in headers.iter().enumerate() {
        let value = match values.get(index).map(String::as_str) {
            None | Some("") => NestedValue::Null,
            Some(v) => NestedValue::Scalar(v.to_string()),
        };
        insert_path(record.fields_mut(), header.segments(), value);
    }

    record
}

fn insert_path(root: &mut BTreeMap<String, NestedValue>, segments: &[String], value: NestedValue) {
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let node = current
            .entry(segment.clone())
            .or_insert_with(|| NestedValue::Map(BTreeMap::new()));
        if !matches!(node, NestedValue::Map(_)) {
            *node = NestedValue::Map(BTreeMap::new());
        }
        let NestedValue::Map(children) = node else {
            return;
        };
        current = children;
    }

    current.insert(leaf.clone(), value);
}
