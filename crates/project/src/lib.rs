//! Field projection: reducing an object to its declared essential fields.
//!
//! This crate provides the mechanism behind "preview" responses. Each
//! payload type registers an [`EssentialFieldSet`] naming the fields that
//! survive projection (always including an identifier so the caller can
//! fetch full details). [`project_fields`] then produces a reduced copy of
//! an object, resolving dotted paths for nested access.
//!
//! Projection is pure: the source object is never mutated, and missing
//! paths are silently omitted rather than treated as errors.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Per-type essential-field declarations.
pub mod registry;

pub use registry::{EssentialFieldSet, FieldSetRegistry};

use serde_json::{Map, Value};

/// Project an object down to the given field paths.
///
/// Each path is resolved independently against `source`. A dotted path
/// such as `guest.address.city` descends through nested objects and
/// re-creates the minimal nesting needed to hold the leaf value in the
/// output. Paths that do not resolve are omitted.
///
/// An empty `fields` slice yields an empty map; that effectively filters
/// everything, which is a caller error if they expected data.
pub fn project_fields<S: AsRef<str>>(source: &Map<String, Value>, fields: &[S]) -> Map<String, Value> {
    let mut projected = Map::new();
    for path in fields {
        let path = path.as_ref();
        if let Some(value) = resolve_path(source, path) {
            insert_path(&mut projected, path, value.clone());
        }
    }
    projected
}

/// A projection along with its telemetry ratio.
#[derive(Debug, Clone)]
pub struct Projection {
    /// The reduced object.
    pub fields: Map<String, Value>,
    /// `1 - projected_leaves / total_leaves`; 0.0 for an empty source.
    pub reduction_ratio: f64,
}

/// Project an object and compute the reduction ratio.
///
/// The ratio counts leaf fields (nested objects contribute their leaves,
/// not themselves) and exists for observability only; correctness never
/// depends on it.
pub fn project_with_ratio<S: AsRef<str>>(source: &Map<String, Value>, fields: &[S]) -> Projection {
    let projected = project_fields(source, fields);
    let total = count_leaf_fields(source);
    let kept = count_leaf_fields(&projected);
    let reduction_ratio = if total == 0 {
        0.0
    } else {
        1.0 - kept as f64 / total as f64
    };
    Projection {
        fields: projected,
        reduction_ratio,
    }
}

/// Count leaf fields in an object, descending into nested objects.
pub fn count_leaf_fields(object: &Map<String, Value>) -> usize {
    object
        .values()
        .map(|v| match v {
            Value::Object(nested) => count_leaf_fields(nested).max(1),
            _ => 1,
        })
        .sum()
}

/// Resolve a dotted path against an object, returning the leaf value.
fn resolve_path<'a>(source: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = source.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Insert a value at a dotted path, creating intermediate objects.
fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = slot {
                insert_path(nested, rest, value);
            }
        }
    }
}
