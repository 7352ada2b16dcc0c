//! Budget-aware payload summarization.
//!
//! [`maybe_summarize`] is the decision point between sending a payload as
//! produced and shrinking it into a preview envelope. Payloads under the
//! soft threshold pass through untouched (identity, not a copy). Over the
//! threshold, the payload is projected down to its type's essential
//! fields; a collection that still exceeds the hard cap is truncated from
//! the tail, then stripped to identifier-only elements. The true original
//! element count is always recorded in the envelope meta so the caller
//! knows what was elided and how to drill down.
//!
//! A preview is never re-summarized: the envelope is built once, and
//! further shrinking happens by truncation inside the same pass.
//!
//! All of this is a pure transformation; no I/O, no shared state.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Serialize;
use serde_json::{Map, Value};
use tokenfit_estimate::{check_token_budget, estimate_tokens_of, TokenBudget};
use tokenfit_project::{count_leaf_fields, project_fields, FieldSetRegistry};

/// Where a caller can fetch full, non-summarized detail.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetailsAvailable {
    /// Endpoint to call, typically a fetch-by-id route.
    pub endpoint: String,
    /// Parameters the endpoint expects.
    pub params: Value,
}

impl DetailsAvailable {
    /// Convenience constructor for an id-parameterized endpoint.
    pub fn by_id(endpoint: &str, id_param: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            params: serde_json::json!({ id_param: "<id>" }),
        }
    }
}

/// Metadata attached to a preview envelope.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryMeta {
    /// Always `"preview"`; lets callers detect a shrunk response.
    pub kind: &'static str,
    /// Leaf-field count of the original object (first element for
    /// collections).
    pub total_fields: usize,
    /// Leaf-field count surviving projection.
    pub projected_fields: usize,
    /// True element count of the original collection, when the payload
    /// was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_count: Option<u64>,
    /// Elements actually present in the summary, when truncation dropped
    /// some.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_count: Option<u64>,
    /// How to fetch full detail for an item in the summary.
    pub details_available: DetailsAvailable,
}

/// A summarized response.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryEnvelope {
    /// The projected (and possibly truncated) payload.
    pub summary: Value,
    /// Preview metadata.
    pub meta: SummaryMeta,
}

/// Outcome of [`maybe_summarize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    /// Payload fits; returned exactly as supplied.
    Full(Value),
    /// Payload was shrunk into a preview envelope.
    Preview(SummaryEnvelope),
}

impl Shaped {
    /// Serialize to the JSON value that goes on the wire.
    pub fn into_value(self) -> Value {
        match self {
            Shaped::Full(value) => value,
            Shaped::Preview(envelope) => {
                serde_json::to_value(&envelope).unwrap_or_else(|_| Value::Null)
            }
        }
    }

    /// Whether this is a preview envelope.
    pub fn is_preview(&self) -> bool {
        matches!(self, Shaped::Preview(_))
    }
}

/// The projection plan applied to a payload.
struct FieldPlan {
    fields: Vec<String>,
    id_field: String,
}

/// Shrink `payload` if it exceeds the budget's soft threshold.
///
/// `type_tag` names the payload type for essential-field lookup; a
/// registry miss falls back to identifier-only projection when an `id`
/// field is discoverable, else the payload passes through unprojected
/// with a warning (the middleware's hard-cap backstop still applies).
pub fn maybe_summarize(
    payload: Value,
    budget: &TokenBudget,
    registry: &FieldSetRegistry,
    type_tag: &str,
    details: DetailsAvailable,
) -> Shaped {
    let check = check_token_budget(&payload, budget.soft_threshold);
    if !check.exceeds {
        return Shaped::Full(payload);
    }
    tracing::debug!(
        target: "tokenfit::summarize",
        type_tag,
        estimated = check.estimated,
        soft_threshold = budget.soft_threshold,
        ratio = check.ratio,
        "payload over soft threshold; summarizing"
    );

    let plan = match registry.get(type_tag) {
        Some(set) => FieldPlan {
            fields: set.fields.clone(),
            id_field: set.id_field.clone(),
        },
        None if has_discoverable_id(&payload) => {
            tracing::warn!(
                target: "tokenfit::summarize",
                type_tag,
                "no essential-field set registered; projecting identifier only"
            );
            FieldPlan {
                fields: vec!["id".to_string()],
                id_field: "id".to_string(),
            }
        }
        None => {
            tracing::warn!(
                target: "tokenfit::summarize",
                type_tag,
                "no essential-field set and no identifier; passing payload through unprojected"
            );
            return Shaped::Full(payload);
        }
    };

    match payload {
        Value::Array(items) => summarize_collection(items, None, &plan, budget, details),
        Value::Object(mut map) => {
            // Paginated envelopes carry their collection under `items`;
            // shape the elements and keep the rest of the wrapper.
            match map.remove("items") {
                Some(Value::Array(items)) => {
                    summarize_collection(items, Some(map), &plan, budget, details)
                }
                Some(other) => {
                    map.insert("items".to_string(), other);
                    summarize_object(map, &plan, budget, details)
                }
                None => summarize_object(map, &plan, budget, details),
            }
        }
        other => {
            // Scalars have no fields to project; leave enforcement to the
            // hard-cap backstop.
            tracing::warn!(
                target: "tokenfit::summarize",
                type_tag,
                "oversized scalar payload cannot be projected"
            );
            Shaped::Full(other)
        }
    }
}

fn summarize_object(
    source: Map<String, Value>,
    plan: &FieldPlan,
    budget: &TokenBudget,
    details: DetailsAvailable,
) -> Shaped {
    let total_fields = count_leaf_fields(&source);
    let mut projected = project_fields(&source, &plan.fields);
    let mut projected_fields = count_leaf_fields(&projected);

    let mut envelope = SummaryEnvelope {
        summary: Value::Object(projected),
        meta: SummaryMeta {
            kind: "preview",
            total_fields,
            projected_fields,
            original_count: None,
            returned_count: None,
            details_available: details,
        },
    };

    if estimate_tokens_of(&envelope) > budget.hard_cap {
        projected = project_fields(&source, &[plan.id_field.as_str()]);
        projected_fields = count_leaf_fields(&projected);
        envelope.summary = Value::Object(projected);
        envelope.meta.projected_fields = projected_fields;
    }
    if estimate_tokens_of(&envelope) > budget.hard_cap {
        // Even the identifier alone does not fit; emit a sparse envelope.
        tracing::warn!(
            target: "tokenfit::summarize",
            hard_cap = budget.hard_cap,
            "identifier-only projection exceeds hard cap; emitting empty summary"
        );
        envelope.summary = Value::Object(Map::new());
        envelope.meta.projected_fields = 0;
    }

    Shaped::Preview(envelope)
}

fn summarize_collection(
    items: Vec<Value>,
    wrapper: Option<Map<String, Value>>,
    plan: &FieldPlan,
    budget: &TokenBudget,
    details: DetailsAvailable,
) -> Shaped {
    let original_count = items.len() as u64;
    let total_fields = items
        .iter()
        .find_map(Value::as_object)
        .map(count_leaf_fields)
        .unwrap_or(0);

    let projected: Vec<Value> = items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Value::Object(project_fields(&map, &plan.fields)),
            other => other,
        })
        .collect();
    let projected_fields = projected
        .iter()
        .find_map(Value::as_object)
        .map(count_leaf_fields)
        .unwrap_or(0);

    let meta = SummaryMeta {
        kind: "preview",
        total_fields,
        projected_fields,
        original_count: Some(original_count),
        returned_count: None,
        details_available: details,
    };

    if let Some(envelope) = fit_collection(&projected, &wrapper, meta.clone(), budget) {
        return Shaped::Preview(envelope);
    }

    // Not even a single projected element fits; strip to identifiers.
    tracing::debug!(
        target: "tokenfit::summarize",
        hard_cap = budget.hard_cap,
        "projected collection exceeds hard cap; stripping to identifiers"
    );
    let id_only: Vec<Value> = projected
        .iter()
        .map(|item| match item {
            Value::Object(map) => Value::Object(project_fields(map, &[plan.id_field.as_str()])),
            other => other.clone(),
        })
        .collect();
    let mut meta = meta;
    meta.projected_fields = id_only
        .iter()
        .find_map(Value::as_object)
        .map(count_leaf_fields)
        .unwrap_or(0);

    if let Some(envelope) = fit_collection(&id_only, &wrapper, meta.clone(), budget) {
        return Shaped::Preview(envelope);
    }

    tracing::warn!(
        target: "tokenfit::summarize",
        hard_cap = budget.hard_cap,
        "identifier-only collection exceeds hard cap; emitting empty summary"
    );
    meta.projected_fields = 0;
    meta.returned_count = Some(0);
    Shaped::Preview(SummaryEnvelope {
        summary: collection_value(&[], &wrapper),
        meta,
    })
}

/// Find the largest prefix of `items` whose envelope fits the hard cap.
///
/// Envelope size is monotonic in the prefix length, so binary search
/// applies. Returns `None` when not even one element fits.
fn fit_collection(
    items: &[Value],
    wrapper: &Option<Map<String, Value>>,
    mut meta: SummaryMeta,
    budget: &TokenBudget,
) -> Option<SummaryEnvelope> {
    let build = |keep: usize, meta: SummaryMeta| SummaryEnvelope {
        summary: collection_value(&items[..keep], wrapper),
        meta,
    };

    let full = build(items.len(), meta.clone());
    if estimate_tokens_of(&full) <= budget.hard_cap {
        return Some(full);
    }
    if items.is_empty() {
        return None;
    }

    // returned_count is set during the search so the estimate accounts
    // for the meta field itself.
    let fits = |keep: usize| {
        let mut meta = meta.clone();
        meta.returned_count = Some(keep as u64);
        estimate_tokens_of(&build(keep, meta)) <= budget.hard_cap
    };

    if !fits(1) {
        return None;
    }
    let (mut lo, mut hi) = (1usize, items.len());
    while lo + 1 < hi {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    tracing::debug!(
        target: "tokenfit::summarize",
        kept = lo,
        dropped = items.len() - lo,
        "truncated collection to fit hard cap"
    );
    meta.returned_count = Some(lo as u64);
    Some(build(lo, meta))
}

fn collection_value(items: &[Value], wrapper: &Option<Map<String, Value>>) -> Value {
    match wrapper {
        Some(rest) => {
            let mut object = rest.clone();
            object.insert("items".to_string(), Value::Array(items.to_vec()));
            Value::Object(object)
        }
        None => Value::Array(items.to_vec()),
    }
}

fn has_discoverable_id(payload: &Value) -> bool {
    match payload {
        Value::Object(map) => {
            if map.contains_key("id") {
                return true;
            }
            map.get("items")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .is_some_and(has_discoverable_id)
        }
        Value::Array(items) => items.first().is_some_and(has_discoverable_id),
        _ => false,
    }
}

#[cfg(test)]
mod tests;
