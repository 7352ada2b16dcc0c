//! Response-shaping middleware.
//!
//! Post-processes every 2xx JSON response on budget-sensitive routes:
//! estimate the token cost, summarize when the soft threshold is crossed,
//! and enforce the hard cap unconditionally. This layer is the sole
//! enforcement point for the cap and must never itself fail a request:
//! when summarization cannot bring a payload under the cap (missing
//! field-set registration, absurdly low cap), the payload is truncated
//! raw and flagged instead of erroring.
//!
//! Error responses (non-2xx) from the handler pass through untouched.

use crate::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::{json, Value};
use std::time::Instant;
use tokenfit_estimate::{check_token_budget, estimate_tokens};
use tokenfit_summarize::{maybe_summarize, DetailsAvailable};

/// Declares what payload type a route produces.
///
/// Handlers insert this as a response extension; the middleware uses it
/// for essential-field lookup and for the drill-down pointer in preview
/// envelopes. Routes without it pass through unshaped.
#[derive(Debug, Clone)]
pub struct PayloadKind {
    /// Type tag for field-set registry lookup.
    pub type_tag: &'static str,
    /// Drill-down pointer embedded in preview envelopes.
    pub details: DetailsAvailable,
}

impl PayloadKind {
    /// Declare a payload kind with an id-parameterized detail endpoint.
    pub fn new(type_tag: &'static str, detail_endpoint: &str) -> Self {
        Self {
            type_tag,
            details: DetailsAvailable::by_id(detail_endpoint, "id"),
        }
    }
}

/// The shaping layer. Apply with `middleware::from_fn_with_state`.
pub async fn shape_response(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;

    // Errors bypass shaping entirely.
    if !response.status().is_success() {
        record_unbuffered(&state, &response, started);
        return response;
    }
    let Some(kind) = response.extensions().get::<PayloadKind>().cloned() else {
        record_unbuffered(&state, &response, started);
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            // The handler's body stream broke mid-flight; nothing left to
            // shape or salvage.
            tracing::warn!(
                target: "tokenfit::shape",
                path,
                error = %error,
                "failed to buffer response body"
            );
            return Response::from_parts(parts, Body::empty());
        }
    };
    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(_) => {
            // Not JSON; this layer only shapes JSON payloads.
            state.metrics.record_request(started.elapsed(), bytes.len());
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    let config = state.config.current();
    let budget = config.budget_for(&path);
    let check = check_token_budget(&payload, budget.soft_threshold);

    let shaped = if check.exceeds {
        let shaped = maybe_summarize(
            payload,
            &budget,
            &state.registry,
            kind.type_tag,
            kind.details.clone(),
        );
        if shaped.is_preview() {
            state.metrics.record_summarized();
        }
        let mut value = shaped.into_value();

        // Hard-cap backstop: summarization can decline (unregistered
        // type, unprojectable scalar) or bottom out above a tiny cap.
        let final_estimate = estimate_tokens(&value);
        if final_estimate > budget.hard_cap {
            tracing::warn!(
                target: "tokenfit::shape",
                path,
                type_tag = kind.type_tag,
                estimated = final_estimate,
                hard_cap = budget.hard_cap,
                "summarized payload still over hard cap; truncating raw"
            );
            state.metrics.record_oversized();
            value = truncate_raw(&value, budget.hard_cap);
        }
        value
    } else {
        payload
    };

    let body = shaped.to_string().into_bytes();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    state.metrics.record_request(started.elapsed(), body.len());
    Response::from_parts(parts, Body::from(body))
}

/// Raw character truncation, the last-resort cap enforcement.
///
/// Keeps a prefix of the serialized payload sized so that the flagged
/// wrapper, including JSON string escaping of the prefix, stays under the
/// cap even in the worst case.
fn truncate_raw(value: &Value, hard_cap: usize) -> Value {
    let serialized = value.to_string();
    // Invert the estimator: hard_cap tokens ~= hard_cap * 4 / 1.2 chars.
    let max_chars = (hard_cap as f64 * 4.0 / 1.2) as usize;
    // Escaping can double a pathological prefix; budget half, minus the
    // wrapper skeleton.
    let keep = max_chars.saturating_sub(120) / 2;
    let prefix: String = serialized.chars().take(keep).collect();
    json!({
        "truncated": true,
        "detail": "response truncated to fit token budget",
        "payload_prefix": prefix,
    })
}

fn record_unbuffered(state: &AppState, response: &Response, started: Instant) {
    let bytes = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    state.metrics.record_request(started.elapsed(), bytes);
}
