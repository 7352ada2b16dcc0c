//! Route handlers and router assembly.
//!
//! Data routes fetch through the [`DataSource`] seam, paginate where the
//! payload is a collection, and declare their payload kind so the shaping
//! layer can summarize them. `/health` and `/metrics` sit outside the
//! shaping layer.

use crate::error::ApiError;
use crate::shape::{shape_response, PayloadKind};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tokenfit_cursor::filter_fingerprint;
use tokenfit_paginate::{build_page_filtered, clamp_limit, PaginatedResponse};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Requested page size; clamped to the endpoint's `[1, max]`.
    pub limit: Option<usize>,
    /// Opaque resume cursor from a previous page.
    pub cursor: Option<String>,
    /// Booking status filter.
    pub status: Option<String>,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let shaped = Router::new()
        .route("/listings", get(list_listings))
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}", get(get_booking))
        .route("/financial/transactions", get(list_transactions))
        .route("/financial/report", get(get_report))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            shape_response,
        ));

    Router::new()
        .merge(shaped)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Shared pagination flow for the list endpoints.
fn paginate(
    state: &AppState,
    path: &str,
    query: &PageQuery,
    filter: Option<String>,
    fetch: impl FnOnce(u64, usize) -> anyhow::Result<Vec<Value>>,
) -> Result<PaginatedResponse<Value>, ApiError> {
    let config = state.config.current();
    let (default_limit, max_limit) = config.page_bounds_for(path);
    let limit = clamp_limit(query.limit, default_limit, max_limit);
    state.metrics.record_list_request(query.cursor.is_some());
    if let Some(cursor) = &query.cursor {
        state.cursors.seen(cursor);
    }

    let page = build_page_filtered(
        fetch,
        limit,
        query.cursor.as_deref(),
        &config.cursor_secret,
        filter.as_deref(),
    )?;
    if let Some(next) = &page.next_cursor {
        state.cursors.record(next);
    }
    Ok(page)
}

fn shaped_json(page: impl serde::Serialize, kind: PayloadKind) -> Response {
    let mut response = Json(page).into_response();
    response.extensions_mut().insert(kind);
    response
}

async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = paginate(&state, "/listings", &query, None, |offset, limit| {
        state.source.listings(offset, limit)
    })?;
    Ok(shaped_json(
        page,
        PayloadKind::new("listing", "/listings/{id}"),
    ))
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    // Cursors are bound to the filter they were issued for; resuming a
    // "confirmed" walk with a "cancelled" filter is a 400, not a silent
    // page of the wrong dataset.
    let filter = query
        .status
        .as_deref()
        .map(|status| filter_fingerprint(&format!("status={status}")));
    let status = query.status.clone();
    let page = paginate(&state, "/bookings", &query, filter, |offset, limit| {
        state.source.bookings(offset, limit, status.as_deref())
    })?;
    Ok(shaped_json(
        page,
        PayloadKind::new("booking", "/bookings/{id}"),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let booking = state
        .source
        .booking_by_id(id)
        .map_err(|e| ApiError::from(tokenfit_paginate::PageError::Fetch(e)))?
        .ok_or_else(|| ApiError::not_found("booking not found"))?;
    Ok(shaped_json(
        booking,
        PayloadKind::new("booking", "/bookings/{id}"),
    ))
}

async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = paginate(
        &state,
        "/financial/transactions",
        &query,
        None,
        |offset, limit| state.source.transactions(offset, limit),
    )?;
    Ok(shaped_json(
        page,
        PayloadKind::new("financial_transaction", "/financial/transactions/{id}"),
    ))
}

async fn get_report(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state
        .source
        .financial_report()
        .map_err(|e| ApiError::from(tokenfit_paginate::PageError::Fetch(e)))?;
    Ok(shaped_json(
        report,
        PayloadKind::new("financial_report", "/financial/report"),
    ))
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.metrics.snapshot();
    Json(serde_json::json!({
        "shaping": snapshot,
        "cursors": {
            "issued_total": state.cursors.issued_total(),
            "live": state.cursors.live_count(),
            "replays_seen": state.cursors.replays_seen(),
        },
    }))
}
