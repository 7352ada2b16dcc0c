//! Cursor-chained pagination over pluggable fetch functions.
//!
//! [`build_page`] composes the cursor codec with an upstream "fetch a
//! slice" call into the uniform paginated-response contract: decode the
//! inbound cursor (absent means first page), over-fetch by one item to
//! learn whether more data exists, and sign a fresh cursor for the next
//! page when it does. For a stable underlying dataset, chained pages are
//! disjoint and complete: each page is exactly `[offset, offset + limit)`
//! of the total ordering.
//!
//! Fetch failures propagate unchanged; retry policy belongs to the
//! upstream client, not here.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Serialize;
use tokenfit_cursor::{decode_cursor_expecting, encode_cursor_with_filter, CursorError};

/// Envelope metadata accompanying a page of items.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    /// Total items in the underlying dataset, when the caller knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    /// Requested page size (items may be fewer on the last page).
    pub page_size: usize,
    /// Whether another page exists.
    pub has_more: bool,
}

/// A page of results plus the cursor to resume from.
///
/// Invariants: `next_cursor.is_some() == meta.has_more` and
/// `items.len() <= meta.page_size`. Constructed fresh per request and
/// immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    /// The items of this page, in dataset order.
    pub items: Vec<T>,
    /// Opaque cursor for the next page; absent on the final page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Page metadata.
    pub meta: PageMeta,
}

impl<T> PaginatedResponse<T> {
    /// Attach a known total count to the page metadata.
    pub fn with_total_count(mut self, total: u64) -> Self {
        self.meta.total_count = Some(total);
        self
    }
}

/// Why a page could not be built.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The inbound cursor failed validation; a 400-class client error.
    #[error(transparent)]
    Cursor(#[from] CursorError),
    /// The upstream fetch collaborator failed; propagated, not retried.
    #[error("upstream fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),
}

/// Build one page of results.
///
/// `fetch(offset, n)` must return up to `n` items of the dataset starting
/// at `offset`. It is called with `limit + 1`: the extra item only
/// signals `has_more` and never appears in the page, avoiding a separate
/// count query.
pub fn build_page<T, F>(
    fetch: F,
    limit: usize,
    cursor: Option<&str>,
    secret: &str,
) -> Result<PaginatedResponse<T>, PageError>
where
    F: FnOnce(u64, usize) -> anyhow::Result<Vec<T>>,
{
    build_page_filtered(fetch, limit, cursor, secret, None)
}

/// Build one page, binding issued cursors to a filter fingerprint.
///
/// When `filter` is supplied, the next-page cursor embeds it and an
/// inbound cursor issued for different filters is rejected with
/// [`CursorError::FilterMismatch`] rather than silently returning a page
/// of the wrong dataset.
pub fn build_page_filtered<T, F>(
    fetch: F,
    limit: usize,
    cursor: Option<&str>,
    secret: &str,
    filter: Option<&str>,
) -> Result<PaginatedResponse<T>, PageError>
where
    F: FnOnce(u64, usize) -> anyhow::Result<Vec<T>>,
{
    let offset = match cursor {
        Some(cursor) => decode_cursor_expecting(cursor, secret, filter)?.offset,
        None => 0,
    };

    let mut items = fetch(offset, limit + 1).map_err(PageError::Fetch)?;
    let has_more = items.len() > limit;
    if has_more {
        items.truncate(limit);
    }

    let next_cursor = has_more.then(|| {
        let next = encode_cursor_with_filter(offset + limit as u64, secret, filter);
        tracing::debug!(
            target: "tokenfit::paginate",
            offset,
            limit,
            "issued next-page cursor"
        );
        next
    });

    Ok(PaginatedResponse {
        items,
        next_cursor,
        meta: PageMeta {
            total_count: None,
            page_size: limit,
            has_more,
        },
    })
}

/// Clamp a requested page size into `[1, max]`, defaulting when absent.
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}
