//! Response-shaping HTTP layer.
//!
//! Assembles the context-window protection pipeline around an axum
//! router: route handlers fetch upstream data and paginate it behind
//! signed cursors, then every outgoing response passes through the
//! shaping middleware, which estimates token cost, summarizes over the
//! soft threshold, and enforces the hard cap.
//!
//! The crate-level pieces:
//! - [`config`]: token budgets and pagination bounds, hot-reloadable.
//! - [`metrics`]: aggregate shaping counters for `/metrics`.
//! - [`shape`]: the response-shaping middleware itself.
//! - [`routes`]: handlers and router assembly.
//! - [`source`]: the upstream data access seam.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Shaping configuration and the hot-reload handle.
pub mod config;
/// HTTP error mapping.
pub mod error;
/// Aggregate shaping metrics.
pub mod metrics;
/// Route handlers and router assembly.
pub mod routes;
/// The response-shaping middleware.
pub mod shape;
/// Upstream data access seam.
pub mod source;

pub use config::{ConfigHandle, ShapeConfig};
pub use metrics::{MetricsSnapshot, ShapeMetrics};
pub use routes::router;
pub use shape::PayloadKind;
pub use source::{DataSource, InMemorySource};

use std::sync::Arc;
use tokenfit_cursor::CursorStore;
use tokenfit_project::FieldSetRegistry;

/// Shared per-process state handed to every handler and the middleware.
#[derive(Clone)]
pub struct AppState {
    /// Current configuration snapshot handle.
    pub config: ConfigHandle,
    /// Shaping counters.
    pub metrics: Arc<ShapeMetrics>,
    /// Essential-field sets by payload type tag.
    pub registry: Arc<FieldSetRegistry>,
    /// Cursor issuance telemetry.
    pub cursors: Arc<CursorStore>,
    /// Upstream data access.
    pub source: Arc<dyn DataSource>,
}

impl AppState {
    /// Build state with the default field-set registry and fresh metrics.
    pub fn new(config: ConfigHandle, source: Arc<dyn DataSource>) -> Self {
        Self {
            config,
            metrics: ShapeMetrics::new(),
            registry: Arc::new(FieldSetRegistry::with_defaults()),
            cursors: Arc::new(CursorStore::default()),
            source,
        }
    }
}

/// Install the fmt tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tokenfit=info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
