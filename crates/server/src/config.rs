//! Shaping configuration: token budgets and pagination bounds.
//!
//! Loads settings from a `tokenfit.toml` file with the precedence
//! environment variables > config file > built-in defaults.
//!
//! ## Configuration File Format
//!
//! ```toml
//! # tokenfit.toml
//!
//! # Estimated-token count that triggers summarization
//! output_token_threshold = 4000
//!
//! # Estimated-token count a response must never exceed
//! hard_cap = 12000
//!
//! # Pagination bounds
//! default_page_size = 50
//! max_page_size = 100
//!
//! # HMAC key for pagination cursors
//! cursor_secret = "change-me"
//!
//! # Per-endpoint overrides, keyed by request path
//! [endpoints."/financial/transactions"]
//! output_token_threshold = 2000
//! hard_cap = 5000
//! ```
//!
//! Hot reload replaces the whole config snapshot atomically; readers
//! never observe a half-updated configuration.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenfit_estimate::TokenBudget;

const DEFAULT_SOFT_THRESHOLD: usize = 4000;
const DEFAULT_HARD_CAP: usize = 12_000;
const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Top-level shaping configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapeConfig {
    /// Soft threshold in estimated tokens; responses above it are
    /// summarization candidates.
    #[serde(default = "default_soft_threshold")]
    pub output_token_threshold: usize,
    /// Hard cap in estimated tokens; never exceeded.
    #[serde(default = "default_hard_cap")]
    pub hard_cap: usize,
    /// Page size used when a request supplies no `limit`.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Upper bound for any requested `limit`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// HMAC key for pagination cursors.
    #[serde(default)]
    pub cursor_secret: String,
    /// Per-endpoint overrides, keyed by request path.
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointOverride>,
}

/// Partial override of the global limits for one endpoint path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointOverride {
    /// Endpoint-specific soft threshold.
    pub output_token_threshold: Option<usize>,
    /// Endpoint-specific hard cap.
    pub hard_cap: Option<usize>,
    /// Endpoint-specific default page size.
    pub default_page_size: Option<usize>,
    /// Endpoint-specific maximum page size.
    pub max_page_size: Option<usize>,
}

fn default_soft_threshold() -> usize {
    DEFAULT_SOFT_THRESHOLD
}
fn default_hard_cap() -> usize {
    DEFAULT_HARD_CAP
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    DEFAULT_MAX_PAGE_SIZE
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            output_token_threshold: DEFAULT_SOFT_THRESHOLD,
            hard_cap: DEFAULT_HARD_CAP,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            cursor_secret: String::new(),
            endpoints: HashMap::new(),
        }
    }
}

impl ShapeConfig {
    /// Load configuration from an optional file, then apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let config: ShapeConfig = toml::from_str(&content)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                tracing::debug!(
                    target: "tokenfit::config",
                    path = %path.display(),
                    "loaded configuration file"
                );
                config
            }
            _ => ShapeConfig::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `TOKENFIT_*` environment variables on top of file values.
    fn apply_env(&mut self) {
        fn env_usize(key: &str) -> Option<usize> {
            std::env::var(key).ok().and_then(|v| v.parse().ok())
        }
        if let Some(v) = env_usize("TOKENFIT_OUTPUT_TOKEN_THRESHOLD") {
            self.output_token_threshold = v;
        }
        if let Some(v) = env_usize("TOKENFIT_HARD_CAP") {
            self.hard_cap = v;
        }
        if let Some(v) = env_usize("TOKENFIT_DEFAULT_PAGE_SIZE") {
            self.default_page_size = v;
        }
        if let Some(v) = env_usize("TOKENFIT_MAX_PAGE_SIZE") {
            self.max_page_size = v;
        }
        if let Ok(secret) = std::env::var("TOKENFIT_CURSOR_SECRET") {
            self.cursor_secret = secret;
        }
    }

    /// Check the cross-field invariants, including merged endpoint
    /// overrides.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.cursor_secret.is_empty(), "cursor_secret must be set");
        self.budget_for("/")
            .validate()
            .context("global token budget")?;
        anyhow::ensure!(
            (1..=self.max_page_size).contains(&self.default_page_size),
            "default_page_size {} must be within [1, max_page_size {}]",
            self.default_page_size,
            self.max_page_size
        );
        for path in self.endpoints.keys() {
            self.budget_for(path)
                .validate()
                .with_context(|| format!("token budget for endpoint {path}"))?;
            let (default, max) = self.page_bounds_for(path);
            anyhow::ensure!(
                (1..=max).contains(&default),
                "page sizes for endpoint {path} must satisfy 1 <= default <= max"
            );
        }
        Ok(())
    }

    /// Effective token budget for a request path.
    pub fn budget_for(&self, path: &str) -> TokenBudget {
        let over = self.endpoints.get(path);
        TokenBudget {
            soft_threshold: over
                .and_then(|o| o.output_token_threshold)
                .unwrap_or(self.output_token_threshold),
            hard_cap: over.and_then(|o| o.hard_cap).unwrap_or(self.hard_cap),
        }
    }

    /// Effective `(default, max)` page sizes for a request path.
    pub fn page_bounds_for(&self, path: &str) -> (usize, usize) {
        let over = self.endpoints.get(path);
        (
            over.and_then(|o| o.default_page_size)
                .unwrap_or(self.default_page_size),
            over.and_then(|o| o.max_page_size)
                .unwrap_or(self.max_page_size),
        )
    }
}

/// Shared handle to the current configuration snapshot.
///
/// Readers take a cheap `Arc` clone of the whole config; reload builds a
/// fresh snapshot and swaps the pointer, so an in-flight request keeps
/// the snapshot it started with.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<ShapeConfig>>>,
    path: Option<PathBuf>,
}

impl ConfigHandle {
    /// Wrap an already-loaded config; `path` enables [`reload`](Self::reload).
    pub fn new(config: ShapeConfig, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
            path,
        }
    }

    /// Load from `path` (plus env) and wrap the result.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config = ShapeConfig::load(path.as_deref())?;
        Ok(Self::new(config, path))
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<ShapeConfig> {
        Arc::clone(&self.inner.read())
    }

    /// Re-read the config source and atomically swap the snapshot.
    ///
    /// On any load or validation error the previous snapshot stays in
    /// place.
    pub fn reload(&self) -> Result<()> {
        let fresh = ShapeConfig::load(self.path.as_deref())?;
        *self.inner.write() = Arc::new(fresh);
        tracing::info!(target: "tokenfit::config", "configuration reloaded");
        Ok(())
    }

    /// Swap in an explicit snapshot (tests, embedded callers).
    pub fn swap(&self, config: ShapeConfig) {
        *self.inner.write() = Arc::new(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ShapeConfig {
        ShapeConfig {
            cursor_secret: "test-secret".to_string(),
            ..ShapeConfig::default()
        }
    }

    #[test]
    fn defaults_are_consistent() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn missing_secret_fails_validation() {
        let config = ShapeConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_full_config_with_endpoint_override() {
        let toml = r#"
            output_token_threshold = 2000
            hard_cap = 8000
            default_page_size = 25
            max_page_size = 75
            cursor_secret = "s"

            [endpoints."/financial/transactions"]
            output_token_threshold = 1000
            hard_cap = 5000
        "#;
        let config: ShapeConfig = toml::from_str(toml).expect("parse");
        assert!(config.validate().is_ok());

        let global = config.budget_for("/bookings");
        assert_eq!(global.soft_threshold, 2000);
        assert_eq!(global.hard_cap, 8000);

        let overridden = config.budget_for("/financial/transactions");
        assert_eq!(overridden.soft_threshold, 1000);
        assert_eq!(overridden.hard_cap, 5000);

        assert_eq!(config.page_bounds_for("/bookings"), (25, 75));
    }

    #[test]
    fn inverted_endpoint_budget_fails_validation() {
        let mut config = base_config();
        config.endpoints.insert(
            "/bookings".to_string(),
            EndpointOverride {
                output_token_threshold: Some(20_000),
                ..EndpointOverride::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn handle_swap_is_atomic_snapshot_replacement() {
        let handle = ConfigHandle::new(base_config(), None);
        let before = handle.current();
        assert_eq!(before.hard_cap, 12_000);

        let mut next = base_config();
        next.hard_cap = 9000;
        next.output_token_threshold = 3000;
        handle.swap(next);

        // The old snapshot is unchanged; new readers see the new one.
        assert_eq!(before.hard_cap, 12_000);
        assert_eq!(handle.current().hard_cap, 9000);
    }

    #[test]
    fn reload_from_file_picks_up_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tokenfit.toml");
        std::fs::write(&path, "cursor_secret = \"s\"\nhard_cap = 6000\n").expect("write");

        let handle = ConfigHandle::load(Some(path.clone())).expect("load");
        assert_eq!(handle.current().hard_cap, 6000);

        std::fs::write(&path, "cursor_secret = \"s\"\nhard_cap = 7000\n").expect("write");
        handle.reload().expect("reload");
        assert_eq!(handle.current().hard_cap, 7000);
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tokenfit.toml");
        std::fs::write(&path, "cursor_secret = \"s\"\nhard_cap = 6000\n").expect("write");

        let handle = ConfigHandle::load(Some(path.clone())).expect("load");
        std::fs::write(&path, "hard_cap = \"not a number\"\n").expect("write");
        assert!(handle.reload().is_err());
        assert_eq!(handle.current().hard_cap, 6000);
    }
}
