//! Upstream data access seam.
//!
//! Route handlers fetch through [`DataSource`] so the shaping pipeline
//! stays independent of the real property-management API client (HTTP,
//! OAuth, and retry live upstream of this crate). [`InMemorySource`]
//! backs tests and local serving.

use anyhow::Result;
use serde_json::Value;

/// Slice-wise access to the upstream datasets.
///
/// `offset`/`limit` contracts match the pagination service: return up to
/// `limit` items of the stable ordering starting at `offset`. Failures
/// propagate to the caller unretried.
pub trait DataSource: Send + Sync {
    /// Listings slice.
    fn listings(&self, offset: u64, limit: usize) -> Result<Vec<Value>>;
    /// Bookings slice, optionally filtered by status.
    fn bookings(&self, offset: u64, limit: usize, status: Option<&str>) -> Result<Vec<Value>>;
    /// A single booking by id.
    fn booking_by_id(&self, id: u64) -> Result<Option<Value>>;
    /// Financial transactions slice.
    fn transactions(&self, offset: u64, limit: usize) -> Result<Vec<Value>>;
    /// The consolidated financial report.
    fn financial_report(&self) -> Result<Value>;
}

/// Static in-memory datasets.
#[derive(Debug, Default)]
pub struct InMemorySource {
    /// Listing objects in stable order.
    pub listings: Vec<Value>,
    /// Booking objects in stable order.
    pub bookings: Vec<Value>,
    /// Transaction objects in stable order.
    pub transactions: Vec<Value>,
    /// Report object.
    pub report: Value,
}

fn slice(data: &[Value], offset: u64, limit: usize) -> Vec<Value> {
    let start = (offset as usize).min(data.len());
    let end = start.saturating_add(limit).min(data.len());
    data[start..end].to_vec()
}

impl DataSource for InMemorySource {
    fn listings(&self, offset: u64, limit: usize) -> Result<Vec<Value>> {
        Ok(slice(&self.listings, offset, limit))
    }

    fn bookings(&self, offset: u64, limit: usize, status: Option<&str>) -> Result<Vec<Value>> {
        match status {
            None => Ok(slice(&self.bookings, offset, limit)),
            Some(status) => {
                let filtered: Vec<Value> = self
                    .bookings
                    .iter()
                    .filter(|b| {
                        b.get("status").and_then(Value::as_str) == Some(status)
                    })
                    .cloned()
                    .collect();
                Ok(slice(&filtered, offset, limit))
            }
        }
    }

    fn booking_by_id(&self, id: u64) -> Result<Option<Value>> {
        Ok(self
            .bookings
            .iter()
            .find(|b| b.get("id").and_then(Value::as_u64) == Some(id))
            .cloned())
    }

    fn transactions(&self, offset: u64, limit: usize) -> Result<Vec<Value>> {
        Ok(slice(&self.transactions, offset, limit))
    }

    fn financial_report(&self) -> Result<Value> {
        Ok(self.report.clone())
    }
}
