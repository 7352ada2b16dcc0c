//! Token-cost estimation for outgoing JSON payloads.
//!
//! Uses a character-based heuristic (~4 characters per token) over the
//! compact JSON serialization, inflated by a 1.20x safety margin. The
//! heuristic trades precision for speed: no tokenizer dependency, and it
//! deliberately over-estimates so that a hard token cap enforced against
//! these numbers holds even when the caller's real tokenizer disagrees.
//!
//! All functions here are pure and allocation-light; estimating a payload
//! in the tens of kilobytes is sub-millisecond.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Approximate characters per token for GPT-style tokenizers.
const CHARS_PER_TOKEN: f64 = 4.0;

/// Multiplier applied on top of the char/4 estimate so we err high.
const SAFETY_MARGIN: f64 = 1.20;

/// Size limits for a response in estimated-token units.
///
/// The soft threshold marks a response as a summarization candidate; the
/// hard cap is the invariant the shaping pipeline must never violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Estimated-token count above which a response should be summarized.
    pub soft_threshold: usize,
    /// Estimated-token count a response must never exceed.
    pub hard_cap: usize,
}

impl TokenBudget {
    /// Create a budget, checking that the soft threshold sits below the cap.
    pub fn new(soft_threshold: usize, hard_cap: usize) -> Result<Self, BudgetError> {
        let budget = Self {
            soft_threshold,
            hard_cap,
        };
        budget.validate()?;
        Ok(budget)
    }

    /// Validate the `soft_threshold < hard_cap` invariant.
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.soft_threshold >= self.hard_cap {
            return Err(BudgetError::Inverted {
                soft_threshold: self.soft_threshold,
                hard_cap: self.hard_cap,
            });
        }
        Ok(())
    }
}

/// Error raised for an inconsistent [`TokenBudget`].
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// The soft threshold must be strictly below the hard cap.
    #[error("soft threshold {soft_threshold} must be below hard cap {hard_cap}")]
    Inverted {
        /// Configured soft threshold.
        soft_threshold: usize,
        /// Configured hard cap.
        hard_cap: usize,
    },
}

/// Outcome of weighing a payload against a token threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetCheck {
    /// Estimated token cost of the payload.
    pub estimated: usize,
    /// Whether the estimate exceeds the threshold.
    pub exceeds: bool,
    /// `estimated / threshold`; infinite for a zero threshold.
    pub ratio: f64,
}

/// Estimate the token cost of an arbitrary JSON value.
///
/// Serializes compactly (no whitespace) and applies the char/4 heuristic
/// with the safety margin, rounding up. Any `Value` serializes, so this
/// never fails.
pub fn estimate_tokens(value: &Value) -> usize {
    estimate_from_chars(value.to_string().len())
}

/// Estimate the combined token cost of a list of JSON values.
///
/// Equivalent to estimating the serialized array.
pub fn estimate_tokens_from_list(items: &[Value]) -> usize {
    estimate_tokens(&Value::Array(items.to_vec()))
}

/// Estimate the token cost of a JSON object.
pub fn estimate_tokens_from_object(object: &Map<String, Value>) -> usize {
    estimate_tokens(&Value::Object(object.clone()))
}

/// Weigh a payload against a threshold.
///
/// Used by the shaping middleware to decide whether to invoke
/// summarization; `exceeds` is strict (`estimated > threshold`).
pub fn check_token_budget(value: &Value, threshold: usize) -> BudgetCheck {
    let estimated = estimate_tokens(value);
    let ratio = if threshold == 0 {
        f64::INFINITY
    } else {
        estimated as f64 / threshold as f64
    };
    BudgetCheck {
        estimated,
        exceeds: estimated > threshold,
        ratio,
    }
}

/// Estimate the token cost of any serializable value.
///
/// A value that fails to serialize is reported as infinitely large so
/// that budget enforcement degrades it rather than letting it through.
pub fn estimate_tokens_of<T: Serialize>(value: &T) -> usize {
    match serde_json::to_string(value) {
        Ok(serialized) => estimate_from_chars(serialized.len()),
        Err(_) => usize::MAX,
    }
}

/// Apply the heuristic to a raw character count.
pub fn estimate_from_chars(chars: usize) -> usize {
    ((chars as f64 / CHARS_PER_TOKEN) * SAFETY_MARGIN).ceil() as usize
}
