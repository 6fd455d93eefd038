//! Capital allocation across the trading bot's strategies.
//!
//! Allocations are percentages of capital keyed by strategy name. They
//! may sum to less than 100 (the remainder stays in cash) but never more.
//! An over-allocated set is a validation condition the caller checks
//! before saving or starting the bot, not a crash.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::FeedError;

/// Tolerance for float noise when summing slider values.
const SUM_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyAllocations(BTreeMap<String, f64>);

impl Default for StrategyAllocations {
    fn default() -> Self {
        Self::from_pairs([("momentum", 25.0), ("mean_reversion", 50.0), ("rsi", 15.0), ("vwap", 10.0)])
    }
}

impl From<BTreeMap<String, f64>> for StrategyAllocations {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl StrategyAllocations {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn get(&self, strategy: &str) -> Option<f64> {
        self.0.get(strategy).copied()
    }

    pub fn set(&mut self, strategy: &str, pct: f64) {
        self.0.insert(strategy.to_string(), pct);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Percentage left unallocated. Negative when over-allocated.
    pub fn unallocated(&self) -> f64 {
        100.0 - self.total()
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        for (name, pct) in &self.0 {
            if !pct.is_finite() || *pct < 0.0 {
                return Err(FeedError::InvalidAllocation(format!(
                    "{name} must be a non-negative percentage, got {pct}"
                )));
            }
        }
        let total = self.total();
        if total > 100.0 + SUM_EPSILON {
            return Err(FeedError::OverAllocated { total });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Result of a validation request, as rendered on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationCheck {
    pub valid: bool,
    pub total: f64,
    pub unallocated: f64,
    pub error: Option<String>,
}

impl From<&StrategyAllocations> for AllocationCheck {
    fn from(a: &StrategyAllocations) -> Self {
        let error = a.validate().err().map(|e| e.to_string());
        Self {
            valid: error.is_none(),
            total: a.total(),
            unallocated: a.unallocated(),
            error,
        }
    }
}
