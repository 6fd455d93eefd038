//! Priority lane ranking.
//!
//! Picks the top-N items across every bucket by precomputed engagement
//! score. The sort is stable: equal scores keep their input order.

use std::cmp::Ordering;

use crate::types::ResearchItem;

/// Lane size used by the terminal UI.
pub const DEFAULT_LANE_SIZE: usize = 8;

/// Top `n` items by descending engagement score (missing score = 0).
pub fn rank_by_engagement(items: &[ResearchItem], n: usize) -> Vec<&ResearchItem> {
    let mut ranked: Vec<&ResearchItem> = items.iter().collect();
    // `sort_by` is stable; partial_cmp also treats -0.0 == 0.0.
    ranked.sort_by(|a, b| {
        b.engagement()
            .partial_cmp(&a.engagement())
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, Copy)]
pub struct PriorityRanker {
    lane_size: usize,
}

impl Default for PriorityRanker {
    fn default() -> Self {
        Self { lane_size: DEFAULT_LANE_SIZE }
    }
}

impl PriorityRanker {
    pub fn new(lane_size: usize) -> Self {
        Self { lane_size }
    }

    pub fn rank<'a>(&self, items: &'a [ResearchItem]) -> Vec<&'a ResearchItem> {
        rank_by_engagement(items, self.lane_size)
    }
}
