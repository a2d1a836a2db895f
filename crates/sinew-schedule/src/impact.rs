//! Delay impact simulation.
//!
//! Answers "what happens if this item slips by N units": the forward pass
//! is re-run with the item's duration increased, and the result reports the
//! project-completion delta plus every item whose earliest start shifts.
//! Items with enough float absorb the delay; critical-path items propagate
//! it one-for-one into the completion time.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::build::{ScheduleError, ScheduleGraph};
use crate::critical_path::forward_pass;

/// Result of simulating a delay on one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactResult {
    /// The delayed item.
    pub item: String,
    /// The simulated delay in duration units.
    pub delay: u64,
    /// Project completion time without the delay.
    pub baseline_completion: u64,
    /// Project completion time with the delay applied.
    pub delayed_completion: u64,
    /// Items whose earliest start moves, with the shift amount. The
    /// delayed item itself is not listed (its start does not move).
    pub shifted: BTreeMap<String, u64>,
}

impl ImpactResult {
    /// How much the project completion slips. Zero when the item's float
    /// absorbs the whole delay.
    #[must_use]
    pub const fn completion_delta(&self) -> u64 {
        self.delayed_completion.saturating_sub(self.baseline_completion)
    }
}

/// Simulate increasing `item`'s duration by `delay` units.
///
/// # Errors
///
/// [`ScheduleError::UnknownItem`] if the item is not in the graph.
pub fn impact(sg: &ScheduleGraph, item: &str, delay: u64) -> Result<ImpactResult, ScheduleError> {
    let idx = sg
        .node_index(item)
        .ok_or_else(|| ScheduleError::UnknownItem(item.to_string()))?;

    let baseline = forward_pass(sg, None);
    let delayed_duration = u64::from(sg.duration(idx)) + delay;
    let delayed = forward_pass(sg, Some((idx, delayed_duration)));

    let baseline_completion = baseline.values().copied().max().unwrap_or(0);
    let delayed_completion = delayed.values().copied().max().unwrap_or(0);

    let mut shifted: BTreeMap<String, u64> = BTreeMap::new();
    for &v in sg.topo_order() {
        if v == idx {
            continue;
        }
        let duration = u64::from(sg.duration(v));
        let base_start = baseline.get(&v).copied().unwrap_or(0).saturating_sub(duration);
        let new_start = delayed.get(&v).copied().unwrap_or(0).saturating_sub(duration);
        if new_start > base_start {
            if let Some(id) = sg.item_id(v) {
                shifted.insert(id.to_string(), new_start - base_start);
            }
        }
    }

    Ok(ImpactResult {
        item: item.to_string(),
        delay,
        baseline_completion,
        delayed_completion,
        shifted,
    })
}
