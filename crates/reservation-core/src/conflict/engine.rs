//! Overlap detection and alternative-date search
//!
//! All functions operate on the block set of a single property. Blocks
//! with a non-active status never participate in conflicts (history is
//! append-only, so cancelled and completed blocks stay in the set).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{BlockKind, ResourceBlock, TimeWindow};

/// How far the alternative-date scan reaches in each direction.
const ALTERNATIVE_SCAN_DAYS: i64 = 30;

/// How many alternative windows are returned at most.
const MAX_ALTERNATIVES: usize = 3;

/// Availability verdict for one requested window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    pub conflicts: Vec<ResourceBlock>,
}

/// A candidate replacement window found near the requested one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeWindow {
    pub window: TimeWindow,
    pub offset_days: i64,
    /// 0.1-1.0, higher for windows closer to the request
    pub confidence: f64,
}

/// Find all active blocks overlapping `window`, skipping `exclude_kinds`.
///
/// Overlap is half-open: a block ending exactly when the window starts
/// does not conflict.
pub fn find_conflicts<'a>(
    blocks: &'a [ResourceBlock],
    window: TimeWindow,
    exclude_kinds: &[BlockKind],
) -> Vec<&'a ResourceBlock> {
    blocks
        .iter()
        .filter(|block| {
            block.is_active()
                && !exclude_kinds.contains(&block.kind)
                && block.window.overlaps(&window)
        })
        .collect()
}

/// Availability check used by validation: buffer blocks are soft and
/// never make a window unavailable on their own.
pub fn check_availability(blocks: &[ResourceBlock], window: TimeWindow) -> Availability {
    let conflicts: Vec<ResourceBlock> = find_conflicts(blocks, window, &[BlockKind::Buffer])
        .into_iter()
        .cloned()
        .collect();

    Availability {
        available: conflicts.is_empty(),
        conflicts,
    }
}

/// Scan ±30 day offsets around `window` for free same-duration windows.
///
/// Offset 0 is excluded (that is the conflicted request itself). Results
/// are ranked by `confidence = max(0.1, 1 - |offset|/30)`, descending,
/// with smaller |offset| winning ties so the ordering is deterministic.
pub fn suggest_alternatives(blocks: &[ResourceBlock], window: TimeWindow) -> Vec<AlternativeWindow> {
    let mut candidates = Vec::new();

    for offset in -ALTERNATIVE_SCAN_DAYS..=ALTERNATIVE_SCAN_DAYS {
        if offset == 0 {
            continue;
        }

        let shifted = window.shifted_days(offset);
        if check_availability(blocks, shifted).available {
            let confidence = (1.0 - offset.abs() as f64 / ALTERNATIVE_SCAN_DAYS as f64).max(0.1);
            candidates.push(AlternativeWindow {
                window: shifted,
                offset_days: offset,
                confidence,
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.offset_days.abs().cmp(&b.offset_days.abs()))
    });
    candidates.truncate(MAX_ALTERNATIVES);

    debug!(
        "📅 Alternative search for {}: {} candidates kept",
        window,
        candidates.len()
    );
    candidates
}
