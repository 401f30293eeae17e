//! Staff allocation for derived work items
//!
//! The allocator turns one pending work item into at most one staff
//! assignment:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Work Item                              │
//! │  (job type, schedule, required capabilities, priority)      │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │                  Candidate Filter                           │
//! │  - availability == available                                │
//! │  - capability overlap                                       │
//! │  - working hours / weekday match                            │
//! │  - no overlapping assigned item (±2h buffer)                │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────────────┐
//! │                  Weighted Scoring                           │
//! │  0.4·skill + 0.3·performance + 0.2·workload + 0.1·exp       │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!           ┌───────────────┼───────────────┐
//! ┌─────────▼─────────┐           ┌─────────▼──────────┐
//! │  Atomic commit    │           │  Unassigned with   │
//! │  (ref + status)   │           │  recorded cause    │
//! └───────────────────┘           └────────────────────┘
//! ```
//!
//! The full ranked candidate list is retained per decision for
//! explainability, not just the winner.

pub mod engine;
pub mod scoring;

pub use engine::{AllocationEngine, AllocationOutcome};
pub use scoring::score_candidate;
