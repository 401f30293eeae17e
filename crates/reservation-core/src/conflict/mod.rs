//! Interval conflict detection and resolution
//!
//! This module answers two questions for one property's calendar:
//! does a requested window collide with committed blocks, and if it
//! does, can the collision be resolved without an operator.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Requested window [start, end)             │
//! └──────────────────────────┬───────────────────────────┘
//!                            │
//! ┌──────────────────────────▼───────────────────────────┐
//! │                  Conflict Engine                     │
//! │  - half-open overlap scan over active blocks         │
//! │  - availability verdict                              │
//! │  - alternative-date search (±30 days)                │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ conflicts
//! ┌──────────────────────────▼───────────────────────────┐
//! │                 Conflict Resolver                    │
//! │  - severity classification                           │
//! │  - auto-resolvability (all-or-nothing)               │
//! │  - suggested action list / escalation                │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function over the caller-supplied block
//! set; the engine performs no I/O and is safe to call concurrently
//! for different properties.

pub mod engine;
pub mod resolver;

pub use engine::{check_availability, find_conflicts, suggest_alternatives};
pub use engine::{AlternativeWindow, Availability};
pub use resolver::{resolve, ConflictResolution, ConflictSeverity, DetectedConflict, SuggestedAction};
