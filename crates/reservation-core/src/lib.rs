//! # Reservation Core for STAYLINE
//!
//! This crate provides the pure domain layer for the stayline booking
//! pipeline: the entity types shared across the stack, stateless request
//! validation, and interval conflict detection over per-property time
//! blocks.
//!
//! Everything in this crate is synchronous and side-effect free. The
//! async orchestration (queueing, retries, staff allocation) lives in
//! `stayline-booking-engine`, which depends on this crate and never the
//! other way around.
//!
//! ## Modules
//!
//! - [`types`]: Reservation, block, work item, and staff entity types
//! - [`conflict`]: Overlap detection, alternative-date search, and
//!   conflict resolution classification
//! - [`validation`]: Ordered business-rule evaluation for incoming
//!   reservation requests

pub mod types;
pub mod conflict;
pub mod validation;

// Re-exports for convenience
pub use types::{
    Priority, Property, PropertyId, ReservationId, ReservationRequest, ReservationStatus,
    ResourceBlock, StaffId, TimeWindow, WorkItem, WorkItemId,
};
pub use conflict::{check_availability, find_conflicts, suggest_alternatives};
pub use conflict::resolver::{ConflictResolution, ConflictSeverity, DetectedConflict};
pub use validation::{ValidationEngine, ValidationOutcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::{
        BlockKind, BlockSource, BlockStatus, CalendarEvent, CalendarEventKind, JobType,
        PerformanceSummary, Priority, Property, PropertyId, ReservationId, ReservationRequest,
        ReservationStatus, ResourceBlock, ScoreBreakdown, Staff, StaffAvailability, StaffId,
        TimeWindow, UnassignedCause, WorkItem, WorkItemId, WorkItemStatus, WorkingHours,
    };
    pub use crate::conflict::{
        check_availability, find_conflicts, suggest_alternatives, Availability,
        AlternativeWindow,
    };
    pub use crate::conflict::resolver::{
        resolve, ConflictResolution, ConflictSeverity, DetectedConflict, SuggestedAction,
    };
    pub use crate::validation::{
        ValidationContext, ValidationEngine, ValidationErrorCode, ValidationFailure,
        ValidationOutcome, ValidationRules,
    };

    // Common external types
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
