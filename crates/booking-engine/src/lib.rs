//! # Booking Engine for STAYLINE
//!
//! This crate provides the asynchronous half of the stayline booking
//! pipeline: reservation intake from a change feed, concurrent
//! validation and acceptance with idempotence and retry guarantees, and
//! multi-factor staff allocation for the operational jobs every
//! accepted stay generates.
//!
//! ## Features
//!
//! - **Pipeline Orchestration**: Change-feed intake, per-identity
//!   in-flight guard, bounded worker pool with timeout and exponential
//!   backoff retries
//! - **Conflict-Safe Acceptance**: Booking blocks committed under a
//!   fresh commit-time conflict re-check; concurrent overlapping
//!   acceptances cannot corrupt a property calendar
//! - **Work Item Derivation**: Deterministic pre-/post-service job
//!   expansion with configurable offsets
//! - **Scoring Allocator**: Weighted skill/performance/workload/
//!   experience ranking with a full per-decision audit trail
//! - **Monitoring**: Atomic pipeline counters and a broadcast stream of
//!   domain events for external collaborators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stayline_booking_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Create configuration
//!     let config = BookingEngineConfig::default();
//!
//!     // Initialize the engine with in-memory collaborators
//!     let engine = BookingEngine::new(config)?;
//!
//!     // Start processing reservations
//!     engine.clone().start()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The engine is organized into focused modules:
//!
//! - [`orchestrator`]: Coordinator, scheduler, and processing pipeline
//! - [`queue`]: Priority queue with the in-flight idempotence guard
//! - [`allocator`]: Candidate filtering and weighted scoring
//! - [`staff`]: Staff registry and directory interface
//! - [`store`]: Store trait seams plus in-memory implementations
//! - [`monitoring`]: Metrics counters and collaborator-facing events

// Core modules
pub mod config;
pub mod error;

// Pipeline modules
pub mod allocator;
pub mod orchestrator;
pub mod queue;
pub mod staff;

// External interfaces
pub mod monitoring;
pub mod store;

// Re-exports for convenience
pub use config::BookingEngineConfig;
pub use error::{BookingEngineError, Result};
pub use orchestrator::{BookingEngine, Collaborators};

/// Prelude module for convenient imports
pub mod prelude {
    // Core types
    pub use crate::{BookingEngine, BookingEngineConfig, BookingEngineError, Collaborators, Result};

    // Configuration types
    pub use crate::config::{
        AllocationConfig, GeneralConfig, MonitoringConfig, QueueConfig, ScoringWeights,
        WorkItemConfig, WorkItemRule,
    };

    // Orchestrator types
    pub use crate::orchestrator::{AssignmentRecord, EngineStats, FeedItem, ProcessOutcome};

    // Queue types
    pub use crate::queue::{QueueStats, QueuedReservation, ReservationQueue};

    // Allocation types
    pub use crate::allocator::{AllocationEngine, AllocationOutcome};

    // Staff types
    pub use crate::staff::{StaffDirectory, StaffRegistry, StaffStats};

    // Store interfaces
    pub use crate::store::{
        BlockCommit, BlockStore, CalendarFeed, InMemoryBlockStore, InMemoryCalendarFeed,
        InMemoryPropertyCatalog, InMemoryReservationStore, InMemoryWorkItemStore, PropertyCatalog,
        ReservationStore, WorkItemStore,
    };

    // Monitoring types
    pub use crate::monitoring::{BookingEvent, EventBroadcaster, MetricsCollector, MetricsSnapshot};

    // Domain types from reservation-core
    pub use stayline_reservation_core::prelude::*;
}
