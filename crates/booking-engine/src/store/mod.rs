//! Store interfaces and in-memory implementations
//!
//! Persistence technology is owned by external collaborators; these
//! traits are the seam. The in-memory implementations in [`memory`] are
//! the defaults used by tests and single-process deployments.

pub mod memory;

pub use memory::{
    InMemoryBlockStore, InMemoryCalendarFeed, InMemoryPropertyCatalog, InMemoryReservationStore,
    InMemoryWorkItemStore,
};

use async_trait::async_trait;

use stayline_reservation_core::types::{
    CalendarEvent, Property, PropertyId, ReservationId, ReservationRequest, ReservationStatus,
    ResourceBlock, StaffId, TimeWindow, UnassignedCause, WorkItem, WorkItemId, WorkItemStatus,
};

use crate::error::Result;

/// Outcome of a conditional block commit
#[derive(Debug, Clone)]
pub enum BlockCommit {
    /// Both blocks were written
    Committed,
    /// The booking window lost a commit-time re-check; nothing was written
    Conflicted(Vec<ResourceBlock>),
}

/// Reservation request store
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn insert(&self, request: ReservationRequest) -> Result<()>;

    async fn get(&self, id: &ReservationId) -> Result<Option<ReservationRequest>>;

    /// Transition status and record the reason; bumps `updated_at`.
    async fn set_status(
        &self,
        id: &ReservationId,
        status: ReservationStatus,
        reason: Option<String>,
    ) -> Result<()>;

    /// Increment the retry counter, returning the new value.
    async fn bump_retry(&self, id: &ReservationId) -> Result<u32>;

    async fn list_by_status(&self, status: ReservationStatus) -> Result<Vec<ReservationRequest>>;
}

/// Resource block store
///
/// Blocks are append-only history: they are status-transitioned, never
/// deleted.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// All blocks for a property, any status
    async fn blocks_for(&self, property: &PropertyId) -> Result<Vec<ResourceBlock>>;

    /// Write a booking block plus its turnover buffer, re-checking the
    /// booking window for conflicts under the store's write lock first.
    ///
    /// This is the check-then-act step that keeps two concurrent
    /// accepted reservations for one property from both committing.
    async fn commit_if_free(
        &self,
        booking: ResourceBlock,
        buffer: ResourceBlock,
    ) -> Result<BlockCommit>;

    /// Append a manually entered block without the conflict re-check
    async fn insert(&self, block: ResourceBlock) -> Result<()>;

    /// Cancel all active blocks sourced from a reservation; returns the
    /// ids of the blocks transitioned.
    async fn cancel_for_reservation(&self, id: &ReservationId) -> Result<Vec<String>>;
}

/// Work item store
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    async fn insert(&self, item: WorkItem) -> Result<()>;

    async fn get(&self, id: &WorkItemId) -> Result<Option<WorkItem>>;

    /// Atomically assign: set the staff reference and transition to
    /// `assigned` together, but only while the item is still pending.
    /// Returns false when the item was no longer pending.
    async fn commit_assignment(&self, id: &WorkItemId, staff: &StaffId) -> Result<bool>;

    /// Record why an item stayed unassigned; the item remains pending.
    async fn mark_unassigned(&self, id: &WorkItemId, cause: UnassignedCause) -> Result<()>;

    async fn set_status(&self, id: &WorkItemId, status: WorkItemStatus) -> Result<()>;

    /// Items currently holding a staff member's time
    async fn active_for_staff(&self, staff: &StaffId) -> Result<Vec<WorkItem>>;

    /// Pending items with no assignment, for the reallocation sweep
    async fn pending_unassigned(&self) -> Result<Vec<WorkItem>>;

    async fn for_reservation(&self, id: &ReservationId) -> Result<Vec<WorkItem>>;

    /// Cancel pending/assigned items derived from a reservation
    async fn cancel_for_reservation(&self, id: &ReservationId) -> Result<Vec<WorkItemId>>;
}

/// Property directory
#[async_trait]
pub trait PropertyCatalog: Send + Sync {
    async fn get(&self, id: &PropertyId) -> Result<Option<Property>>;
}

/// Soft calendar entries from the property-calendar collaborator
#[async_trait]
pub trait CalendarFeed: Send + Sync {
    /// Events overlapping `window` on a property
    async fn events_overlapping(
        &self,
        property: &PropertyId,
        window: TimeWindow,
    ) -> Result<Vec<CalendarEvent>>;
}
