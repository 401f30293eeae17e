//! In-memory store implementations
//!
//! Process-local state behind the store traits. Writes that must be
//! conditional (block commits, assignment commits) take the map's write
//! lock for the whole check-then-act step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use stayline_reservation_core::conflict::find_conflicts;
use stayline_reservation_core::types::{
    BlockKind, BlockSource, BlockStatus, CalendarEvent, Property, PropertyId, ReservationId,
    ReservationRequest, ReservationStatus, ResourceBlock, StaffId, TimeWindow, UnassignedCause,
    WorkItem, WorkItemId, WorkItemStatus,
};

use crate::error::{BookingEngineError, Result};
use crate::store::{
    BlockCommit, BlockStore, CalendarFeed, PropertyCatalog, ReservationStore, WorkItemStore,
};

/// In-memory reservation store
pub struct InMemoryReservationStore {
    requests: DashMap<ReservationId, ReservationRequest>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
        }
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, request: ReservationRequest) -> Result<()> {
        self.requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn get(&self, id: &ReservationId) -> Result<Option<ReservationRequest>> {
        Ok(self.requests.get(id).map(|entry| entry.value().clone()))
    }

    async fn set_status(
        &self,
        id: &ReservationId,
        status: ReservationStatus,
        reason: Option<String>,
    ) -> Result<()> {
        match self.requests.get_mut(id) {
            Some(mut entry) => {
                let request = entry.value_mut();
                debug!(
                    "🔄 Reservation {} status: {} -> {}",
                    id, request.status, status
                );
                request.status = status;
                request.updated_at = Utc::now();
                if let Some(reason) = reason {
                    request
                        .extensions
                        .insert("status_reason".to_string(), serde_json::json!(reason));
                }
                Ok(())
            }
            None => Err(BookingEngineError::not_found(format!(
                "Reservation not found: {}",
                id
            ))),
        }
    }

    async fn bump_retry(&self, id: &ReservationId) -> Result<u32> {
        match self.requests.get_mut(id) {
            Some(mut entry) => {
                let request = entry.value_mut();
                request.retry_count += 1;
                request.updated_at = Utc::now();
                Ok(request.retry_count)
            }
            None => Err(BookingEngineError::not_found(format!(
                "Reservation not found: {}",
                id
            ))),
        }
    }

    async fn list_by_status(&self, status: ReservationStatus) -> Result<Vec<ReservationRequest>> {
        Ok(self
            .requests
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// In-memory block store
///
/// A single lock over the whole map keeps the commit-time conflict
/// re-check and the append atomic with respect to concurrent committers.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<PropertyId, Vec<ResourceBlock>>>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn blocks_for(&self, property: &PropertyId) -> Result<Vec<ResourceBlock>> {
        Ok(self
            .blocks
            .read()
            .get(property)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_if_free(
        &self,
        booking: ResourceBlock,
        buffer: ResourceBlock,
    ) -> Result<BlockCommit> {
        let mut map = self.blocks.write();
        let entries = map.entry(booking.property_id.clone()).or_default();

        // Fresh conflict re-check immediately before the write; the
        // losing writer of two overlapping acceptances lands here.
        let conflicts: Vec<ResourceBlock> =
            find_conflicts(entries, booking.window, &[BlockKind::Buffer])
                .into_iter()
                .cloned()
                .collect();
        if !conflicts.is_empty() {
            info!(
                "🚫 Commit-time conflict for {} on {}: {} block(s)",
                booking.id,
                booking.property_id,
                conflicts.len()
            );
            return Ok(BlockCommit::Conflicted(conflicts));
        }

        info!(
            "🏠 Committed booking block {} + buffer {} on {}",
            booking.id, buffer.id, booking.property_id
        );
        entries.push(booking);
        entries.push(buffer);
        Ok(BlockCommit::Committed)
    }

    async fn insert(&self, block: ResourceBlock) -> Result<()> {
        self.blocks
            .write()
            .entry(block.property_id.clone())
            .or_default()
            .push(block);
        Ok(())
    }

    async fn cancel_for_reservation(&self, id: &ReservationId) -> Result<Vec<String>> {
        let mut cancelled = Vec::new();
        let mut map = self.blocks.write();
        for entries in map.values_mut() {
            for block in entries.iter_mut() {
                let from_reservation =
                    matches!(&block.source, BlockSource::Reservation(source) if source == id);
                if from_reservation && block.status == BlockStatus::Active {
                    block.status = BlockStatus::Cancelled;
                    cancelled.push(block.id.clone());
                }
            }
        }
        if !cancelled.is_empty() {
            info!("🗓️ Cancelled {} block(s) for reservation {}", cancelled.len(), id);
        }
        Ok(cancelled)
    }
}

/// In-memory work item store
pub struct InMemoryWorkItemStore {
    items: RwLock<HashMap<WorkItemId, WorkItem>>,
}

impl InMemoryWorkItemStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryWorkItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkItemStore for InMemoryWorkItemStore {
    async fn insert(&self, item: WorkItem) -> Result<()> {
        self.items.write().insert(item.id.clone(), item);
        Ok(())
    }

    async fn get(&self, id: &WorkItemId) -> Result<Option<WorkItem>> {
        Ok(self.items.read().get(id).cloned())
    }

    async fn commit_assignment(&self, id: &WorkItemId, staff: &StaffId) -> Result<bool> {
        let mut items = self.items.write();
        let item = items
            .get_mut(id)
            .ok_or_else(|| BookingEngineError::not_found(format!("Work item not found: {}", id)))?;

        if item.status != WorkItemStatus::Pending {
            return Ok(false);
        }

        // Reference and status move together or not at all
        item.assigned_to = Some(staff.clone());
        item.status = WorkItemStatus::Assigned;
        item.unassigned_cause = None;
        Ok(true)
    }

    async fn mark_unassigned(&self, id: &WorkItemId, cause: UnassignedCause) -> Result<()> {
        let mut items = self.items.write();
        let item = items
            .get_mut(id)
            .ok_or_else(|| BookingEngineError::not_found(format!("Work item not found: {}", id)))?;
        item.unassigned_cause = Some(cause);
        Ok(())
    }

    async fn set_status(&self, id: &WorkItemId, status: WorkItemStatus) -> Result<()> {
        let mut items = self.items.write();
        let item = items
            .get_mut(id)
            .ok_or_else(|| BookingEngineError::not_found(format!("Work item not found: {}", id)))?;
        item.status = status;
        Ok(())
    }

    async fn active_for_staff(&self, staff: &StaffId) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| item.assigned_to.as_ref() == Some(staff) && item.occupies_staff())
            .cloned()
            .collect())
    }

    async fn pending_unassigned(&self) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| item.status == WorkItemStatus::Pending && item.assigned_to.is_none())
            .cloned()
            .collect())
    }

    async fn for_reservation(&self, id: &ReservationId) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| &item.reservation_id == id)
            .cloned()
            .collect())
    }

    async fn cancel_for_reservation(&self, id: &ReservationId) -> Result<Vec<WorkItemId>> {
        let mut cancelled = Vec::new();
        let mut items = self.items.write();
        for item in items.values_mut() {
            if &item.reservation_id == id
                && matches!(item.status, WorkItemStatus::Pending | WorkItemStatus::Assigned)
            {
                item.status = WorkItemStatus::Cancelled;
                cancelled.push(item.id.clone());
            }
        }
        Ok(cancelled)
    }
}

/// In-memory property catalog
pub struct InMemoryPropertyCatalog {
    properties: DashMap<PropertyId, Property>,
}

impl InMemoryPropertyCatalog {
    pub fn new() -> Self {
        Self {
            properties: DashMap::new(),
        }
    }

    pub fn upsert(&self, property: Property) {
        self.properties.insert(property.id.clone(), property);
    }
}

impl Default for InMemoryPropertyCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PropertyCatalog for InMemoryPropertyCatalog {
    async fn get(&self, id: &PropertyId) -> Result<Option<Property>> {
        Ok(self.properties.get(id).map(|entry| entry.value().clone()))
    }
}

/// In-memory calendar feed
pub struct InMemoryCalendarFeed {
    events: RwLock<Vec<CalendarEvent>>,
}

impl InMemoryCalendarFeed {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    pub fn push(&self, event: CalendarEvent) {
        self.events.write().push(event);
    }
}

impl Default for InMemoryCalendarFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarFeed for InMemoryCalendarFeed {
    async fn events_overlapping(
        &self,
        property: &PropertyId,
        window: TimeWindow,
    ) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|event| &event.property_id == property && event.window.overlaps(&window))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn window(offset_days: i64, len_days: i64) -> TimeWindow {
        let start = Utc::now() + Duration::days(offset_days);
        TimeWindow::new(start, start + Duration::days(len_days))
    }

    #[tokio::test]
    async fn commit_if_free_rejects_second_overlapping_writer() {
        let store = InMemoryBlockStore::new();
        let property = PropertyId::from("villa-1");

        let first = ResourceBlock::booking(property.clone(), window(3, 4), ReservationId::new());
        let first_buffer =
            ResourceBlock::buffer(property.clone(), window(7, 1), ReservationId::new());
        assert!(matches!(
            store.commit_if_free(first, first_buffer).await.unwrap(),
            BlockCommit::Committed
        ));

        let second = ResourceBlock::booking(property.clone(), window(4, 4), ReservationId::new());
        let second_buffer =
            ResourceBlock::buffer(property.clone(), window(8, 1), ReservationId::new());
        match store.commit_if_free(second, second_buffer).await.unwrap() {
            BlockCommit::Conflicted(conflicts) => assert_eq!(conflicts.len(), 1),
            BlockCommit::Committed => panic!("second overlapping commit must lose"),
        }

        // Only the winner's pair landed
        assert_eq!(store.blocks_for(&property).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn assignment_commit_is_conditional_on_pending() {
        let store = InMemoryWorkItemStore::new();
        let item = WorkItem {
            id: WorkItemId::from("job-1"),
            job_type: stayline_reservation_core::types::JobType::Cleaning,
            property_id: PropertyId::from("villa-1"),
            reservation_id: ReservationId::new(),
            scheduled_at: Utc::now() + Duration::days(1),
            estimated_minutes: 60,
            priority: stayline_reservation_core::types::Priority::High,
            required_capabilities: vec!["cleaning".to_string()],
            assigned_to: None,
            status: WorkItemStatus::Pending,
            unassigned_cause: None,
            created_at: Utc::now(),
        };
        store.insert(item).await.unwrap();

        let id = WorkItemId::from("job-1");
        assert!(store.commit_assignment(&id, &StaffId::from("alice")).await.unwrap());
        // Second commit sees a non-pending item and refuses
        assert!(!store.commit_assignment(&id, &StaffId::from("bob")).await.unwrap());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.assigned_to, Some(StaffId::from("alice")));
        assert_eq!(stored.status, WorkItemStatus::Assigned);
    }

    #[tokio::test]
    async fn cancelling_blocks_is_a_status_transition() {
        let store = InMemoryBlockStore::new();
        let property = PropertyId::from("villa-1");
        let reservation = ReservationId::new();

        let booking = ResourceBlock::booking(property.clone(), window(3, 4), reservation.clone());
        let buffer = ResourceBlock::buffer(property.clone(), window(7, 1), reservation.clone());
        store.commit_if_free(booking, buffer).await.unwrap();

        let cancelled = store.cancel_for_reservation(&reservation).await.unwrap();
        assert_eq!(cancelled.len(), 2);

        // History stays in the store
        let blocks = store.blocks_for(&property).await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.status == BlockStatus::Cancelled));
    }
}
