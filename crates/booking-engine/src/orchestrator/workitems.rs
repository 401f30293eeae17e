//! Work item derivation and allocation
//!
//! An accepted reservation deterministically yields a fixed set of
//! operational jobs: pre-service items offset back from check-in,
//! post-service items offset forward from check-out. Each item is
//! allocated independently; one unassignable job never blocks its
//! siblings or the reservation.

use chrono::{Duration, Utc};
use tracing::{error, info};

use stayline_reservation_core::types::{
    ReservationId, ReservationRequest, WorkItem, WorkItemId, WorkItemStatus,
};

use crate::allocator::AllocationOutcome;
use crate::config::WorkItemRule;
use crate::error::Result;
use crate::monitoring::BookingEvent;
use crate::orchestrator::core::BookingEngine;
use crate::orchestrator::types::AssignmentRecord;

impl BookingEngine {
    /// Derive and allocate the configured work items for an accepted
    /// reservation. The reservation counts as jobs-created only once
    /// every derived item has been processed, assigned or not.
    pub(crate) async fn expand_work_items(
        &self,
        request: &ReservationRequest,
    ) -> Result<Vec<AssignmentRecord>> {
        let rules = &self.config.work_items;
        let mut records = Vec::new();

        let schedule = rules
            .pre_service
            .iter()
            .map(|rule| (rule, request.check_in - Duration::hours(rule.offset_hours)))
            .chain(
                rules
                    .post_service
                    .iter()
                    .map(|rule| (rule, request.check_out + Duration::hours(rule.offset_hours))),
            );

        for (rule, scheduled_at) in schedule {
            let item = build_work_item(request, rule, scheduled_at);

            if let Err(err) = self.work_items.insert(item.clone()).await {
                // Per-item terminal failure; siblings still get their shot
                error!("Failed to store work item {}: {}", item.id, err);
                continue;
            }
            self.metrics.incr_work_items_created();
            self.events.emit(BookingEvent::WorkItemCreated {
                work_item: item.clone(),
            });

            records.push(self.allocate_item(item).await);
        }

        info!(
            "🧰 Derived {} work item(s) for reservation {} ({} assigned)",
            records.len(),
            request.id,
            records.iter().filter(|r| r.staff_id.is_some()).count()
        );
        Ok(records)
    }

    /// Run the allocator for one item and record the outcome
    pub(crate) async fn allocate_item(&self, item: WorkItem) -> AssignmentRecord {
        match self.allocator.assign(&item).await {
            Ok(AllocationOutcome::Assigned { staff_id, ranked }) => {
                self.metrics.incr_assignments();
                self.events.emit(BookingEvent::WorkItemAssigned {
                    work_item_id: item.id.clone(),
                    staff_id: staff_id.clone(),
                    ranked: ranked.clone(),
                });
                AssignmentRecord {
                    work_item_id: item.id,
                    job_type: item.job_type,
                    staff_id: Some(staff_id),
                    ranked,
                    unassigned_cause: None,
                }
            }
            Ok(AllocationOutcome::Unassigned { cause }) => {
                if let Err(err) = self.work_items.mark_unassigned(&item.id, cause).await {
                    error!("Failed to record unassigned cause for {}: {}", item.id, err);
                }
                self.metrics.incr_allocation_failures();
                self.events.emit(BookingEvent::AllocationFailed {
                    work_item_id: item.id.clone(),
                    cause,
                });
                AssignmentRecord {
                    work_item_id: item.id,
                    job_type: item.job_type,
                    staff_id: None,
                    ranked: Vec::new(),
                    unassigned_cause: Some(cause),
                }
            }
            Err(err) => {
                // The item stays pending; the reallocation sweep or an
                // operator picks it up later.
                error!("Allocation pass failed for work item {}: {}", item.id, err);
                AssignmentRecord {
                    work_item_id: item.id,
                    job_type: item.job_type,
                    staff_id: None,
                    ranked: Vec::new(),
                    unassigned_cause: None,
                }
            }
        }
    }

    /// Retry allocation for items an earlier pass left unassigned.
    /// Returns how many found a staff member this time.
    pub async fn reallocate_pending(&self) -> Result<usize> {
        let pending = self.work_items.pending_unassigned().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        info!("🔁 Reallocation sweep over {} pending item(s)", pending.len());
        let mut assigned = 0;
        for item in pending {
            let record = self.allocate_item(item).await;
            if record.staff_id.is_some() {
                assigned += 1;
            }
        }
        Ok(assigned)
    }

    /// Cancel a reservation's blocks and outstanding work items.
    ///
    /// Blocks are status-transitioned, never deleted; the calendar
    /// window opens up for new requests immediately.
    pub async fn cancel_reservation(&self, id: &ReservationId) -> Result<()> {
        let block_ids = self.blocks.cancel_for_reservation(id).await?;
        if !block_ids.is_empty() {
            self.events.emit(BookingEvent::BlocksCancelled {
                reservation_id: id.clone(),
                block_ids: block_ids.clone(),
            });
        }

        let work_item_ids = self.work_items.cancel_for_reservation(id).await?;
        if !work_item_ids.is_empty() {
            self.events.emit(BookingEvent::WorkItemsCancelled {
                reservation_id: id.clone(),
                work_item_ids: work_item_ids.clone(),
            });
        }

        info!(
            "🗑️ Cancelled reservation {}: {} block(s), {} work item(s)",
            id,
            block_ids.len(),
            work_item_ids.len()
        );
        Ok(())
    }
}

fn build_work_item(
    request: &ReservationRequest,
    rule: &WorkItemRule,
    scheduled_at: chrono::DateTime<Utc>,
) -> WorkItem {
    WorkItem {
        id: WorkItemId::new(),
        job_type: rule.job_type,
        property_id: request.property_id.clone(),
        reservation_id: request.id.clone(),
        scheduled_at,
        estimated_minutes: rule.estimated_minutes,
        priority: rule.priority,
        required_capabilities: rule.required_capabilities.clone(),
        assigned_to: None,
        status: WorkItemStatus::Pending,
        unassigned_cause: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stayline_reservation_core::types::{JobType, PropertyId};

    use crate::config::WorkItemConfig;

    #[test]
    fn derivation_offsets_follow_the_rules() {
        let request = ReservationRequest::new(
            PropertyId::from("villa-1"),
            "Ada Lovelace",
            "ada@example.com",
            chrono::Utc.with_ymd_and_hms(2026, 4, 10, 15, 0, 0).unwrap(),
            chrono::Utc.with_ymd_and_hms(2026, 4, 14, 11, 0, 0).unwrap(),
            2,
            800.0,
        );

        let config = WorkItemConfig::default();
        let cleaning = &config.pre_service[0];
        assert_eq!(cleaning.job_type, JobType::Cleaning);

        let item = build_work_item(
            &request,
            cleaning,
            request.check_in - Duration::hours(cleaning.offset_hours),
        );
        // cleaning is scheduled 4 hours before the 15:00 check-in
        assert_eq!(
            item.scheduled_at,
            chrono::Utc.with_ymd_and_hms(2026, 4, 10, 11, 0, 0).unwrap()
        );
        assert_eq!(item.status, WorkItemStatus::Pending);
        assert_eq!(item.reservation_id, request.id);

        let inspection = &config.post_service[1];
        assert_eq!(inspection.job_type, JobType::Inspection);
        let item = build_work_item(
            &request,
            inspection,
            request.check_out + Duration::hours(inspection.offset_hours),
        );
        // inspection lands 2 hours after the 11:00 check-out
        assert_eq!(
            item.scheduled_at,
            chrono::Utc.with_ymd_and_hms(2026, 4, 14, 13, 0, 0).unwrap()
        );
    }
}
