use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use stayline_reservation_core::types::{
    ScoreBreakdown, Staff, StaffAvailability, StaffId, UnassignedCause, WorkItem,
};

use crate::allocator::scoring::score_candidate;
use crate::config::AllocationConfig;
use crate::error::{BookingEngineError, Result};
use crate::staff::StaffDirectory;
use crate::store::WorkItemStore;

/// Allocation verdict for one work item
#[derive(Debug, Clone)]
pub enum AllocationOutcome {
    /// The top-ranked candidate was committed
    Assigned {
        staff_id: StaffId,
        /// Every scored candidate, best first, for the audit record
        ranked: Vec<ScoreBreakdown>,
    },
    /// No eligible candidate; the item stays pending with this cause
    Unassigned { cause: UnassignedCause },
}

/// Multi-factor scoring allocator
///
/// Reads candidates from the staff directory, filters for eligibility,
/// ranks the rest with the weighted score, and commits the winner
/// atomically through the work item store.
///
/// Known limitation: workload counts are read at decision time and not
/// re-validated at commit time, so two items scored concurrently can
/// both count the same candidate as lightly loaded. The commit itself
/// only re-checks that the item is still pending.
pub struct AllocationEngine {
    directory: Arc<dyn StaffDirectory>,
    work_items: Arc<dyn WorkItemStore>,
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(
        directory: Arc<dyn StaffDirectory>,
        work_items: Arc<dyn WorkItemStore>,
        config: AllocationConfig,
    ) -> Self {
        Self {
            directory,
            work_items,
            config,
        }
    }

    /// Attempt to assign `item` to the best eligible staff member.
    pub async fn assign(&self, item: &WorkItem) -> Result<AllocationOutcome> {
        let candidates = self.directory.candidates().await?;

        let available: Vec<Staff> = candidates
            .into_iter()
            .filter(|staff| staff.availability == StaffAvailability::Available)
            .collect();
        if available.is_empty() {
            debug!("❌ No available staff for work item {}", item.id);
            return Ok(AllocationOutcome::Unassigned {
                cause: UnassignedCause::NoneAvailable,
            });
        }

        let capable: Vec<Staff> = available
            .into_iter()
            .filter(|staff| {
                item.required_capabilities.is_empty()
                    || item
                        .required_capabilities
                        .iter()
                        .any(|needed| staff.capabilities.contains(needed))
            })
            .collect();
        if capable.is_empty() {
            debug!(
                "❌ No staff with capabilities {:?} for work item {}",
                item.required_capabilities, item.id
            );
            return Ok(AllocationOutcome::Unassigned {
                cause: UnassignedCause::NoCapabilityMatch,
            });
        }

        // Schedulability: working-hours window plus no overlapping
        // assigned item within the padded window.
        let padded = item
            .window()
            .padded(Duration::hours(self.config.overlap_buffer_hours));
        let mut schedulable: Vec<(Staff, usize)> = Vec::new();
        for staff in capable {
            if !staff.working_hours.covers(item.scheduled_at) {
                continue;
            }
            let active = self.work_items.active_for_staff(&staff.id).await?;
            let conflicted = active.iter().any(|held| held.window().overlaps(&padded));
            if !conflicted {
                schedulable.push((staff, active.len()));
            }
        }
        if schedulable.is_empty() {
            debug!("❌ All capable staff are time-conflicted for work item {}", item.id);
            return Ok(AllocationOutcome::Unassigned {
                cause: UnassignedCause::AllTimeConflicted,
            });
        }

        let mut ranked: Vec<ScoreBreakdown> = schedulable
            .iter()
            .map(|(staff, load)| score_candidate(staff, item, *load, &self.config))
            .collect();

        // Total descending, then performance, then id for determinism
        ranked.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.performance
                        .partial_cmp(&a.performance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.staff_id.cmp(&b.staff_id))
        });

        let winner = ranked
            .first()
            .ok_or_else(|| BookingEngineError::allocation("ranked candidate list is empty"))?
            .staff_id
            .clone();

        let committed = self.work_items.commit_assignment(&item.id, &winner).await?;
        if !committed {
            return Err(BookingEngineError::allocation(format!(
                "work item {} was no longer pending at commit",
                item.id
            )));
        }

        info!(
            "🎯 Assigned work item {} ({}) to {} (score {:.3}, {} candidate(s) ranked)",
            item.id,
            item.job_type,
            winner,
            ranked[0].total,
            ranked.len()
        );

        Ok(AllocationOutcome::Assigned {
            staff_id: winner,
            ranked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    use stayline_reservation_core::types::{
        JobType, PerformanceSummary, Priority, PropertyId, ReservationId, WorkItemId,
        WorkItemStatus, WorkingHours,
    };

    use crate::staff::StaffRegistry;
    use crate::store::{InMemoryWorkItemStore, WorkItemStore};

    fn scheduled_instant() -> chrono::DateTime<Utc> {
        // Tuesday inside default working hours
        Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap()
    }

    fn item(id: &str, required: &[&str]) -> WorkItem {
        WorkItem {
            id: WorkItemId::from(id),
            job_type: JobType::Cleaning,
            property_id: PropertyId::from("villa-1"),
            reservation_id: ReservationId::new(),
            scheduled_at: scheduled_instant(),
            estimated_minutes: 90,
            priority: Priority::High,
            required_capabilities: required.iter().map(|s| s.to_string()).collect(),
            assigned_to: None,
            status: WorkItemStatus::Pending,
            unassigned_cause: None,
            created_at: Utc::now(),
        }
    }

    fn staff(id: &str, capabilities: &[&str], completion_rate: f64) -> Staff {
        let mut by_type = HashMap::new();
        by_type.insert(JobType::Cleaning, 8);
        Staff {
            id: StaffId::from(id),
            display_name: id.to_string(),
            capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
            availability: StaffAvailability::Available,
            working_hours: WorkingHours::default(),
            performance: PerformanceSummary {
                completion_rate,
                average_rating: 4.0,
                on_time_rate: 0.8,
                completed_total: 30,
                completed_by_type: by_type,
            },
        }
    }

    fn engine(registry: Arc<StaffRegistry>, store: Arc<InMemoryWorkItemStore>) -> AllocationEngine {
        AllocationEngine::new(registry, store, AllocationConfig::default())
    }

    #[tokio::test]
    async fn best_scoring_candidate_wins() {
        let registry = Arc::new(StaffRegistry::new());
        registry.upsert(staff("slacker", &["cleaning"], 0.3));
        registry.upsert(staff("star", &["cleaning"], 0.99));

        let store = Arc::new(InMemoryWorkItemStore::new());
        let job = item("job-1", &["cleaning"]);
        store.insert(job.clone()).await.unwrap();

        match engine(registry, store.clone()).assign(&job).await.unwrap() {
            AllocationOutcome::Assigned { staff_id, ranked } => {
                assert_eq!(staff_id, StaffId::from("star"));
                assert_eq!(ranked.len(), 2);
                assert!(ranked[0].total >= ranked[1].total);
            }
            other => panic!("expected assignment, got {:?}", other),
        }

        let stored = store.get(&WorkItemId::from("job-1")).await.unwrap().unwrap();
        assert_eq!(stored.status, WorkItemStatus::Assigned);
        assert_eq!(stored.assigned_to, Some(StaffId::from("star")));
    }

    #[tokio::test]
    async fn capability_mismatch_is_distinguished_from_time_conflicts() {
        let registry = Arc::new(StaffRegistry::new());
        registry.upsert(staff("plumber", &["maintenance"], 0.9));

        let store = Arc::new(InMemoryWorkItemStore::new());
        let job = item("job-1", &["cleaning"]);
        store.insert(job.clone()).await.unwrap();

        match engine(registry, store).assign(&job).await.unwrap() {
            AllocationOutcome::Unassigned { cause } => {
                assert_eq!(cause, UnassignedCause::NoCapabilityMatch)
            }
            other => panic!("expected no capability match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn overlapping_assignment_blocks_candidate() {
        let registry = Arc::new(StaffRegistry::new());
        registry.upsert(staff("alice", &["cleaning"], 0.9));

        let store = Arc::new(InMemoryWorkItemStore::new());

        // Alice already holds a job 1 hour after the new one; the ±2h
        // padding makes them collide.
        let mut held = item("held", &["cleaning"]);
        held.scheduled_at = scheduled_instant() + Duration::hours(1);
        held.status = WorkItemStatus::Assigned;
        held.assigned_to = Some(StaffId::from("alice"));
        store.insert(held).await.unwrap();

        let job = item("job-1", &["cleaning"]);
        store.insert(job.clone()).await.unwrap();

        match engine(registry, store).assign(&job).await.unwrap() {
            AllocationOutcome::Unassigned { cause } => {
                assert_eq!(cause, UnassignedCause::AllTimeConflicted)
            }
            other => panic!("expected time conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn off_hours_schedule_finds_nobody() {
        let registry = Arc::new(StaffRegistry::new());
        registry.upsert(staff("alice", &["cleaning"], 0.9));

        let store = Arc::new(InMemoryWorkItemStore::new());
        let mut job = item("job-1", &["cleaning"]);
        // Tuesday 23:00 is outside the default 8-18 window
        job.scheduled_at = Utc.with_ymd_and_hms(2026, 3, 10, 23, 0, 0).unwrap();
        store.insert(job.clone()).await.unwrap();

        match engine(registry, store).assign(&job).await.unwrap() {
            AllocationOutcome::Unassigned { cause } => {
                assert_eq!(cause, UnassignedCause::AllTimeConflicted)
            }
            other => panic!("expected time conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ties_break_on_performance_then_id() {
        let registry = Arc::new(StaffRegistry::new());
        // Identical candidates except id; "anna" must win the tie
        registry.upsert(staff("zoe", &["cleaning"], 0.9));
        registry.upsert(staff("anna", &["cleaning"], 0.9));

        let store = Arc::new(InMemoryWorkItemStore::new());
        let job = item("job-1", &["cleaning"]);
        store.insert(job.clone()).await.unwrap();

        match engine(registry, store).assign(&job).await.unwrap() {
            AllocationOutcome::Assigned { staff_id, .. } => {
                assert_eq!(staff_id, StaffId::from("anna"))
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }
}
