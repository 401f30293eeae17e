//! Shared types for the orchestration layer

use serde::Serialize;

use stayline_reservation_core::conflict::resolver::ConflictResolution;
use stayline_reservation_core::types::{
    JobType, ReservationId, ReservationRequest, ReservationStatus, ScoreBreakdown, StaffId,
    UnassignedCause, WorkItemId,
};

use crate::monitoring::MetricsSnapshot;
use crate::queue::QueueStats;
use crate::staff::StaffStats;

/// One change-feed delivery: identity plus the full request record
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub reservation_id: ReservationId,
    pub request: ReservationRequest,
}

impl FeedItem {
    pub fn new(request: ReservationRequest) -> Self {
        Self {
            reservation_id: request.id.clone(),
            request,
        }
    }
}

/// Terminal outcome of one processing pass over a reservation
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Accepted: blocks committed, work items derived and attempted
    Confirmed {
        block_ids: Vec<String>,
        assignments: Vec<AssignmentRecord>,
    },
    /// Business rejection with reason and structured details
    Rejected {
        reason: String,
        details: serde_json::Value,
    },
    /// Parked for an operator
    ManualReview { resolution: ConflictResolution },
    /// The persisted status had already left `pending`; nothing was done
    Skipped { status: Option<ReservationStatus> },
}

/// Per-work-item allocation record kept for the audit trail
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentRecord {
    pub work_item_id: WorkItemId,
    pub job_type: JobType,
    pub staff_id: Option<StaffId>,
    /// Every scored candidate, best first; empty when filtering left
    /// nobody to score
    pub ranked: Vec<ScoreBreakdown>,
    pub unassigned_cause: Option<UnassignedCause>,
}

/// Engine-wide statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub queue: QueueStats,
    pub staff: StaffStats,
    pub metrics: MetricsSnapshot,
}
