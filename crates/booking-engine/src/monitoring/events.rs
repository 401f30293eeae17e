use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use stayline_reservation_core::conflict::resolver::{
    ConflictSeverity, DetectedConflict, SuggestedAction,
};
use stayline_reservation_core::types::{
    PropertyId, ReservationId, ReservationStatus, ScoreBreakdown, StaffId, UnassignedCause,
    WorkItem, WorkItemId,
};

/// Domain events consumed by external collaborators
///
/// The shapes here are the outbound contract; how collaborators
/// serialize them on their side of the fence is their business, so every
/// payload derives `Serialize` and nothing more is promised.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    /// Reservation status transition with reason
    StatusChanged {
        reservation_id: ReservationId,
        status: ReservationStatus,
        reason: Option<String>,
    },
    /// Booking + buffer block pair committed for a confirmed reservation
    BlocksCommitted {
        reservation_id: ReservationId,
        property_id: PropertyId,
        block_ids: Vec<String>,
    },
    /// Blocks cancelled (reservation cancellation)
    BlocksCancelled {
        reservation_id: ReservationId,
        block_ids: Vec<String>,
    },
    /// A work item was derived from a confirmed reservation
    WorkItemCreated { work_item: WorkItem },
    /// A work item was assigned; the ranked list is the audit trail
    WorkItemAssigned {
        work_item_id: WorkItemId,
        staff_id: StaffId,
        ranked: Vec<ScoreBreakdown>,
    },
    /// No eligible candidate; the item stays pending
    AllocationFailed {
        work_item_id: WorkItemId,
        cause: UnassignedCause,
    },
    /// Soft conflicts were cleared automatically; collaborators should
    /// apply the action list (reschedules, staff notifications)
    ConflictsAutoResolved {
        reservation_id: ReservationId,
        suggested_actions: Vec<SuggestedAction>,
    },
    /// Unresolvable conflicts; an operator has to look at this one
    EscalationRaised {
        reservation_id: ReservationId,
        severity: ConflictSeverity,
        reasoning: String,
        conflicts: Vec<DetectedConflict>,
        suggested_actions: Vec<SuggestedAction>,
    },
    /// A queued reservation waited past the limit and was errored out
    ReservationExpired { reservation_id: ReservationId },
    /// Work items cancelled following a reservation cancellation
    WorkItemsCancelled {
        reservation_id: ReservationId,
        work_item_ids: Vec<WorkItemId>,
    },
}

/// Fan-out of [`BookingEvent`]s to subscribers
///
/// Thin wrapper over a tokio broadcast channel. Dropping events when
/// nobody subscribes is fine; collaborators that care hold a receiver.
pub struct EventBroadcaster {
    tx: broadcast::Sender<BookingEvent>,
    enabled: bool,
}

impl EventBroadcaster {
    pub fn new(capacity: usize, enabled: bool) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, enabled }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: BookingEvent) {
        if !self.enabled {
            return;
        }
        trace!("📣 Emitting event: {:?}", event);
        // Send fails only when there are no subscribers; not an error
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let broadcaster = EventBroadcaster::new(16, true);
        let mut rx = broadcaster.subscribe();

        broadcaster.emit(BookingEvent::StatusChanged {
            reservation_id: ReservationId::from("r1"),
            status: ReservationStatus::Confirmed,
            reason: None,
        });

        match rx.recv().await.unwrap() {
            BookingEvent::StatusChanged { reservation_id, status, .. } => {
                assert_eq!(reservation_id, ReservationId::from("r1"));
                assert_eq!(status, ReservationStatus::Confirmed);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn disabled_broadcaster_stays_silent() {
        let broadcaster = EventBroadcaster::new(16, false);
        let mut rx = broadcaster.subscribe();

        broadcaster.emit(BookingEvent::ReservationExpired {
            reservation_id: ReservationId::from("r1"),
        });

        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[test]
    fn events_serialize_for_collaborators() {
        let event = BookingEvent::AllocationFailed {
            work_item_id: WorkItemId::from("job-1"),
            cause: UnassignedCause::NoCapabilityMatch,
        };
        let raw = serde_json::to_value(&event).unwrap();
        assert_eq!(raw["event"], "allocation_failed");
        assert_eq!(raw["cause"], "no_capability_match");
    }
}
