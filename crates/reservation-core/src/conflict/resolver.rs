//! Conflict classification and auto-resolution policy
//!
//! The resolver takes the conflicts the engine found and decides how bad
//! they are and whether the pipeline may proceed without an operator.
//! Two hard rules:
//!
//! - A direct overlap with another reservation's booking block is never
//!   auto-resolvable and is at least [`ConflictSeverity::High`].
//! - Auto-resolution is all-or-nothing: one non-resolvable conflict in
//!   the set blocks auto-resolution for the whole set.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{
    BlockKind, CalendarEvent, CalendarEventKind, Priority, ResourceBlock, TimeWindow,
};

/// Conflict severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single conflict the engine detected against a requested window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedConflict {
    /// Overlap with a committed block on the property calendar
    Block(ResourceBlock),
    /// Overlap with a soft calendar entry (meeting, inspection, ...)
    Calendar(CalendarEvent),
}

impl DetectedConflict {
    /// Direct overlap with another reservation's booking block.
    pub fn is_reservation_overlap(&self) -> bool {
        matches!(self, DetectedConflict::Block(block) if block.kind == BlockKind::Booking)
    }

    pub fn severity(&self) -> ConflictSeverity {
        match self {
            DetectedConflict::Block(block) => {
                let base = match block.priority {
                    Priority::Low => ConflictSeverity::Low,
                    Priority::Medium => ConflictSeverity::Medium,
                    Priority::High => ConflictSeverity::High,
                    Priority::Critical => ConflictSeverity::Critical,
                };
                if block.kind == BlockKind::Booking {
                    base.max(ConflictSeverity::High)
                } else {
                    base
                }
            }
            DetectedConflict::Calendar(event) => match event.kind {
                CalendarEventKind::Meeting | CalendarEventKind::Other => ConflictSeverity::Low,
                CalendarEventKind::Inspection => ConflictSeverity::Medium,
                CalendarEventKind::Maintenance | CalendarEventKind::OwnerVisit => {
                    ConflictSeverity::Medium
                }
            },
        }
    }

    /// Whether this single conflict could be resolved without an operator.
    fn auto_resolvable(&self) -> bool {
        match self {
            // Buffer blocks are soft turnover padding
            DetectedConflict::Block(block) => block.kind == BlockKind::Buffer,
            DetectedConflict::Calendar(event) => matches!(
                event.kind,
                CalendarEventKind::Meeting | CalendarEventKind::Inspection | CalendarEventKind::Other
            ),
        }
    }

    fn describe(&self) -> String {
        match self {
            DetectedConflict::Block(block) => {
                format!("{:?} block {} over {}", block.kind, block.id, block.window)
            }
            DetectedConflict::Calendar(event) => {
                format!("{:?} event {} over {}", event.kind, event.id, event.window)
            }
        }
    }
}

/// Action the coordinator should take, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Move a resolvable calendar event out of the requested window
    RescheduleEvent { event_id: String, reason: String },
    /// Tell the staff attached to a rescheduled event
    NotifyAssignedStaff { event_id: String },
    /// Accept the reservation
    ProceedWithBooking,
    /// Park the reservation for manual review
    EscalateToOperator { reason: String },
    /// Include alternative dates in the guest-facing response
    OfferAlternativeDates,
}

/// Resolver verdict for one requested window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub severity: ConflictSeverity,
    pub can_auto_resolve: bool,
    pub reasoning: String,
    pub suggested_actions: Vec<SuggestedAction>,
}

/// Classify `conflicts` against `window` and produce an action plan.
pub fn resolve(window: TimeWindow, conflicts: &[DetectedConflict]) -> ConflictResolution {
    if conflicts.is_empty() {
        return ConflictResolution {
            severity: ConflictSeverity::Low,
            can_auto_resolve: true,
            reasoning: "no conflicts detected".to_string(),
            suggested_actions: vec![SuggestedAction::ProceedWithBooking],
        };
    }

    let severity = conflicts
        .iter()
        .map(DetectedConflict::severity)
        .max()
        .unwrap_or(ConflictSeverity::Low);

    let has_reservation_overlap = conflicts.iter().any(DetectedConflict::is_reservation_overlap);
    // All-or-nothing: every conflict must be individually resolvable.
    let can_auto_resolve =
        !has_reservation_overlap && conflicts.iter().all(DetectedConflict::auto_resolvable);

    debug!(
        "⚖️ Resolved {} conflicts for {}: severity {:?}, auto_resolve {}",
        conflicts.len(),
        window,
        severity,
        can_auto_resolve
    );

    if can_auto_resolve {
        let mut actions = Vec::new();
        for conflict in conflicts {
            if let DetectedConflict::Calendar(event) = conflict {
                actions.push(SuggestedAction::RescheduleEvent {
                    event_id: event.id.clone(),
                    reason: format!("clears requested window {}", window),
                });
                actions.push(SuggestedAction::NotifyAssignedStaff {
                    event_id: event.id.clone(),
                });
            }
        }
        actions.push(SuggestedAction::ProceedWithBooking);

        ConflictResolution {
            severity,
            can_auto_resolve: true,
            reasoning: format!(
                "{} low-priority conflict(s) can be rescheduled automatically",
                conflicts.len()
            ),
            suggested_actions: actions,
        }
    } else {
        let reasoning = if has_reservation_overlap {
            "requested window overlaps an existing confirmed booking".to_string()
        } else {
            let blocker = conflicts
                .iter()
                .find(|c| !c.auto_resolvable())
                .map(DetectedConflict::describe)
                .unwrap_or_else(|| "unresolvable conflict".to_string());
            format!("conflict set contains a non-resolvable entry: {}", blocker)
        };

        ConflictResolution {
            severity,
            can_auto_resolve: false,
            reasoning,
            suggested_actions: vec![
                SuggestedAction::EscalateToOperator {
                    reason: "conflicting allocations require manual review".to_string(),
                },
                SuggestedAction::OfferAlternativeDates,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PropertyId, ReservationId, ResourceBlock};
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 5, 10, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 14, 11, 0, 0).unwrap(),
        )
    }

    fn event(kind: CalendarEventKind) -> DetectedConflict {
        DetectedConflict::Calendar(CalendarEvent {
            id: format!("evt-{:?}", kind),
            property_id: PropertyId::from("villa-1"),
            kind,
            window: window(),
            title: "scheduled".to_string(),
        })
    }

    fn booking_overlap() -> DetectedConflict {
        DetectedConflict::Block(ResourceBlock::booking(
            PropertyId::from("villa-1"),
            window(),
            ReservationId::new(),
        ))
    }

    #[test]
    fn empty_set_proceeds() {
        let resolution = resolve(window(), &[]);
        assert!(resolution.can_auto_resolve);
        assert!(matches!(
            resolution.suggested_actions.as_slice(),
            [SuggestedAction::ProceedWithBooking]
        ));
    }

    #[test]
    fn allow_listed_events_auto_resolve() {
        let conflicts = vec![event(CalendarEventKind::Meeting), event(CalendarEventKind::Other)];
        let resolution = resolve(window(), &conflicts);
        assert!(resolution.can_auto_resolve);
        // reschedule + notify per event, then proceed
        assert_eq!(resolution.suggested_actions.len(), 5);
        assert!(matches!(
            resolution.suggested_actions.last(),
            Some(SuggestedAction::ProceedWithBooking)
        ));
    }

    #[test]
    fn one_blocked_event_blocks_the_whole_set() {
        let conflicts = vec![
            event(CalendarEventKind::Meeting),
            event(CalendarEventKind::Inspection),
            event(CalendarEventKind::OwnerVisit),
        ];
        let resolution = resolve(window(), &conflicts);
        assert!(!resolution.can_auto_resolve);
    }

    #[test]
    fn reservation_overlap_is_never_auto_resolvable() {
        let conflicts = vec![
            event(CalendarEventKind::Meeting),
            event(CalendarEventKind::Inspection),
            booking_overlap(),
        ];
        let resolution = resolve(window(), &conflicts);
        assert!(!resolution.can_auto_resolve);
        assert!(resolution.severity >= ConflictSeverity::High);
        assert!(matches!(
            resolution.suggested_actions.first(),
            Some(SuggestedAction::EscalateToOperator { .. })
        ));
    }

    #[test]
    fn severity_is_the_maximum_of_the_set() {
        let conflicts = vec![event(CalendarEventKind::Meeting)];
        assert_eq!(resolve(window(), &conflicts).severity, ConflictSeverity::Low);

        let conflicts = vec![event(CalendarEventKind::Meeting), event(CalendarEventKind::Inspection)];
        assert_eq!(resolve(window(), &conflicts).severity, ConflictSeverity::Medium);
    }

    #[test]
    fn critical_manual_block_escalates_with_critical_severity() {
        let block = ResourceBlock::manual(
            PropertyId::from("villa-1"),
            window(),
            crate::types::BlockKind::Maintenance,
            crate::types::Priority::Critical,
            "ops",
        );
        let resolution = resolve(window(), &[DetectedConflict::Block(block)]);
        assert_eq!(resolution.severity, ConflictSeverity::Critical);
        assert!(!resolution.can_auto_resolve);
    }
}
