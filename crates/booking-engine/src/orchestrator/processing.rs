//! Per-reservation processing pipeline
//!
//! One pass takes a queued reservation from re-fetch through validation,
//! conflict resolution, block commit, and work item expansion. Business
//! rejections terminate here; only infrastructure faults bubble up to
//! the scheduler's retry handling in `core`.

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use stayline_reservation_core::conflict::resolver::{resolve, ConflictResolution, DetectedConflict};
use stayline_reservation_core::conflict::find_conflicts;
use stayline_reservation_core::types::{
    BlockKind, ReservationRequest, ReservationStatus, ResourceBlock, TimeWindow,
};
use stayline_reservation_core::validation::{
    ValidationContext, ValidationErrorCode, ValidationFailure, ValidationOutcome,
};

use crate::error::Result;
use crate::monitoring::BookingEvent;
use crate::orchestrator::core::BookingEngine;
use crate::orchestrator::types::ProcessOutcome;
use crate::queue::QueuedReservation;
use crate::store::BlockCommit;

impl BookingEngine {
    /// One full processing pass for a queued reservation
    pub(crate) async fn process_reservation(
        &self,
        entry: &QueuedReservation,
    ) -> Result<ProcessOutcome> {
        let id = &entry.reservation_id;

        // Re-fetch the persisted state right before acting: duplicate
        // change-feed deliveries must not double-process an identity
        // that already settled.
        let Some(current) = self.reservations.get(id).await? else {
            warn!("Reservation {} vanished before processing", id);
            return Ok(ProcessOutcome::Skipped { status: None });
        };
        if current.status != ReservationStatus::Pending {
            debug!("⏭️ Reservation {} already {}, skipping", id, current.status);
            return Ok(ProcessOutcome::Skipped {
                status: Some(current.status),
            });
        }

        self.metrics.incr_processed();
        info!("📋 Processing reservation {} for {}", id, current.property_id);

        let property = self.properties.get(&current.property_id).await?;
        let blocks = self.blocks.blocks_for(&current.property_id).await?;
        let ctx = ValidationContext {
            now: Utc::now(),
            property: property.as_ref(),
            existing_blocks: &blocks,
        };

        match self.validation.validate(&current, &ctx) {
            ValidationOutcome::Valid => self.settle_soft_conflicts(&current).await,
            ValidationOutcome::Invalid(failure)
                if failure.code == ValidationErrorCode::DoubleBooked =>
            {
                self.settle_window_conflicts(&current, &blocks, failure).await
            }
            ValidationOutcome::Invalid(failure) => self.reject(&current, failure).await,
        }
    }

    /// Validation passed; soft calendar entries may still demand an
    /// operator or an automatic reschedule before acceptance.
    async fn settle_soft_conflicts(&self, request: &ReservationRequest) -> Result<ProcessOutcome> {
        let events = self
            .calendar
            .events_overlapping(&request.property_id, request.window())
            .await?;
        if events.is_empty() {
            return self.accept(request).await;
        }

        let conflicts: Vec<DetectedConflict> =
            events.into_iter().map(DetectedConflict::Calendar).collect();
        let resolution = resolve(request.window(), &conflicts);

        if resolution.can_auto_resolve {
            info!(
                "🔧 Auto-resolving {} soft conflict(s) for reservation {}",
                conflicts.len(),
                request.id
            );
            self.events.emit(BookingEvent::ConflictsAutoResolved {
                reservation_id: request.id.clone(),
                suggested_actions: resolution.suggested_actions.clone(),
            });
            self.accept(request).await
        } else {
            self.escalate(request, resolution, conflicts).await
        }
    }

    /// Validation found the window blocked. Direct booking overlaps are
    /// terminal rejections; anything else goes through the resolver and
    /// either auto-resolves or parks for manual review.
    async fn settle_window_conflicts(
        &self,
        request: &ReservationRequest,
        blocks: &[ResourceBlock],
        failure: ValidationFailure,
    ) -> Result<ProcessOutcome> {
        let window = request.window();
        let mut conflicts: Vec<DetectedConflict> =
            find_conflicts(blocks, window, &[BlockKind::Buffer])
                .into_iter()
                .cloned()
                .map(DetectedConflict::Block)
                .collect();
        conflicts.extend(
            self.calendar
                .events_overlapping(&request.property_id, window)
                .await?
                .into_iter()
                .map(DetectedConflict::Calendar),
        );

        if conflicts.iter().any(DetectedConflict::is_reservation_overlap) {
            // Hard rule: double-booking is a rejection, never parked
            return self.reject(request, failure).await;
        }

        let resolution = resolve(window, &conflicts);
        if resolution.can_auto_resolve {
            info!(
                "🔧 Window conflicts for reservation {} are all soft, proceeding",
                request.id
            );
            self.events.emit(BookingEvent::ConflictsAutoResolved {
                reservation_id: request.id.clone(),
                suggested_actions: resolution.suggested_actions.clone(),
            });
            self.accept(request).await
        } else {
            self.escalate(request, resolution, conflicts).await
        }
    }

    async fn reject(
        &self,
        request: &ReservationRequest,
        failure: ValidationFailure,
    ) -> Result<ProcessOutcome> {
        info!("🚫 Reservation {} rejected: {}", request.id, failure.reason);
        self.reservations
            .set_status(
                &request.id,
                ReservationStatus::Rejected,
                Some(failure.reason.clone()),
            )
            .await?;
        self.events.emit(BookingEvent::StatusChanged {
            reservation_id: request.id.clone(),
            status: ReservationStatus::Rejected,
            reason: Some(failure.reason.clone()),
        });
        self.metrics.incr_rejected();
        Ok(ProcessOutcome::Rejected {
            reason: failure.reason,
            details: failure.details,
        })
    }

    async fn escalate(
        &self,
        request: &ReservationRequest,
        resolution: ConflictResolution,
        conflicts: Vec<DetectedConflict>,
    ) -> Result<ProcessOutcome> {
        warn!(
            "🚩 Reservation {} needs manual review: {}",
            request.id, resolution.reasoning
        );
        self.reservations
            .set_status(
                &request.id,
                ReservationStatus::PendingManualReview,
                Some(resolution.reasoning.clone()),
            )
            .await?;
        self.events.emit(BookingEvent::StatusChanged {
            reservation_id: request.id.clone(),
            status: ReservationStatus::PendingManualReview,
            reason: Some(resolution.reasoning.clone()),
        });
        self.events.emit(BookingEvent::EscalationRaised {
            reservation_id: request.id.clone(),
            severity: resolution.severity,
            reasoning: resolution.reasoning.clone(),
            conflicts,
            suggested_actions: resolution.suggested_actions.clone(),
        });
        self.metrics.incr_manual_reviews();
        Ok(ProcessOutcome::ManualReview { resolution })
    }

    /// Accept: commit the booking + buffer block pair (conditioned on a
    /// fresh conflict re-check), flip the status, expand work items.
    pub(crate) async fn accept(&self, request: &ReservationRequest) -> Result<ProcessOutcome> {
        let window = request.window();
        let booking =
            ResourceBlock::booking(request.property_id.clone(), window, request.id.clone());
        let buffer_window = TimeWindow::new(
            request.check_out,
            request.check_out + Duration::hours(self.config.general.turnover_buffer_hours),
        );
        let buffer = ResourceBlock::buffer(
            request.property_id.clone(),
            buffer_window,
            request.id.clone(),
        );
        let block_ids = vec![booking.id.clone(), buffer.id.clone()];

        match self.blocks.commit_if_free(booking, buffer).await? {
            BlockCommit::Conflicted(existing) => {
                // Lost a commit-time race against a concurrent acceptance
                let reason = "conflicts with existing confirmed booking".to_string();
                info!(
                    "🚫 Reservation {} lost the commit-time conflict check ({} block(s))",
                    request.id,
                    existing.len()
                );
                self.reservations
                    .set_status(&request.id, ReservationStatus::Rejected, Some(reason.clone()))
                    .await?;
                self.events.emit(BookingEvent::StatusChanged {
                    reservation_id: request.id.clone(),
                    status: ReservationStatus::Rejected,
                    reason: Some(reason.clone()),
                });
                self.metrics.incr_rejected();
                Ok(ProcessOutcome::Rejected {
                    reason,
                    details: json!({
                        "conflicting_block_ids":
                            existing.iter().map(|b| b.id.clone()).collect::<Vec<_>>(),
                    }),
                })
            }
            BlockCommit::Committed => {
                self.reservations
                    .set_status(&request.id, ReservationStatus::Confirmed, None)
                    .await?;
                self.events.emit(BookingEvent::StatusChanged {
                    reservation_id: request.id.clone(),
                    status: ReservationStatus::Confirmed,
                    reason: None,
                });
                self.events.emit(BookingEvent::BlocksCommitted {
                    reservation_id: request.id.clone(),
                    property_id: request.property_id.clone(),
                    block_ids: block_ids.clone(),
                });
                self.metrics.incr_confirmed();
                info!("✅ Reservation {} confirmed", request.id);

                let assignments = self.expand_work_items(request).await?;
                Ok(ProcessOutcome::Confirmed {
                    block_ids,
                    assignments,
                })
            }
        }
    }
}
