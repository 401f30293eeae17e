use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use tracing::{debug, info, warn};

use stayline_reservation_core::types::ReservationId;

use crate::error::{BookingEngineError, Result};

/// Pending reservation queue with a per-identity in-flight guard
///
/// The guard is the idempotence mechanism for duplicate change-feed
/// deliveries: while an id is marked in-flight, further enqueues of the
/// same id are silent no-ops. The guard lives only in memory, so a
/// restart naturally resets it.
pub struct ReservationQueue {
    /// Waiting entries, highest priority (lowest number) first
    entries: VecDeque<QueuedReservation>,
    /// Reservations currently being processed (id -> marked-at)
    in_flight: HashMap<ReservationId, Instant>,
    max_size: usize,
    max_wait_secs: u64,
}

/// One queued reservation
#[derive(Debug, Clone)]
pub struct QueuedReservation {
    pub reservation_id: ReservationId,
    /// 0 = highest, 255 = lowest
    pub priority: u8,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
    /// Infrastructure retries consumed so far
    pub retry_count: u32,
}

impl QueuedReservation {
    pub fn new(reservation_id: ReservationId, priority: u8) -> Self {
        Self {
            reservation_id,
            priority,
            enqueued_at: chrono::Utc::now(),
            retry_count: 0,
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    pub depth: usize,
    pub in_flight: usize,
    pub average_wait_secs: u64,
    pub longest_wait_secs: u64,
}

impl ReservationQueue {
    pub fn new(max_size: usize, max_wait_secs: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            in_flight: HashMap::new(),
            max_size,
            max_wait_secs,
        }
    }

    /// Check if a reservation is already waiting
    pub fn is_queued(&self, id: &ReservationId) -> bool {
        self.entries.iter().any(|entry| &entry.reservation_id == id)
    }

    /// Check if a reservation is currently being processed
    pub fn is_in_flight(&self, id: &ReservationId) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Enqueue a reservation
    ///
    /// Returns the insert position, or `None` when the call was an
    /// idempotent no-op (already queued or in flight). Fails only when
    /// the queue is full.
    pub fn enqueue(&mut self, entry: QueuedReservation) -> Result<Option<usize>> {
        if self.is_queued(&entry.reservation_id) {
            warn!(
                "📥 Reservation {} already queued, not re-queuing",
                entry.reservation_id
            );
            return Ok(None);
        }

        if self.is_in_flight(&entry.reservation_id) {
            warn!(
                "📥 Reservation {} is in flight, not re-queuing",
                entry.reservation_id
            );
            return Ok(None);
        }

        if self.entries.len() >= self.max_size {
            return Err(BookingEngineError::queue("Queue is full"));
        }

        info!(
            "📥 Enqueuing reservation {} (priority: {}, retry: {})",
            entry.reservation_id, entry.priority, entry.retry_count
        );

        // Insert based on priority (lower number = front of queue)
        let insert_position = self
            .entries
            .iter()
            .position(|existing| existing.priority > entry.priority)
            .unwrap_or(self.entries.len());

        self.entries.insert(insert_position, entry);

        debug!("📊 Queue depth: {}", self.entries.len());
        Ok(Some(insert_position))
    }

    /// Take up to `limit` entries for processing, marking each in-flight
    pub fn dequeue_batch(&mut self, limit: usize) -> Vec<QueuedReservation> {
        let mut batch = Vec::new();
        while batch.len() < limit {
            let Some(entry) = self.entries.pop_front() else {
                break;
            };
            debug!(
                "📤 Dequeued reservation {} (remaining: {})",
                entry.reservation_id,
                self.entries.len()
            );
            self.in_flight
                .insert(entry.reservation_id.clone(), Instant::now());
            batch.push(entry);
        }
        batch
    }

    /// Release the in-flight guard for a reservation
    ///
    /// Called on every exit path of a processing pass: success, business
    /// rejection, retry re-enqueue, and exhausted retries.
    pub fn release(&mut self, id: &ReservationId) {
        if self.in_flight.remove(id).is_some() {
            debug!("🔓 Released in-flight guard for {}", id);
        }
    }

    /// Drop queued reservations that waited longer than the limit
    pub fn remove_expired(&mut self) -> Vec<ReservationId> {
        let now = chrono::Utc::now();
        let max_wait = self.max_wait_secs as i64;
        let mut expired = Vec::new();

        self.entries.retain(|entry| {
            let waited = now.signed_duration_since(entry.enqueued_at).num_seconds();
            if waited > max_wait {
                warn!(
                    "⏰ Expiring reservation {} after {}s in queue",
                    entry.reservation_id, waited
                );
                expired.push(entry.reservation_id.clone());
                false
            } else {
                true
            }
        });

        expired
    }

    /// Clear in-flight marks older than `max_age_secs`
    ///
    /// A worker that died mid-pass leaves its mark behind; clearing it
    /// lets a later change-feed delivery reprocess the reservation.
    pub fn cleanup_stuck_in_flight(&mut self, max_age_secs: u64) -> Vec<ReservationId> {
        let max_age = std::time::Duration::from_secs(max_age_secs);
        let mut stuck = Vec::new();
        self.in_flight.retain(|id, marked_at| {
            if marked_at.elapsed() > max_age {
                warn!("🧹 Clearing stuck in-flight mark for {}", id);
                stuck.push(id.clone());
                false
            } else {
                true
            }
        });
        stuck
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Queue statistics
    pub fn stats(&self) -> QueueStats {
        let now = chrono::Utc::now();
        let (average_wait_secs, longest_wait_secs) = if self.entries.is_empty() {
            (0, 0)
        } else {
            let waits: Vec<i64> = self
                .entries
                .iter()
                .map(|entry| now.signed_duration_since(entry.enqueued_at).num_seconds().max(0))
                .collect();
            let total: i64 = waits.iter().sum();
            let average = total / waits.len() as i64;
            let longest = waits.iter().max().copied().unwrap_or(0);
            (average as u64, longest as u64)
        };

        QueueStats {
            depth: self.entries.len(),
            in_flight: self.in_flight.len(),
            average_wait_secs,
            longest_wait_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(label: &str) -> ReservationId {
        ReservationId::from(label)
    }

    #[test]
    fn enqueue_orders_by_priority() {
        let mut queue = ReservationQueue::new(10, 3_600);
        queue.enqueue(QueuedReservation::new(id("low"), 100)).unwrap();
        queue.enqueue(QueuedReservation::new(id("high"), 0)).unwrap();
        queue.enqueue(QueuedReservation::new(id("mid"), 50)).unwrap();

        let batch = queue.dequeue_batch(3);
        let order: Vec<&str> = batch.iter().map(|e| e.reservation_id.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn duplicate_enqueue_is_a_no_op() {
        let mut queue = ReservationQueue::new(10, 3_600);
        assert!(queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap().is_some());
        assert!(queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn in_flight_guard_blocks_re_enqueue_until_release() {
        let mut queue = ReservationQueue::new(10, 3_600);
        queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap();

        let batch = queue.dequeue_batch(1);
        assert_eq!(batch.len(), 1);
        assert!(queue.is_in_flight(&id("r1")));

        // Duplicate delivery while processing: dropped
        assert!(queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap().is_none());
        assert_eq!(queue.len(), 0);

        // After release the id can be queued again (retry path)
        queue.release(&id("r1"));
        assert!(queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap().is_some());
    }

    #[test]
    fn full_queue_rejects() {
        let mut queue = ReservationQueue::new(1, 3_600);
        queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap();
        assert!(queue.enqueue(QueuedReservation::new(id("r2"), 50)).is_err());
    }

    #[test]
    fn expired_entries_are_swept() {
        let mut queue = ReservationQueue::new(10, 0);
        let mut entry = QueuedReservation::new(id("old"), 50);
        entry.enqueued_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        queue.enqueue(entry).unwrap();

        let expired = queue.remove_expired();
        assert_eq!(expired, vec![id("old")]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn stuck_in_flight_marks_are_cleared() {
        let mut queue = ReservationQueue::new(10, 3_600);
        queue.enqueue(QueuedReservation::new(id("r1"), 50)).unwrap();
        queue.dequeue_batch(1);

        assert!(queue.cleanup_stuck_in_flight(3_600).is_empty());
        let stuck = queue.cleanup_stuck_in_flight(0);
        assert_eq!(stuck, vec![id("r1")]);
        assert!(!queue.is_in_flight(&id("r1")));
    }
}
