//! Reservation assignment queue
//!
//! This module provides the pending-reservation queue with priority
//! ordering, the per-identity in-flight guard that makes enqueueing
//! idempotent, and expiry handling for requests nobody processed in
//! time.

pub mod manager;

pub use manager::{QueueStats, QueuedReservation, ReservationQueue};
