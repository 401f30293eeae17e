//! Monitoring and collaborator-facing events
//!
//! The pipeline is observed two ways: cheap atomic counters for
//! operational dashboards, and a broadcast stream of domain events that
//! external collaborators (calendar presentation, notification delivery,
//! financial reporting) subscribe to.

pub mod events;
pub mod metrics;

pub use events::{BookingEvent, EventBroadcaster};
pub use metrics::{MetricsCollector, MetricsSnapshot};
