//! Core entity types for the booking pipeline
//!
//! These are the logical records exchanged between the validation,
//! conflict, queueing, and allocation layers. Persistence of these
//! records is owned by external collaborators; this crate only defines
//! their shape and the small amount of behavior that belongs to them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

/// Property (bookable resource) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

/// Work item identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItemId(pub String);

/// Staff member identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaffId(pub String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

impl_id!(ReservationId);
impl_id!(PropertyId);
impl_id!(WorkItemId);
impl_id!(StaffId);

/// Half-open time interval `[start, end)`
///
/// Two windows overlap iff `start_a < end_b && end_a > start_b`;
/// touching endpoints never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap test; `[10, 20)` and `[20, 30)` do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Number of nights this window spans, whole days rounded up.
    pub fn nights(&self) -> i64 {
        let seconds = self.duration().num_seconds();
        if seconds <= 0 {
            return 0;
        }
        (seconds + 86_399) / 86_400
    }

    /// Same-duration window shifted by a signed number of days.
    pub fn shifted_days(&self, days: i64) -> TimeWindow {
        let delta = Duration::days(days);
        TimeWindow {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Window widened by `pad` on both ends, for soft-overlap checks.
    pub fn padded(&self, pad: Duration) -> TimeWindow {
        TimeWindow {
            start: self.start - pad,
            end: self.end + pad,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Awaiting pipeline processing
    Pending,
    /// Accepted; blocks committed and jobs derived
    Confirmed,
    /// Business-rule rejection, terminal
    Rejected,
    /// Infrastructure failure after retry budget exhaustion, terminal
    Error,
    /// Parked for an operator; unresolvable conflicts
    PendingManualReview,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Error => "error",
            ReservationStatus::PendingManualReview => "pending_manual_review",
        }
    }

    /// Terminal statuses never re-enter the pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Confirmed | ReservationStatus::Rejected | ReservationStatus::Error
        )
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "rejected" => Ok(ReservationStatus::Rejected),
            "error" => Ok(ReservationStatus::Error),
            "pending_manual_review" => Ok(ReservationStatus::PendingManualReview),
            _ => Err(format!("Unknown reservation status: {}", s)),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An incoming reservation request
///
/// The typed fields are the known intake schema; anything else the
/// intake collaborator sends rides along in `extensions` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub id: ReservationId,
    pub property_id: PropertyId,
    pub guest_name: String,
    pub guest_email: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guest_count: u32,
    pub total_amount: f64,
    pub status: ReservationStatus,
    /// Infrastructure retry attempts consumed so far
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Unknown intake fields, preserved verbatim
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

impl ReservationRequest {
    pub fn new(
        property_id: PropertyId,
        guest_name: impl Into<String>,
        guest_email: impl Into<String>,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        guest_count: u32,
        total_amount: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReservationId::new(),
            property_id,
            guest_name: guest_name.into(),
            guest_email: guest_email.into(),
            check_in,
            check_out,
            guest_count,
            total_amount,
            status: ReservationStatus::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            extensions: HashMap::new(),
        }
    }

    /// The stay interval as a half-open window.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.check_in, self.check_out)
    }
}

/// A bookable property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub max_guests: u32,
    pub min_stay_nights: i64,
    pub active: bool,
}

/// Block kind on a property calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Booking,
    Maintenance,
    OwnerUse,
    Manual,
    /// Turnover padding after a booking; soft, auto-resolvable
    Buffer,
}

/// Block lifecycle status; blocks are never deleted, only transitioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Active,
    Cancelled,
    Completed,
}

/// Priority scale shared by blocks and work items
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Where a block came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSource {
    Reservation(ReservationId),
    Manual(String),
}

/// A committed time-interval allocation against a property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceBlock {
    pub id: String,
    pub property_id: PropertyId,
    pub window: TimeWindow,
    pub kind: BlockKind,
    pub status: BlockStatus,
    pub source: BlockSource,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl ResourceBlock {
    /// Booking block for an accepted reservation.
    pub fn booking(property_id: PropertyId, window: TimeWindow, reservation: ReservationId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            property_id,
            window,
            kind: BlockKind::Booking,
            status: BlockStatus::Active,
            source: BlockSource::Reservation(reservation),
            priority: Priority::High,
            created_at: Utc::now(),
        }
    }

    /// Turnover buffer appended after a booking's check-out.
    pub fn buffer(property_id: PropertyId, window: TimeWindow, reservation: ReservationId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            property_id,
            window,
            kind: BlockKind::Buffer,
            status: BlockStatus::Active,
            source: BlockSource::Reservation(reservation),
            priority: Priority::Low,
            created_at: Utc::now(),
        }
    }

    /// Manually entered block (owner hold, maintenance window, ...).
    pub fn manual(
        property_id: PropertyId,
        window: TimeWindow,
        kind: BlockKind,
        priority: Priority,
        entered_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            property_id,
            window,
            kind,
            status: BlockStatus::Active,
            source: BlockSource::Manual(entered_by.into()),
            priority,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BlockStatus::Active
    }

    pub fn is_buffer(&self) -> bool {
        self.kind == BlockKind::Buffer
    }
}

/// Operational job types derived from an accepted reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Cleaning,
    Inspection,
    Maintenance,
    CheckInPrep,
    CheckOutService,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Cleaning => "cleaning",
            JobType::Inspection => "inspection",
            JobType::Maintenance => "maintenance",
            JobType::CheckInPrep => "check_in_prep",
            JobType::CheckOutService => "check_out_service",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Work item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

/// Why a work item could not be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedCause {
    /// No staff member carries any of the required capabilities
    NoCapabilityMatch,
    /// Capable staff exist but every one is time-conflicted
    AllTimeConflicted,
    /// Nobody in the pool is marked available right now
    NoneAvailable,
}

/// A derived unit of labor requiring a staff assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub job_type: JobType,
    pub property_id: PropertyId,
    pub reservation_id: ReservationId,
    pub scheduled_at: DateTime<Utc>,
    pub estimated_minutes: u32,
    pub priority: Priority,
    pub required_capabilities: Vec<String>,
    pub assigned_to: Option<StaffId>,
    pub status: WorkItemStatus,
    pub unassigned_cause: Option<UnassignedCause>,
    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    /// The execution window implied by the schedule and estimate.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(
            self.scheduled_at,
            self.scheduled_at + Duration::minutes(self.estimated_minutes as i64),
        )
    }

    /// Items in these states hold their staff member's time.
    pub fn occupies_staff(&self) -> bool {
        matches!(self.status, WorkItemStatus::Assigned | WorkItemStatus::InProgress)
    }
}

/// Staff availability state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffAvailability {
    Available,
    Busy,
    Unavailable,
}

/// Daily working window plus applicable weekdays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    /// First working hour of the day, inclusive (0-23)
    pub start_hour: u32,
    /// Last working hour of the day, exclusive (1-24)
    pub end_hour: u32,
    pub weekdays: Vec<Weekday>,
}

impl WorkingHours {
    /// True if `at` falls on a working weekday inside the daily window.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.weekdays.contains(&at.weekday())
            && at.hour() >= self.start_hour
            && at.hour() < self.end_hour
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
            weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

/// Historical performance summary for a staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Fraction of assigned jobs completed, 0.0-1.0
    pub completion_rate: f64,
    /// Average guest/operator rating, 0.0-5.0
    pub average_rating: f64,
    /// Fraction of jobs finished on schedule, 0.0-1.0
    pub on_time_rate: f64,
    pub completed_total: u64,
    pub completed_by_type: HashMap<JobType, u64>,
}

impl PerformanceSummary {
    pub fn has_history(&self) -> bool {
        self.completed_total > 0
    }

    pub fn completed_for(&self, job_type: JobType) -> u64 {
        self.completed_by_type.get(&job_type).copied().unwrap_or(0)
    }
}

impl Default for PerformanceSummary {
    fn default() -> Self {
        Self {
            completion_rate: 0.0,
            average_rating: 0.0,
            on_time_rate: 0.0,
            completed_total: 0,
            completed_by_type: HashMap::new(),
        }
    }
}

/// A schedulable staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub display_name: String,
    pub capabilities: Vec<String>,
    pub availability: StaffAvailability,
    pub working_hours: WorkingHours,
    pub performance: PerformanceSummary,
}

/// Per-candidate scoring record produced by the allocator
///
/// Derived, not a source of truth; the full ranked list is kept in the
/// assignment audit record for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub staff_id: StaffId,
    pub total: f64,
    pub skill_match: f64,
    pub performance: f64,
    pub workload: f64,
    pub experience: f64,
    pub matched_capabilities: Vec<String>,
    pub current_load: usize,
    pub history_for_type: u64,
}

/// Soft calendar entries the resolver weighs against a requested window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub property_id: PropertyId,
    pub kind: CalendarEventKind,
    pub window: TimeWindow,
    pub title: String,
}

/// Calendar event subtype; drives the auto-resolution allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEventKind {
    Meeting,
    Inspection,
    Maintenance,
    OwnerVisit,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(start_h: u32, end_h: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 3, 10, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 10, end_h, 0, 0).unwrap(),
        )
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        assert!(!window(10, 20).overlaps(&window(20, 23)));
        assert!(!window(20, 23).overlaps(&window(10, 20)));
    }

    #[test]
    fn contained_window_overlaps() {
        assert!(window(10, 20).overlaps(&window(12, 14)));
        assert!(window(12, 14).overlaps(&window(10, 20)));
    }

    #[test]
    fn nights_round_up_partial_days() {
        let w = TimeWindow::new(
            Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 13, 11, 0, 0).unwrap(),
        );
        // 2 days 20 hours rounds up to 3 nights
        assert_eq!(w.nights(), 3);
    }

    #[test]
    fn working_hours_cover_weekday_window() {
        let hours = WorkingHours::default();
        // 2026-03-10 is a Tuesday
        let tuesday_morning = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();
        let tuesday_night = Utc.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap();
        let saturday = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        assert!(hours.covers(tuesday_morning));
        assert!(!hours.covers(tuesday_night));
        assert!(!hours.covers(saturday));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Rejected,
            ReservationStatus::Error,
            ReservationStatus::PendingManualReview,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn extension_fields_survive_serde() {
        let mut request = ReservationRequest::new(
            PropertyId::from("prop-1"),
            "Ada Lovelace",
            "ada@example.com",
            Utc.with_ymd_and_hms(2026, 4, 1, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 4, 4, 11, 0, 0).unwrap(),
            2,
            450.0,
        );
        request
            .extensions
            .insert("channel".to_string(), serde_json::json!("partner-api"));

        let raw = serde_json::to_string(&request).unwrap();
        let back: ReservationRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.extensions.get("channel").unwrap(), "partner-api");
    }
}
