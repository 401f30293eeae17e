use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::conflict::{find_conflicts, suggest_alternatives};
use crate::types::{BlockKind, Property, ReservationRequest, ResourceBlock};

/// Tunable limits for validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Furthest a check-in may lie in the future, in days
    pub max_advance_days: i64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { max_advance_days: 365 }
    }
}

/// Machine-readable failure codes, one per check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorCode {
    MissingField,
    InvalidContact,
    InvalidGuestCount,
    InvalidAmount,
    InvalidDates,
    StartInPast,
    UnknownProperty,
    CapacityExceeded,
    MinimumStay,
    DoubleBooked,
    TooFarInAdvance,
    SystemError,
}

/// A failed validation with a human-readable reason and structured details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub code: ValidationErrorCode,
    pub reason: String,
    pub details: serde_json::Value,
}

impl ValidationFailure {
    fn new(code: ValidationErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            details: json!({}),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Validation verdict for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(failure) => Some(failure),
        }
    }
}

/// Everything validation needs to know about the world
///
/// The coordinator gathers this snapshot; the engine itself stays
/// stateless and performs no I/O.
#[derive(Debug)]
pub struct ValidationContext<'a> {
    /// Evaluation instant for past-date and advance-window checks
    pub now: DateTime<Utc>,
    /// The requested property, if the directory knows it
    pub property: Option<&'a Property>,
    /// All blocks on that property's calendar (any status)
    pub existing_blocks: &'a [ResourceBlock],
}

/// Ordered business-rule evaluation over a single reservation request
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    rules: ValidationRules,
}

impl ValidationEngine {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Validate `request`, short-circuiting on the first failed check.
    ///
    /// Never panics past this boundary: an internal fault is reported as
    /// its own failure reason so the pipeline stays live.
    pub fn validate(&self, request: &ReservationRequest, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        match catch_unwind(AssertUnwindSafe(|| self.run_checks(request, ctx))) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("🚨 Validation panicked for reservation {}", request.id);
                ValidationOutcome::Invalid(ValidationFailure::new(
                    ValidationErrorCode::SystemError,
                    "validation system error",
                ))
            }
        }
    }

    fn run_checks(&self, request: &ReservationRequest, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        // 1. Required fields and contact format
        if let Some(failure) = check_required_fields(request) {
            return ValidationOutcome::Invalid(failure);
        }

        // 2. Positivity of occupancy and amount
        if request.guest_count == 0 {
            return ValidationOutcome::Invalid(ValidationFailure::new(
                ValidationErrorCode::InvalidGuestCount,
                "guest count must be positive",
            ));
        }
        if !(request.total_amount > 0.0) {
            return ValidationOutcome::Invalid(ValidationFailure::new(
                ValidationErrorCode::InvalidAmount,
                "total amount must be positive",
            ));
        }

        // 3. Date sanity
        if request.check_out <= request.check_in {
            return ValidationOutcome::Invalid(ValidationFailure::new(
                ValidationErrorCode::InvalidDates,
                "check-out must be after check-in",
            ));
        }
        if request.check_in < ctx.now {
            return ValidationOutcome::Invalid(ValidationFailure::new(
                ValidationErrorCode::StartInPast,
                "check-in date is in the past",
            ));
        }

        // 4. Property existence and capacity
        let property = match ctx.property {
            Some(property) if property.active => property,
            Some(_) => {
                return ValidationOutcome::Invalid(ValidationFailure::new(
                    ValidationErrorCode::UnknownProperty,
                    "property is not accepting reservations",
                ));
            }
            None => {
                return ValidationOutcome::Invalid(ValidationFailure::new(
                    ValidationErrorCode::UnknownProperty,
                    "unknown property",
                ));
            }
        };

        if request.guest_count > property.max_guests {
            return ValidationOutcome::Invalid(
                ValidationFailure::new(ValidationErrorCode::CapacityExceeded, "capacity exceeded")
                    .with_details(json!({
                        "requested": request.guest_count,
                        "max_guests": property.max_guests,
                    })),
            );
        }

        let window = request.window();
        let nights = window.nights();
        if nights < property.min_stay_nights {
            return ValidationOutcome::Invalid(
                ValidationFailure::new(
                    ValidationErrorCode::MinimumStay,
                    "stay is shorter than the property minimum",
                )
                .with_details(json!({
                    "nights": nights,
                    "min_stay_nights": property.min_stay_nights,
                })),
            );
        }

        // 5. Double-booking check against active, non-buffer blocks
        let conflicts = find_conflicts(ctx.existing_blocks, window, &[BlockKind::Buffer]);
        if !conflicts.is_empty() {
            let alternatives = suggest_alternatives(ctx.existing_blocks, window);
            debug!(
                "📋 Reservation {} conflicts with {} block(s)",
                request.id,
                conflicts.len()
            );
            return ValidationOutcome::Invalid(
                ValidationFailure::new(
                    ValidationErrorCode::DoubleBooked,
                    "conflicts with existing confirmed booking",
                )
                .with_details(json!({
                    "conflicting_block_ids": conflicts.iter().map(|b| b.id.clone()).collect::<Vec<_>>(),
                    "alternatives": alternatives,
                })),
            );
        }

        // 6. Advance-booking window
        let advance_days = (request.check_in - ctx.now).num_days();
        if advance_days > self.rules.max_advance_days {
            return ValidationOutcome::Invalid(
                ValidationFailure::new(
                    ValidationErrorCode::TooFarInAdvance,
                    "check-in is too far in advance",
                )
                .with_details(json!({
                    "advance_days": advance_days,
                    "max_advance_days": self.rules.max_advance_days,
                })),
            );
        }

        ValidationOutcome::Valid
    }
}

fn check_required_fields(request: &ReservationRequest) -> Option<ValidationFailure> {
    let missing = |field: &str| {
        Some(
            ValidationFailure::new(
                ValidationErrorCode::MissingField,
                format!("missing required field: {}", field),
            )
            .with_details(json!({ "field": field })),
        )
    };

    if request.id.as_str().trim().is_empty() {
        return missing("id");
    }
    if request.property_id.as_str().trim().is_empty() {
        return missing("property_id");
    }
    if request.guest_name.trim().is_empty() {
        return missing("guest_name");
    }
    if request.guest_email.trim().is_empty() {
        return missing("guest_email");
    }

    // Cheap shape check only; deliverability is the notifier's problem
    let email = request.guest_email.trim();
    let valid_shape = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid_shape {
        return Some(ValidationFailure::new(
            ValidationErrorCode::InvalidContact,
            "guest contact email is not valid",
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PropertyId, ReservationId, ResourceBlock, TimeWindow};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn property() -> Property {
        Property {
            id: PropertyId::from("villa-1"),
            name: "Seaside Villa".to_string(),
            max_guests: 2,
            min_stay_nights: 2,
            active: true,
        }
    }

    fn request() -> ReservationRequest {
        ReservationRequest::new(
            PropertyId::from("villa-1"),
            "Ada Lovelace",
            "ada@example.com",
            now() + Duration::days(3),
            now() + Duration::days(6),
            2,
            600.0,
        )
    }

    fn ctx<'a>(property: Option<&'a Property>, blocks: &'a [ResourceBlock]) -> ValidationContext<'a> {
        ValidationContext {
            now: now(),
            property,
            existing_blocks: blocks,
        }
    }

    #[test]
    fn valid_request_passes() {
        let property = property();
        let outcome = ValidationEngine::default().validate(&request(), &ctx(Some(&property), &[]));
        assert!(outcome.is_valid());
    }

    #[test]
    fn missing_field_reported_before_past_date() {
        // Both defects present; the field check must win.
        let mut bad = request();
        bad.guest_name = String::new();
        bad.check_in = now() - Duration::days(5);
        bad.check_out = now() - Duration::days(2);

        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        let failure = outcome.failure().expect("must fail");
        assert_eq!(failure.code, ValidationErrorCode::MissingField);
        assert_eq!(failure.details["field"], "guest_name");
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut bad = request();
        bad.guest_email = "not-an-email".to_string();
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::InvalidContact);
    }

    #[test]
    fn zero_guests_rejected_before_date_checks() {
        let mut bad = request();
        bad.guest_count = 0;
        bad.check_in = now() - Duration::days(1);
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::InvalidGuestCount);
    }

    #[test]
    fn inverted_dates_rejected() {
        let mut bad = request();
        std::mem::swap(&mut bad.check_in, &mut bad.check_out);
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::InvalidDates);
    }

    #[test]
    fn past_check_in_rejected() {
        let mut bad = request();
        bad.check_in = now() - Duration::days(2);
        bad.check_out = now() + Duration::days(1);
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::StartInPast);
    }

    #[test]
    fn unknown_property_rejected() {
        let outcome = ValidationEngine::default().validate(&request(), &ctx(None, &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::UnknownProperty);
    }

    #[test]
    fn capacity_exceeded_rejected() {
        let mut bad = request();
        bad.guest_count = 4;
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.code, ValidationErrorCode::CapacityExceeded);
        assert_eq!(failure.reason, "capacity exceeded");
    }

    #[test]
    fn short_stay_rejected() {
        let mut bad = request();
        bad.check_out = bad.check_in + Duration::hours(20);
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::MinimumStay);
    }

    #[test]
    fn overlapping_booking_rejected_with_alternatives() {
        let good = request();
        let block = ResourceBlock::booking(
            PropertyId::from("villa-1"),
            TimeWindow::new(good.check_in - Duration::days(1), good.check_in + Duration::days(1)),
            ReservationId::new(),
        );
        let blocks = vec![block];
        let property = property();
        let outcome = ValidationEngine::default().validate(&good, &ctx(Some(&property), &blocks));
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.code, ValidationErrorCode::DoubleBooked);
        assert_eq!(failure.reason, "conflicts with existing confirmed booking");
        assert!(failure.details["alternatives"].as_array().is_some());
    }

    #[test]
    fn buffer_blocks_do_not_reject() {
        let good = request();
        let buffer = ResourceBlock::buffer(
            PropertyId::from("villa-1"),
            good.window(),
            ReservationId::new(),
        );
        let blocks = vec![buffer];
        let property = property();
        let outcome = ValidationEngine::default().validate(&good, &ctx(Some(&property), &blocks));
        assert!(outcome.is_valid());
    }

    #[test]
    fn far_future_check_in_rejected() {
        let mut bad = request();
        bad.check_in = now() + Duration::days(400);
        bad.check_out = bad.check_in + Duration::days(3);
        let property = property();
        let outcome = ValidationEngine::default().validate(&bad, &ctx(Some(&property), &[]));
        assert_eq!(outcome.failure().unwrap().code, ValidationErrorCode::TooFarInAdvance);
    }

    #[test]
    fn one_year_exactly_is_allowed() {
        let mut edge = request();
        edge.check_in = now() + Duration::days(365);
        edge.check_out = edge.check_in + Duration::days(3);
        let property = property();
        let outcome = ValidationEngine::default().validate(&edge, &ctx(Some(&property), &[]));
        assert!(outcome.is_valid());
    }
}
