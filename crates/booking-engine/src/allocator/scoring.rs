//! Weighted candidate scoring
//!
//! Deterministic heuristics, not a trained model. Each factor lands in
//! [0, 1]; the weighted sum therefore does too as long as the weights
//! sum to 1.

use stayline_reservation_core::types::{ScoreBreakdown, Staff, WorkItem};

use crate::config::AllocationConfig;

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Capability fit: matched / required, 1.0 when nothing is required.
pub fn skill_match_score(required: &[String], capabilities: &[String]) -> (f64, Vec<String>) {
    if required.is_empty() {
        return (1.0, Vec::new());
    }

    let matched: Vec<String> = required
        .iter()
        .filter(|needed| capabilities.contains(needed))
        .cloned()
        .collect();

    (matched.len() as f64 / required.len() as f64, matched)
}

/// Historical performance: completion, rating, and punctuality blended
/// 0.4/0.3/0.3, each term clamped. Candidates with no history get the
/// configured neutral default.
pub fn performance_score(staff: &Staff, default_performance: f64) -> f64 {
    let perf = &staff.performance;
    if !perf.has_history() {
        return default_performance;
    }

    0.4 * clamp01(perf.completion_rate)
        + 0.3 * clamp01(perf.average_rating / 5.0)
        + 0.3 * clamp01(perf.on_time_rate)
}

/// Load headroom: 1.0 when idle, 0.0 at or past capacity.
pub fn workload_score(current_assigned: usize, capacity: u32) -> f64 {
    (1.0 - current_assigned as f64 / capacity as f64).max(0.0)
}

/// Familiarity with this job type, saturating at the configured count.
pub fn experience_score(completed_for_type: u64, saturation: u64) -> f64 {
    (completed_for_type as f64 / saturation as f64).min(1.0)
}

/// Score one candidate for one work item.
pub fn score_candidate(
    staff: &Staff,
    item: &WorkItem,
    current_assigned: usize,
    config: &AllocationConfig,
) -> ScoreBreakdown {
    let (skill_match, matched_capabilities) =
        skill_match_score(&item.required_capabilities, &staff.capabilities);
    let performance = performance_score(staff, config.default_performance);
    let workload = workload_score(current_assigned, config.workload_capacity);
    let history_for_type = staff.performance.completed_for(item.job_type);
    let experience = experience_score(history_for_type, config.experience_saturation);

    let weights = &config.weights;
    let total = weights.skill_match * skill_match
        + weights.performance * performance
        + weights.workload * workload
        + weights.experience * experience;

    ScoreBreakdown {
        staff_id: staff.id.clone(),
        total,
        skill_match,
        performance,
        workload,
        experience,
        matched_capabilities,
        current_load: current_assigned,
        history_for_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use stayline_reservation_core::types::{
        JobType, PerformanceSummary, Priority, PropertyId, ReservationId, StaffAvailability,
        StaffId, WorkItem, WorkItemId, WorkItemStatus, WorkingHours,
    };

    fn staff_with(performance: PerformanceSummary) -> Staff {
        Staff {
            id: StaffId::from("alice"),
            display_name: "Alice".to_string(),
            capabilities: vec!["cleaning".to_string(), "inspection".to_string()],
            availability: StaffAvailability::Available,
            working_hours: WorkingHours::default(),
            performance,
        }
    }

    fn item(required: &[&str]) -> WorkItem {
        WorkItem {
            id: WorkItemId::from("job-1"),
            job_type: JobType::Cleaning,
            property_id: PropertyId::from("villa-1"),
            reservation_id: ReservationId::new(),
            scheduled_at: Utc::now() + Duration::days(1),
            estimated_minutes: 90,
            priority: Priority::High,
            required_capabilities: required.iter().map(|s| s.to_string()).collect(),
            assigned_to: None,
            status: WorkItemStatus::Pending,
            unassigned_cause: None,
            created_at: Utc::now(),
        }
    }

    fn seasoned(completion_rate: f64) -> PerformanceSummary {
        let mut by_type = std::collections::HashMap::new();
        by_type.insert(JobType::Cleaning, 5);
        PerformanceSummary {
            completion_rate,
            average_rating: 4.0,
            on_time_rate: 0.9,
            completed_total: 40,
            completed_by_type: by_type,
        }
    }

    #[test]
    fn skill_match_is_fraction_of_required() {
        let (score, matched) = skill_match_score(
            &["cleaning".to_string(), "laundry".to_string()],
            &["cleaning".to_string()],
        );
        assert!((score - 0.5).abs() < 1e-9);
        assert_eq!(matched, vec!["cleaning".to_string()]);
    }

    #[test]
    fn empty_requirements_score_full_match() {
        let (score, matched) = skill_match_score(&[], &["cleaning".to_string()]);
        assert_eq!(score, 1.0);
        assert!(matched.is_empty());
    }

    #[test]
    fn no_history_gets_neutral_default() {
        let config = AllocationConfig::default();
        let rookie = staff_with(PerformanceSummary::default());
        assert!((performance_score(&rookie, config.default_performance) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn performance_terms_are_clamped() {
        let mut perf = seasoned(1.0);
        perf.completion_rate = 2.5;
        perf.average_rating = 9.0;
        perf.on_time_rate = 1.7;
        let veteran = staff_with(perf);
        let score = performance_score(&veteran, 0.5);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn workload_hits_zero_at_capacity() {
        assert_eq!(workload_score(0, 10), 1.0);
        assert!((workload_score(5, 10) - 0.5).abs() < 1e-9);
        assert_eq!(workload_score(10, 10), 0.0);
        assert_eq!(workload_score(14, 10), 0.0);
    }

    #[test]
    fn experience_saturates() {
        assert!((experience_score(5, 10) - 0.5).abs() < 1e-9);
        assert_eq!(experience_score(10, 10), 1.0);
        assert_eq!(experience_score(50, 10), 1.0);
    }

    #[test]
    fn total_is_monotonic_in_completion_rate() {
        // Raising completion rate while holding everything else fixed
        // must never lower the total.
        let config = AllocationConfig::default();
        let job = item(&["cleaning"]);

        let mut previous = f64::MIN;
        for step in 0..=10 {
            let rate = step as f64 / 10.0;
            let candidate = staff_with(seasoned(rate));
            let breakdown = score_candidate(&candidate, &job, 2, &config);
            assert!(
                breakdown.total >= previous,
                "total dropped at completion rate {}",
                rate
            );
            previous = breakdown.total;
        }
    }

    #[test]
    fn total_stays_within_unit_interval() {
        let config = AllocationConfig::default();
        let job = item(&["cleaning"]);
        let candidate = staff_with(seasoned(1.0));
        let breakdown = score_candidate(&candidate, &job, 0, &config);
        assert!(breakdown.total > 0.0 && breakdown.total <= 1.0);
    }
}
