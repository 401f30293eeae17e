use serde::{Deserialize, Serialize};

use stayline_reservation_core::types::{JobType, Priority};
use stayline_reservation_core::validation::ValidationRules;

/// Booking engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEngineConfig {
    /// General engine settings
    pub general: GeneralConfig,

    /// Validation rule limits
    pub validation: ValidationRules,

    /// Assignment queue and scheduler configuration
    pub queue: QueueConfig,

    /// Staff allocation configuration
    pub allocation: AllocationConfig,

    /// Work item derivation rules
    pub work_items: WorkItemConfig,

    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
}

/// General engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Service name used in emitted events and logs
    pub service_name: String,

    /// Length of the turnover buffer block appended after check-out (hours)
    pub turnover_buffer_hours: i64,
}

/// Queue and scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Concurrent reservation workers per drain pass
    pub worker_budget: usize,

    /// Per-reservation processing timeout (seconds)
    pub processing_timeout_secs: u64,

    /// Retry attempts for infrastructure failures before giving up
    pub retry_budget: u32,

    /// Exponential backoff base for retries (milliseconds)
    pub retry_backoff_base_ms: u64,

    /// Maximum queued reservations
    pub max_queue_size: usize,

    /// Queued reservations older than this are expired (seconds)
    pub max_wait_secs: u64,

    /// Drain loop tick interval (milliseconds)
    pub drain_interval_ms: u64,

    /// In-flight marks older than this are considered stuck (seconds)
    pub stuck_in_flight_secs: u64,
}

/// Weights of the allocator's scoring factors; must sum to 1.0
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill_match: f64,
    pub performance: f64,
    pub workload: f64,
    pub experience: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.skill_match + self.performance + self.workload + self.experience
    }
}

/// Staff allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Scoring factor weights
    ///
    /// Heuristic constants, not tuned truths; override per deployment.
    pub weights: ScoringWeights,

    /// Padding around a work item window when checking staff time
    /// conflicts (hours)
    pub overlap_buffer_hours: i64,

    /// Assigned-item count at which a candidate's workload score hits 0
    pub workload_capacity: u32,

    /// Completed-job count at which the experience score saturates at 1
    pub experience_saturation: u64,

    /// Performance score used for candidates with no history
    pub default_performance: f64,
}

/// One derived work item rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemRule {
    pub job_type: JobType,
    /// Offset from the anchor instant (check-in for pre-service rules,
    /// check-out for post-service rules), in hours
    pub offset_hours: i64,
    pub estimated_minutes: u32,
    pub priority: Priority,
    pub required_capabilities: Vec<String>,
}

/// Work item derivation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemConfig {
    /// Items scheduled before check-in
    pub pre_service: Vec<WorkItemRule>,

    /// Items scheduled after check-out
    pub post_service: Vec<WorkItemRule>,
}

/// Monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Emit domain events on the broadcast channel
    pub emit_events: bool,

    /// Broadcast channel capacity; slow subscribers lag past this
    pub event_channel_capacity: usize,
}

impl BookingEngineConfig {
    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), String> {
        if self.general.service_name.is_empty() {
            return Err("service_name cannot be empty".to_string());
        }

        if self.general.turnover_buffer_hours < 0 {
            return Err("turnover_buffer_hours cannot be negative".to_string());
        }

        if self.queue.worker_budget == 0 {
            return Err("worker_budget must be greater than 0".to_string());
        }

        if self.queue.processing_timeout_secs == 0 {
            return Err("processing_timeout_secs must be greater than 0".to_string());
        }

        if self.queue.max_queue_size == 0 {
            return Err("max_queue_size must be greater than 0".to_string());
        }

        if self.queue.drain_interval_ms == 0 {
            return Err("drain_interval_ms must be greater than 0".to_string());
        }

        let weights = &self.allocation.weights;
        for (name, value) in [
            ("skill_match", weights.skill_match),
            ("performance", weights.performance),
            ("workload", weights.workload),
            ("experience", weights.experience),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("weight {} must be within [0, 1]", name));
            }
        }
        if (weights.sum() - 1.0).abs() > 1e-6 {
            return Err(format!(
                "scoring weights must sum to 1.0, got {}",
                weights.sum()
            ));
        }

        if self.allocation.workload_capacity == 0 {
            return Err("workload_capacity must be greater than 0".to_string());
        }

        if self.allocation.experience_saturation == 0 {
            return Err("experience_saturation must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.allocation.default_performance) {
            return Err("default_performance must be within [0, 1]".to_string());
        }

        if self.monitoring.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.validation.max_advance_days <= 0 {
            return Err("max_advance_days must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for BookingEngineConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            validation: ValidationRules::default(),
            queue: QueueConfig::default(),
            allocation: AllocationConfig::default(),
            work_items: WorkItemConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            service_name: "stayline-booking-engine".to_string(),
            turnover_buffer_hours: 2,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_budget: 3,
            processing_timeout_secs: 30,
            retry_budget: 3,
            retry_backoff_base_ms: 1_000,
            max_queue_size: 500,
            max_wait_secs: 3_600,
            drain_interval_ms: 200,
            stuck_in_flight_secs: 300,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill_match: 0.4,
            performance: 0.3,
            workload: 0.2,
            experience: 0.1,
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            overlap_buffer_hours: 2,
            workload_capacity: 10,
            experience_saturation: 10,
            default_performance: 0.5,
        }
    }
}

impl Default for WorkItemConfig {
    fn default() -> Self {
        Self {
            pre_service: vec![
                WorkItemRule {
                    job_type: JobType::Cleaning,
                    offset_hours: 4,
                    estimated_minutes: 120,
                    priority: Priority::High,
                    required_capabilities: vec!["cleaning".to_string()],
                },
                WorkItemRule {
                    job_type: JobType::CheckInPrep,
                    offset_hours: 1,
                    estimated_minutes: 45,
                    priority: Priority::Medium,
                    required_capabilities: vec!["guest_services".to_string()],
                },
            ],
            post_service: vec![
                WorkItemRule {
                    job_type: JobType::CheckOutService,
                    offset_hours: 0,
                    estimated_minutes: 60,
                    priority: Priority::Medium,
                    required_capabilities: vec!["guest_services".to_string()],
                },
                WorkItemRule {
                    job_type: JobType::Inspection,
                    offset_hours: 2,
                    estimated_minutes: 30,
                    priority: Priority::Medium,
                    required_capabilities: vec!["inspection".to_string()],
                },
            ],
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            emit_events: true,
            event_channel_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BookingEngineConfig::default().validate().is_ok());
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!((ScoringWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn skewed_weights_rejected() {
        let mut config = BookingEngineConfig::default();
        config.allocation.weights.skill_match = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_worker_budget_rejected() {
        let mut config = BookingEngineConfig::default();
        config.queue.worker_budget = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_derive_four_work_items() {
        let config = WorkItemConfig::default();
        assert_eq!(config.pre_service.len() + config.post_service.len(), 4);
    }
}
