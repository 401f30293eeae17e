use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use stayline_reservation_core::types::{Staff, StaffAvailability, StaffId};

use crate::error::{BookingEngineError, Result};
use crate::staff::StaffDirectory;

/// In-memory staff registry
///
/// Backs the [`StaffDirectory`] interface for deployments where the
/// staff-management collaborator pushes its state into the pipeline
/// process. Also convenient for tests.
pub struct StaffRegistry {
    members: DashMap<StaffId, Staff>,
}

impl StaffRegistry {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
        }
    }

    /// Register or replace a staff member
    pub fn upsert(&self, staff: Staff) {
        info!("👤 Registering staff member {} ({})", staff.display_name, staff.id);
        self.members.insert(staff.id.clone(), staff);
    }

    /// Update availability state
    pub fn set_availability(&self, id: &StaffId, availability: StaffAvailability) -> Result<()> {
        match self.members.get_mut(id) {
            Some(mut entry) => {
                debug!("🔄 Staff {} availability: {:?}", id, availability);
                entry.availability = availability;
                Ok(())
            }
            None => Err(BookingEngineError::not_found(format!(
                "Staff member not found: {}",
                id
            ))),
        }
    }

    /// Remove a staff member
    pub fn remove(&self, id: &StaffId) -> Result<()> {
        if self.members.remove(id).is_some() {
            info!("👤 Removed staff member {}", id);
            Ok(())
        } else {
            Err(BookingEngineError::not_found(format!(
                "Staff member not found: {}",
                id
            )))
        }
    }

    /// List all staff members
    pub fn list(&self) -> Vec<Staff> {
        self.members.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Registry statistics
    pub fn stats(&self) -> StaffStats {
        let mut stats = StaffStats::default();
        for entry in self.members.iter() {
            stats.total += 1;
            match entry.value().availability {
                StaffAvailability::Available => stats.available += 1,
                StaffAvailability::Busy => stats.busy += 1,
                StaffAvailability::Unavailable => stats.unavailable += 1,
            }
        }
        stats
    }
}

impl Default for StaffRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaffDirectory for StaffRegistry {
    async fn candidates(&self) -> Result<Vec<Staff>> {
        Ok(self.list())
    }

    async fn get(&self, id: &StaffId) -> Result<Option<Staff>> {
        Ok(self.members.get(id).map(|entry| entry.value().clone()))
    }
}

/// Staff registry statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StaffStats {
    pub total: usize,
    pub available: usize,
    pub busy: usize,
    pub unavailable: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_reservation_core::types::{PerformanceSummary, WorkingHours};

    fn staff(id: &str, availability: StaffAvailability) -> Staff {
        Staff {
            id: StaffId::from(id),
            display_name: id.to_string(),
            capabilities: vec!["cleaning".to_string()],
            availability,
            working_hours: WorkingHours::default(),
            performance: PerformanceSummary::default(),
        }
    }

    #[test]
    fn stats_count_by_availability() {
        let registry = StaffRegistry::new();
        registry.upsert(staff("a", StaffAvailability::Available));
        registry.upsert(staff("b", StaffAvailability::Busy));
        registry.upsert(staff("c", StaffAvailability::Available));

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.busy, 1);
        assert_eq!(stats.unavailable, 0);
    }

    #[test]
    fn availability_update_requires_known_member() {
        let registry = StaffRegistry::new();
        registry.upsert(staff("a", StaffAvailability::Available));

        assert!(registry
            .set_availability(&StaffId::from("a"), StaffAvailability::Unavailable)
            .is_ok());
        assert!(registry
            .set_availability(&StaffId::from("ghost"), StaffAvailability::Busy)
            .is_err());
    }
}
