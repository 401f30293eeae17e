//! Staff management module
//!
//! This module provides the staff registry, availability tracking, and
//! the directory interface the allocator reads candidates from.

pub mod registry;

pub use registry::{StaffRegistry, StaffStats};

use async_trait::async_trait;

use stayline_reservation_core::types::{Staff, StaffId};

use crate::error::Result;

/// Read interface the allocator uses to enumerate candidates
///
/// Staff records are owned and mutated by an external staff-management
/// collaborator; the pipeline only reads them.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// All known staff members
    async fn candidates(&self) -> Result<Vec<Staff>>;

    /// Look up one staff member
    async fn get(&self, id: &StaffId) -> Result<Option<Staff>>;
}
