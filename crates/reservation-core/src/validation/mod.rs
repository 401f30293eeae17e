//! Stateless reservation request validation
//!
//! Checks run in a fixed order and short-circuit on the first failure so
//! error messages are deterministic. The engine never lets an internal
//! fault escape its boundary: an unexpected panic inside a check becomes
//! a "validation system error" result instead.

pub mod engine;

pub use engine::{
    ValidationContext, ValidationEngine, ValidationErrorCode, ValidationFailure,
    ValidationOutcome, ValidationRules,
};
