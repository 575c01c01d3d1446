//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed dataset layout (`CreditRecord`, column constants)
//! - form choices (`Gender`, `EducationLevel`, `MaritalStatus`, `RepaymentStatus`)
//! - request/verdict types and run configuration

pub mod types;

pub use types::*;
