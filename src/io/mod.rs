//! Input/output helpers.
//!
//! - dataset CSV ingest + validation (`ingest`)
//! - training metrics export (JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
