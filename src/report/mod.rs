//! Reporting: formatted terminal output.
//!
//! Formatting lives here so pipeline code stays free of presentation.

pub mod format;

pub use format::*;
