//! `credit-default` library crate.
//!
//! The binary (`credit-default`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - a trained `Predictor` can be embedded by another front-end (a form, a service)

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod inference;
pub mod io;
pub mod logging;
pub mod models;
pub mod prep;
pub mod report;
