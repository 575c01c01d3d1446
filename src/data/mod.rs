//! Dataset sources other than a user-supplied CSV.

pub mod synthetic;

pub use synthetic::{generate_dataset, write_dataset_csv, write_dataset_file};
