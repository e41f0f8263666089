//! # Datawise Store
//!
//! Embedded SQLite stores backing the dataset capabilities:
//! - [`loader`] materializes a CSV file as a table, replacing any previous copy.
//! - [`query`] runs a query string verbatim against a store and renders the rows.

pub mod loader;
pub mod query;

pub use loader::{LoadOutcome, LoadReport, load, load_all, normalize_column_name};
pub use query::{QueryRows, execute};
