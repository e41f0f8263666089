//! # Datawise Core
//!
//! Shared building blocks for the Datawise workspace: the immutable
//! [`config::AppConfig`], the [`error::DatawiseError`] taxonomy, the chat and
//! tool wire types, and the [`traits::Provider`] / [`traits::Tool`] seams the
//! dispatcher is assembled from.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{DatawiseError, Result};
