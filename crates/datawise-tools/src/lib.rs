//! # Datawise Tools
//!
//! Capabilities offered to the decision service:
//! - [`sql_query::SqlQueryTool`], one per dataset, runs SQL verbatim.
//! - [`web_search::WebSearchTool`] forwards a query to the search provider.
//!
//! [`registry::ToolRegistry`] holds them in a fixed order.

pub mod registry;
pub mod sql_query;
pub mod web_search;

pub use registry::ToolRegistry;
