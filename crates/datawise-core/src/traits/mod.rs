//! Seams between the dispatcher and its collaborators.

pub mod provider;
pub mod tool;

pub use provider::{GenerateParams, Provider};
pub use tool::Tool;
