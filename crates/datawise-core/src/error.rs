//! Error taxonomy for Datawise.

use thiserror::Error;

/// Every failure a Datawise component can surface.
///
/// None of these are retried; a failure terminates the current question
/// (or, for [`DatawiseError::Config`], startup).
#[derive(Debug, Error)]
pub enum DatawiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("API key missing for {0}")]
    ApiKeyMissing(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Decision service did not produce a final answer within {0} turns")]
    MaxTurnsExceeded(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for DatawiseError {
    fn from(e: reqwest::Error) -> Self {
        DatawiseError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DatawiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_names_tool() {
        let err = DatawiseError::InvalidToolArguments {
            tool: "websearch".into(),
            reason: "missing field `query`".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("websearch"));
        assert!(msg.contains("query"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DatawiseError = io.into();
        assert!(matches!(err, DatawiseError::Io(_)));
    }
}
