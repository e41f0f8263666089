//! Datawise configuration system.
//!
//! Configuration is resolved once at startup into an immutable [`AppConfig`]
//! and passed by reference to every component. An optional TOML file supplies
//! tunables and the dataset mapping; the environment supplies the endpoint,
//! model and credentials.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DatawiseError, Result};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "datawise.toml";

pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";
/// Search credential names, first match wins.
pub const ENV_SEARCH_KEYS: &[&str] = &["Tavily_API", "TAVILY_API_KEY"];

/// A credential whose `Debug` output never reveals the value.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            agent: AgentConfig::default(),
            datasets: default_datasets(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from `path` (or `datawise.toml` if present) and
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load_from(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(env);
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatawiseError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DatawiseError::Config(format!("Failed to parse config: {e}")))
    }

    /// Overlay endpoint, model and credentials from the environment.
    /// Blank values count as unset.
    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = lookup(ENV_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.llm.api_key = Secret::new(key);
        }
        if let Some(model) = lookup(ENV_MODEL_NAME) {
            self.llm.model = model;
        }
        if let Some(key) = ENV_SEARCH_KEYS.iter().copied().find_map(lookup) {
            self.search.api_key = Some(Secret::new(key));
        }
    }
}

/// Decision-service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Secret,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 60 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: Secret::default(),
            model: String::new(),
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Fail with a descriptive error unless endpoint, key and model are set.
    pub fn ensure_complete(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.base_url.trim().is_empty() {
            missing.push(ENV_BASE_URL);
        }
        if self.api_key.is_empty() {
            missing.push(ENV_API_KEY);
        }
        if self.model.trim().is_empty() {
            missing.push(ENV_MODEL_NAME);
        }
        if missing.is_empty() {
            return Ok(());
        }
        Err(DatawiseError::Config(format!(
            "Please set {} in your environment (missing: {})",
            [ENV_BASE_URL, ENV_API_KEY, ENV_MODEL_NAME].join(", "),
            missing.join(", ")
        )))
    }
}

/// Search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<Secret>,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_search_endpoint() -> String { "https://api.tavily.com".into() }
fn default_search_depth() -> String { "basic".into() }
fn default_max_results() -> u32 { 5 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            search_depth: default_search_depth(),
            max_results: default_max_results(),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_instructions")]
    pub instructions: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Truncate tool output fed back to the decision service. Unset = verbatim.
    #[serde(default)]
    pub max_tool_output_chars: Option<usize>,
}

fn default_agent_name() -> String { "Assistant".into() }
fn default_max_turns() -> usize { 10 }

pub fn default_instructions() -> String {
    "You are a helpful assistant that can answer questions using the available tools.

Tools:
1. query_heart_disease_db - Use this for questions about heart disease data/statistics.
2. query_diabetes_disease_db - Use this for diabetes database queries.
3. query_cancer_db - Use this for cancer database queries.
4. websearch - Use for general knowledge or current events outside of the databases.

Rules:
- Prefer database queries when question relates to specific datasets.
- Use websearch for general knowledge or current events.
- Do not invent data; only provide information from the tools.
- Provide clear, concise answers and explain the data source."
        .into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: default_instructions(),
            max_turns: default_max_turns(),
            max_tool_output_chars: None,
        }
    }
}

/// One (source file -> store file) pair of the dataset mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Delimited source file, relative to the working directory.
    pub source: PathBuf,
    /// SQLite store file, relative to the working directory.
    pub store: PathBuf,
    /// Table name; defaults to the source file stem.
    #[serde(default)]
    pub table: Option<String>,
    /// Tool name exposed to the decision service; defaults to `query_<table>_db`.
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DatasetEntry {
    pub fn new(source: impl Into<PathBuf>, store: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            store: store.into(),
            table: None,
            tool: None,
            description: None,
        }
    }

    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| table_name_for(&self.source))
    }

    pub fn tool_name(&self) -> String {
        self.tool
            .clone()
            .unwrap_or_else(|| format!("query_{}_db", self.table_name()))
    }

    pub fn tool_description(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            format!(
                "Execute SQL query on the {} database and return results.",
                self.table_name().replace('_', " ")
            )
        })
    }
}

/// Base name of `source` without its extension.
pub fn table_name_for(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn default_datasets() -> Vec<DatasetEntry> {
    vec![
        DatasetEntry {
            tool: Some("query_heart_disease_db".into()),
            ..DatasetEntry::new("data/heart_disease.csv", "heart_disease.db")
        },
        DatasetEntry {
            tool: Some("query_cancer_db".into()),
            ..DatasetEntry::new("data/cancer.csv", "cancer.db")
        },
        DatasetEntry {
            tool: Some("query_diabetes_disease_db".into()),
            ..DatasetEntry::new("data/diabetes.csv", "diabetes.db")
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn no_file() -> Option<&'static Path> {
        Some(Path::new("/nonexistent/datawise-test.toml"))
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.agent.name, "Assistant");
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.search.endpoint, "https://api.tavily.com");
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.datasets.len(), 3);
    }

    #[test]
    fn test_default_dataset_names() {
        let names: Vec<_> = default_datasets()
            .iter()
            .map(|d| (d.table_name(), d.tool_name()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("heart_disease".to_string(), "query_heart_disease_db".to_string()),
                ("cancer".to_string(), "query_cancer_db".to_string()),
                ("diabetes".to_string(), "query_diabetes_disease_db".to_string()),
            ]
        );
        assert_eq!(
            default_datasets()[0].tool_description(),
            "Execute SQL query on the heart disease database and return results."
        );
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [llm]
            temperature = 0.2
            timeout_secs = 15

            [agent]
            max_turns = 4

            [[datasets]]
            source = "csv/patients.csv"
            store = "patients.db"
        "#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.llm.temperature, Some(0.2));
        assert_eq!(config.llm.timeout_secs, 15);
        assert_eq!(config.agent.max_turns, 4);
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.datasets[0].table_name(), "patients");
        assert_eq!(config.datasets[0].tool_name(), "query_patients_db");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.search.search_depth, "basic");
        assert_eq!(config.datasets, default_datasets());
    }

    #[test]
    fn test_env_overlay_and_validation() {
        let env = env_from(&[
            ("BASE_URL", "https://llm.example.com/v1"),
            ("API_KEY", "sk-test"),
            ("MODEL_NAME", "gpt-4o-mini"),
            ("Tavily_API", "tvly-test"),
        ]);
        let config = AppConfig::load_with(None, env).unwrap();
        assert_eq!(config.llm.base_url, "https://llm.example.com/v1");
        assert_eq!(config.llm.api_key.expose(), "sk-test");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(
            config.search.api_key.as_ref().map(Secret::expose),
            Some("tvly-test")
        );
        assert!(config.llm.ensure_complete().is_ok());
    }

    #[test]
    fn test_missing_required_values_are_named() {
        let env = env_from(&[("BASE_URL", "https://llm.example.com/v1"), ("API_KEY", "  ")]);
        let config = AppConfig::load_with(None, env).unwrap();
        let err = config.llm.ensure_complete().unwrap_err().to_string();
        assert!(err.contains("API_KEY"), "got: {err}");
        assert!(err.contains("MODEL_NAME"), "got: {err}");
        assert!(err.contains("missing"), "got: {err}");
    }

    #[test]
    fn test_search_key_is_optional() {
        let env = env_from(&[
            ("BASE_URL", "http://localhost:11434/v1"),
            ("API_KEY", "ollama"),
            ("MODEL_NAME", "llama3.2"),
        ]);
        let config = AppConfig::load_with(None, env).unwrap();
        assert!(config.search.api_key.is_none());
        assert!(config.llm.ensure_complete().is_ok());
    }

    #[test]
    fn test_alternate_search_key_name() {
        let env = env_from(&[("TAVILY_API_KEY", "tvly-alt")]);
        let config = AppConfig::load_with(None, env).unwrap();
        assert_eq!(
            config.search.api_key.as_ref().map(Secret::expose),
            Some("tvly-alt")
        );
    }

    #[test]
    fn test_unreadable_config_file_is_config_error() {
        let err = AppConfig::load_with(no_file(), |_| None).unwrap_err();
        assert!(matches!(err, DatawiseError::Config(_)));
    }

    #[test]
    fn test_config_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datawise.toml");
        std::fs::write(&path, "[search]\nmax_results = 8\n").unwrap();
        let config = AppConfig::load_with(Some(&path), |_| None).unwrap();
        assert_eq!(config.search.max_results, 8);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("sk-very-secret");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        let config = LlmConfig {
            api_key: secret,
            ..LlmConfig::default()
        };
        assert!(!format!("{config:?}").contains("sk-very-secret"));
    }
}
