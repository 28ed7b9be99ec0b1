//! Configuration loading and validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepwiseError};

/// Top-level Stepwise configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Step engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tool name → display title overrides, checked before the built-in table.
    #[serde(default)]
    pub tool_titles: HashMap<String, String>,

    /// Tools whose arguments and results are not rendered (the step still shows).
    #[serde(default)]
    pub hidden_tool_details: Vec<String>,
}

impl EngineConfig {
    pub fn is_detail_hidden(&self, tool_name: &str) -> bool {
        self.hidden_tool_details.iter().any(|t| t == tool_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "stepwise_engine=trace").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

static ENV_VAR_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw);

        json5::from_str(&substituted).map_err(|e| StepwiseError::Config(e.to_string()))
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Effective engine settings.
    pub fn engine(&self) -> EngineConfig {
        self.engine.clone().unwrap_or_default()
    }

    pub fn log_format(&self) -> &str {
        self.logging
            .as_ref()
            .map(|l| l.format.as_str())
            .unwrap_or("plain")
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// Get a config value by dotted path (e.g. "engine.tool_titles").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(engine) = &self.engine {
            for (tool, title) in &engine.tool_titles {
                if title.trim().is_empty() {
                    warnings.push(format!("Tool '{tool}' has an empty display title"));
                }
            }
        }

        if let Some(logging) = &self.logging {
            if !matches!(logging.format.as_str(), "plain" | "json") {
                errors.push(format!("Unknown log format: {}", logging.format));
            }
            if !matches!(logging.output.as_str(), "stderr" | "stdout") {
                errors.push(format!("Unknown log output: {}", logging.output));
            }
        }

        (warnings, errors)
    }
}

/// Base directory for Stepwise data: `~/.stepwise/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stepwise")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_SW_TITLE", "Running the step") };
        let input = r#"{"title": "${TEST_SW_TITLE}", "other": "plain"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains("Running the step"));
        assert!(result.contains("plain"));
        unsafe { std::env::remove_var("TEST_SW_TITLE") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_SW_TEST}"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""""#));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/stepwise.json")).unwrap();
        assert!(config.engine.is_none());
        assert_eq!(config.log_format(), "plain");
        assert_eq!(config.engine(), EngineConfig::default());
    }

    #[test]
    fn test_load_json5_engine_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // comments are allowed
                engine: {
                    tool_titles: { execute_step: "Running the Step" },
                    hidden_tool_details: ["execute_step"],
                },
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let engine = config.engine();
        assert_eq!(
            engine.tool_titles.get("execute_step").map(String::as_str),
            Some("Running the Step")
        );
        assert!(engine.is_detail_hidden("execute_step"));
        assert!(!engine.is_detail_hidden("random_number"));
    }

    #[test]
    fn test_load_invalid_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ engine: ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, StepwiseError::Config(_)));
    }

    #[test]
    fn test_logging_config_defaults() {
        let config: Config = json5::from_str(r#"{ "logging": {} }"#).unwrap();
        let logging = config.logging.expect("logging should be present");
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());
        assert_eq!(logging.output, "stderr");
        assert!(logging.filters.is_empty());
    }

    #[test]
    fn test_get_path() {
        let config: Config =
            json5::from_str(r#"{ engine: { hidden_tool_details: ["draft_plan"] } }"#).unwrap();
        assert_eq!(
            config.get_path("engine.hidden_tool_details"),
            Some(serde_json::json!(["draft_plan"]))
        );
        assert!(config.get_path("engine.missing").is_none());
    }

    #[test]
    fn test_validate() {
        let config: Config = json5::from_str(
            r#"{
                engine: { tool_titles: { draft_plan: "  " } },
                logging: { format: "xml" },
            }"#,
        )
        .unwrap();
        let (warnings, errors) = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("draft_plan"));
        assert_eq!(errors, vec!["Unknown log format: xml".to_string()]);
    }
}
