//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.scout/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::langgraph::DEFAULT_ASSISTANT_ID;
use crate::agent::{Effort, SUPPORTED_MODELS};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub research: ResearchConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub assistant_id: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResearchConfig {
    pub effort: Option<Effort>,
    pub model: Option<String>,
    pub models: Option<Vec<String>>,
    pub export_dir: Option<PathBuf>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:2024";

// ============================================================================
// Resolved Config (concrete values)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server_url: String,
    pub assistant_id: String,
    pub api_key: Option<String>,
    pub effort: Effort,
    /// Non-empty; the first entry is the default selection unless `model` says otherwise.
    pub models: Vec<String>,
    pub model: String,
    pub export_dir: Option<PathBuf>,
}

/// Values given on the command line. `None` = flag not specified.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub assistant_id: Option<String>,
    pub effort: Option<Effort>,
    pub model: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.scout/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".scout").join("config.toml"))
}

/// Load config from `~/.scout/config.toml`, generating a commented default
/// when the file is missing.
pub fn load_config() -> Result<ScoutConfig, ConfigError> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => {
            warn!("Could not determine home directory, using default config");
            Ok(ScoutConfig::default())
        }
    }
}

pub fn load_config_from(path: &Path) -> Result<ScoutConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(ScoutConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ScoutConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &Path) {
    let default_content = r#"# Scout Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# url = "http://127.0.0.1:2024"      # Or set SCOUT_SERVER_URL
# assistant_id = "pro-search-agent"  # Or set SCOUT_ASSISTANT_ID
# api_key = "lsv2_..."               # Or set LANGSMITH_API_KEY (hosted deployments only)

# [research]
# effort = "low"                     # "low", "medium", "high"
# model = "gemini-1.5-pro-latest"
# models = ["gemini-1.5-pro-latest", "gemini-1.5-flash-latest"]
# export_dir = "/home/me/research"   # Or set SCOUT_EXPORT_DIR; unset = no export
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &ScoutConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

fn resolve_with_env(
    config: &ScoutConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let server_url = cli
        .server_url
        .clone()
        .or_else(|| env("SCOUT_SERVER_URL"))
        .or_else(|| config.server.url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let assistant_id = cli
        .assistant_id
        .clone()
        .or_else(|| env("SCOUT_ASSISTANT_ID"))
        .or_else(|| config.server.assistant_id.clone())
        .unwrap_or_else(|| DEFAULT_ASSISTANT_ID.to_string());

    let api_key = env("LANGSMITH_API_KEY").or_else(|| config.server.api_key.clone());

    // An empty list would leave the selector with nothing to show
    let models = config
        .research
        .models
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect());

    let model = cli
        .model
        .clone()
        .or_else(|| config.research.model.clone())
        .filter(|m| models.contains(m))
        .unwrap_or_else(|| models[0].clone());

    let export_dir = env("SCOUT_EXPORT_DIR")
        .map(PathBuf::from)
        .or_else(|| config.research.export_dir.clone());

    ResolvedConfig {
        server_url,
        assistant_id,
        api_key,
        effort: cli.effort.or(config.research.effort).unwrap_or_default(),
        models,
        model,
        export_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&ScoutConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.server_url, DEFAULT_SERVER_URL);
        assert_eq!(resolved.assistant_id, "pro-search-agent");
        assert_eq!(resolved.effort, Effort::Low);
        assert_eq!(resolved.models, SUPPORTED_MODELS.to_vec());
        assert_eq!(resolved.model, "gemini-1.5-pro-latest");
        assert!(resolved.export_dir.is_none());
    }

    #[test]
    fn test_resolve_precedence_cli_env_file() {
        let config = ScoutConfig {
            server: ServerConfig {
                url: Some("http://file:1".to_string()),
                assistant_id: Some("file-agent".to_string()),
                api_key: None,
            },
            ..Default::default()
        };
        let env = |key: &str| match key {
            "SCOUT_SERVER_URL" => Some("http://env:2".to_string()),
            "SCOUT_ASSISTANT_ID" => Some("env-agent".to_string()),
            _ => None,
        };
        let cli = CliOverrides {
            server_url: Some("http://cli:3".to_string()),
            ..Default::default()
        };

        let resolved = resolve_with_env(&config, &cli, env);
        assert_eq!(resolved.server_url, "http://cli:3");
        assert_eq!(resolved.assistant_id, "env-agent");
    }

    #[test]
    fn test_unknown_model_falls_back_to_first() {
        let config = ScoutConfig {
            research: ResearchConfig {
                model: Some("gpt-unknown".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.model, "gemini-1.5-pro-latest");
    }

    #[test]
    fn test_empty_model_list_uses_builtin() {
        let config = ScoutConfig {
            research: ResearchConfig {
                models: Some(Vec::new()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.models.len(), 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[server]
url = "http://10.0.0.5:2024"
assistant_id = "deep-research"

[research]
effort = "high"
model = "local-model"
models = ["local-model", "other-model"]
export_dir = "/tmp/research"
"#;
        let config: ScoutConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.url.as_deref(), Some("http://10.0.0.5:2024"));
        assert_eq!(config.research.effort, Some(Effort::High));

        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.assistant_id, "deep-research");
        assert_eq!(resolved.model, "local-model");
        assert_eq!(resolved.effort, Effort::High);
        assert_eq!(resolved.export_dir, Some(PathBuf::from("/tmp/research")));
    }

    #[test]
    fn test_sparse_toml_parses() {
        let config: ScoutConfig = toml::from_str("[research]\neffort = \"medium\"\n").unwrap();
        assert_eq!(config.research.effort, Some(Effort::Medium));
        assert!(config.server.url.is_none());
    }

    #[test]
    fn test_missing_file_generates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert!(config.server.url.is_none());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Scout Configuration"));

        // The generated file is all comments, so it parses back to defaults
        let reparsed = load_config_from(&path).unwrap();
        assert!(reparsed.research.effort.is_none());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nurl = 1").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
