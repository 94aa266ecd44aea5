//! Configuration system for Paperlens.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/paperlens/config.toml` and/or `.paperlens/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

/// Minimum number of distinct palette entries required for trend series.
pub const MIN_PALETTE_SIZE: usize = 5;

/// Top-level configuration for the Paperlens client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub trends: TrendsConfig,
}

/// Connection settings for the analytics API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, without a trailing `/api`.
    pub base_url: String,
    /// Per-request timeout in seconds. `0` disables the client-side timeout.
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: format!("paperlens/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Settings for free-text paper search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of results requested per query.
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { limit: 20 }
    }
}

/// How trend topics are mapped onto the palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorAssignment {
    /// `index = first occurrence index mod palette size`.
    #[default]
    FirstSeen,
    /// `index = sha256(topic) mod palette size`, stable across sessions.
    TopicHash,
}

impl std::fmt::Display for ColorAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorAssignment::FirstSeen => write!(f, "first_seen"),
            ColorAssignment::TopicHash => write!(f, "topic_hash"),
        }
    }
}

/// Settings for the trend chart series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsConfig {
    /// Ordered series colors.
    pub palette: Vec<String>,
    #[serde(default)]
    pub color_assignment: ColorAssignment,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            color_assignment: ColorAssignment::FirstSeen,
        }
    }
}

fn default_palette() -> Vec<String> {
    ["#00f0ff", "#bd00ff", "#2de2e6", "#f700ff", "#ffffff"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl ClientConfig {
    /// Validate the configuration, returning a list of problems.
    ///
    /// An empty list means the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let base = self.api.base_url.trim();
        if base.is_empty() {
            problems.push("api.base_url is empty".to_string());
        } else if !base.starts_with("http://") && !base.starts_with("https://") {
            problems.push(format!(
                "api.base_url '{}' must start with http:// or https://",
                base
            ));
        }

        if self.search.limit == 0 {
            problems.push("search.limit must be at least 1".to_string());
        }

        let palette = &self.trends.palette;
        if palette.len() < MIN_PALETTE_SIZE {
            problems.push(format!(
                "trends.palette needs at least {} colors, found {}",
                MIN_PALETTE_SIZE,
                palette.len()
            ));
        }
        let distinct: HashSet<&str> = palette.iter().map(String::as_str).collect();
        if distinct.len() != palette.len() {
            problems.push("trends.palette contains duplicate colors".to_string());
        }

        problems
    }

    /// Render the configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `PAPERLENS_`)
/// 3. Workspace-local config (`.paperlens/config.toml`)
/// 4. User config (`~/.config/paperlens/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ClientConfig>,
) -> Result<ClientConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "paperlens", "paperlens") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".paperlens").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // PAPERLENS_API__BASE_URL, PAPERLENS_SEARCH__LIMIT, ...
    figment = figment.merge(Env::prefixed("PAPERLENS_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: ClientConfig = figment.extract().map_err(|e| ConfigError::Load {
        message: e.to_string(),
    })?;

    let problems = config.validate();
    if !problems.is_empty() {
        return Err(ConfigError::Invalid {
            message: problems.join("; "),
        });
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.search.limit, 20);
        assert_eq!(config.trends.palette.len(), 5);
        assert_eq!(config.trends.palette[0], "#00f0ff");
        assert_eq!(config.trends.color_assignment, ColorAssignment::FirstSeen);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_color_assignment_display() {
        assert_eq!(ColorAssignment::FirstSeen.to_string(), "first_seen");
        assert_eq!(ColorAssignment::TopicHash.to_string(), "topic_hash");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ClientConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed: ClientConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
        assert_eq!(parsed.trends.palette, config.trends.palette);
    }

    #[test]
    fn test_validate_short_palette() {
        let mut config = ClientConfig::default();
        config.trends.palette.truncate(3);
        let problems = config.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("at least 5"));
    }

    #[test]
    fn test_validate_duplicate_palette() {
        let mut config = ClientConfig::default();
        config.trends.palette[4] = config.trends.palette[0].clone();
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("duplicate")));
    }

    #[test]
    fn test_validate_base_url_and_limit() {
        let mut config = ClientConfig::default();
        config.api.base_url = "localhost:8000".into();
        config.search.limit = 0;
        let problems = config.validate();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None, None).unwrap();
        assert_eq!(config.search.limit, 20);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = ClientConfig::default();
        overrides.api.base_url = "https://lens.example.org".into();
        overrides.search.limit = 5;

        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.api.base_url, "https://lens.example.org");
        assert_eq!(config.search.limit, 5);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(".paperlens");
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(
            ws_dir.join("config.toml"),
            r##"
[api]
base_url = "http://10.0.0.2:8000"
timeout_secs = 5
user_agent = "lens-test"

[trends]
palette = ["#111111", "#222222", "#333333", "#444444", "#555555", "#666666"]
color_assignment = "topic_hash"
"##,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.trends.palette.len(), 6);
        assert_eq!(config.trends.color_assignment, ColorAssignment::TopicHash);
        // Untouched sections keep their defaults.
        assert_eq!(config.search.limit, 20);
    }

    #[test]
    fn test_load_config_rejects_invalid_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(".paperlens");
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(
            ws_dir.join("config.toml"),
            "[trends]\npalette = [\"#000000\"]\n",
        )
        .unwrap();

        let err = load_config(Some(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
