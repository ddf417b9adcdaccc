//! Configuration file support

use codegen_tui::Theme;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Used when neither the config nor the command line names an endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/code";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a code generator. You must answer only in markdown code snippets. Use code comments for explanations.";

/// Which completion client to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// POST `{messages}` to a completion endpoint
    #[default]
    Endpoint,
    /// OpenAI-compatible chat completions
    Openai,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Endpoint => "endpoint",
            Backend::Openai => "openai",
        }
    }
}

/// TUI color scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

impl ThemeChoice {
    pub fn theme(self) -> Theme {
        match self {
            ThemeChoice::Dark => Theme::dark(),
            ThemeChoice::Light => Theme::light(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Configuration for codegen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Option<Backend>,
    /// Completion endpoint URL for the `endpoint` backend
    pub endpoint: Option<String>,
    /// Base URL for the `openai` backend
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// System instruction sent ahead of the history (`openai` only)
    pub system_prompt: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Optional quota endpoint returning `{"count": n, "limit": m}`
    pub usage_url: Option<String>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    pub theme: Option<ThemeChoice>,
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codegen")
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CODEGEN_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load the config, falling back to defaults when the file is missing or broken
    pub fn load() -> Self {
        match Self::load_from(&Self::config_path()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                eprintln!("Warning: {}", e);
                Self::default()
            }
        }
    }

    /// Load from `path`. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        Self::default_file().save_to(&path)?;
        Ok(path)
    }

    /// Contents written by `--init-config`
    pub fn default_file() -> Self {
        Config {
            backend: Some(Backend::Endpoint),
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            base_url: None,
            model: Some(DEFAULT_MODEL.to_string()),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            timeout_secs: Some(120),
            usage_url: None,
            tui: Some(true),
            theme: Some(ThemeChoice::Dark),
            api_keys: ApiKeys::default(),
        }
    }

    /// Config first, then `OPENAI_API_KEY`
    pub fn openai_api_key(&self) -> Option<String> {
        self.api_keys
            .openai
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# codegen configuration file
# Place at ~/.config/codegen/config.toml (Linux/Mac) or %APPDATA%\codegen\config.toml (Windows)

# Which client to use: "endpoint" posts {"messages": [...]} to `endpoint`,
# "openai" talks to an OpenAI-compatible chat completions API
backend = "endpoint"
endpoint = "http://localhost:3000/api/code"

# base_url = "https://api.openai.com/v1"
model = "gpt-3.5-turbo"
system_prompt = "You are a code generator. You must answer only in markdown code snippets. Use code comments for explanations."

# Seconds before a request is abandoned
timeout_secs = 120

# Optional quota endpoint returning {"count": n, "limit": m}
# usage_url = "http://localhost:3000/api/usage"

# Set to false for simple stdin/stdout mode
tui = true

# "dark" or "light"
theme = "dark"

# It's recommended to use the OPENAI_API_KEY environment variable instead
[api_keys]
# openai = "sk-..."
"#
}
