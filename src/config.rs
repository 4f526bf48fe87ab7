use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "bumpfix.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Package manager executable (default: "npm")
    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    /// Script passed to `<package_manager> run` (default: "build")
    #[serde(default = "default_build_script")]
    pub build_script: String,

    /// Lines of context on each side of a diagnostic (default: 5)
    #[serde(default = "default_snippet_radius")]
    pub snippet_radius: usize,

    /// Timeout for each package-manager invocation in seconds (default: 600)
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Skip `outdated`/`install` and only build and diagnose
    #[serde(default)]
    pub skip_upgrade: bool,

    /// Write the raw output of a failed build here, relative to the project
    #[serde(default)]
    pub error_log: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            package_manager: default_package_manager(),
            build_script: default_build_script(),
            snippet_radius: default_snippet_radius(),
            command_timeout_secs: default_command_timeout(),
            skip_upgrade: false,
            error_log: None,
        }
    }
}

fn default_package_manager() -> String {
    "npm".to_string()
}

fn default_build_script() -> String {
    "build".to_string()
}

fn default_snippet_radius() -> usize {
    5
}

fn default_command_timeout() -> u64 {
    600
}

/// Which completion backend answers prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Remote,
    Local,
}

impl Backend {
    pub fn as_str(&self) -> &str {
        match self {
            Backend::Remote => "remote",
            Backend::Local => "local",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub backend: Backend,

    /// Use the local backend when the remote one has no credential
    #[serde(default)]
    pub fallback_to_local: bool,

    #[serde(default = "LlmConfig::remote_default")]
    pub remote: LlmConfig,

    #[serde(default = "LlmConfig::local_default")]
    pub local: LlmConfig,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Remote,
            fallback_to_local: false,
            remote: LlmConfig::remote_default(),
            local: LlmConfig::local_default(),
        }
    }
}

impl LlmSettings {
    pub fn selected_mut(&mut self) -> &mut LlmConfig {
        match self.backend {
            Backend::Remote => &mut self.remote,
            Backend::Local => &mut self.local,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini", "openai" or "openai-compatible"
    pub provider: String,
    pub model: String,

    /// Environment variable holding the API key ("none" for keyless servers)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Key stored directly in the config file, used when the env var is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Optional: override max output tokens. Provider defaults:
    /// - gemini: 8192
    /// - openai: 4096
    /// - openai-compatible: 100
    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// HTTP request timeout in seconds (default: 120)
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    120
}

impl LlmConfig {
    pub fn remote_default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: default_request_timeout(),
        }
    }

    pub fn local_default() -> Self {
        Self {
            provider: "openai-compatible".to_string(),
            model: "codellama:7b".to_string(),
            api_key_env: Some("none".to_string()),
            api_key: None,
            base_url: Some("http://localhost:11434/v1".to_string()),
            max_tokens: None,
            temperature: Some(0.1),
            timeout_secs: default_request_timeout(),
        }
    }

    /// Get max_tokens value, using provider-specific default if not specified
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }

        match self.provider.as_str() {
            "gemini" => 8192,
            "openai" => 4096,
            "openai-compatible" => 100,
            _ => 4096,
        }
    }

    /// Resolve the credential: environment variable first, then the config file.
    ///
    /// Returns `None` when no key is configured anywhere. "none" as the env var
    /// name marks a keyless backend and resolves to an empty key.
    pub fn resolve_api_key(&self) -> Option<String> {
        if self.is_keyless() {
            return Some(String::new());
        }
        if let Some(ref env_var) = self.api_key_env {
            if let Ok(value) = env::var(env_var) {
                if !value.trim().is_empty() {
                    return Some(value);
                }
            }
        }
        self.api_key.clone().filter(|k| !k.trim().is_empty())
    }

    /// True for backends configured with `api_key_env = "none"`
    pub fn is_keyless(&self) -> bool {
        self.api_key_env
            .as_deref()
            .is_some_and(|env_var| env_var.eq_ignore_ascii_case("none"))
    }

    /// Human-readable description of where the key was expected
    pub fn key_source(&self) -> String {
        match self.api_key_env {
            Some(ref env_var) => format!("{} is not set and no api_key is configured", env_var),
            None => "no api_key is configured".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or search the default locations:
    /// `<project_dir>/bumpfix.toml`, then `<config_dir>/bumpfix/config.toml`.
    pub fn load_with_path(path: Option<&str>, project_dir: &Path) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(config_path)
                .with_context(|| format!("failed to load config from {}", config_path));
        }

        let project_config = project_dir.join(CONFIG_FILE_NAME);
        if let Ok(config) = Self::load_from_path(&project_config) {
            debug!("Loaded config from {}", project_config.display());
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("bumpfix").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
