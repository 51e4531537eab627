use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_MOUNT_PREFIX: &str = "/app/";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preset endpoint that wins over every other source
    pub api_base: Option<String>,

    /// Endpoint used when nothing else applies
    pub default_endpoint: String,

    /// Path prefix under which the backend serves the client
    pub mount_prefix: String,

    /// Optional server-side overrides sent with every query
    pub request: RequestConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Ragchat home directory
    #[serde(skip)]
    pub ragchat_home: PathBuf,
}

/// Extra fields forwarded in the `/ask` body when set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub top_k: Option<u32>,
    pub provider: Option<String>,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_timestamps: true,
            tick_rate_ms: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: None,
            default_endpoint: DEFAULT_ENDPOINT.to_string(),
            mount_prefix: DEFAULT_MOUNT_PREFIX.to_string(),
            request: RequestConfig::default(),
            ui: UiConfig::default(),
            ragchat_home: default_home(),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".ragchat")
}

impl Config {
    /// Load configuration from `~/.ragchat/config.toml`
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let ragchat_home = home.join(".ragchat");
        Self::load_from(&ragchat_home.join("config.toml"))
    }

    /// Load configuration from an explicit file. The file's directory becomes
    /// the ragchat home, so storage and logs live next to it.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let ragchat_home = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        fs::create_dir_all(&ragchat_home)
            .context("Failed to create ragchat home directory")?;

        let mut config: Config = if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.ragchat_home = ragchat_home;
        Ok(config)
    }

    /// File backing the persisted endpoint
    pub fn storage_path(&self) -> PathBuf {
        self.ragchat_home.join("storage.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.ragchat_home.join("logs")
    }

    /// Preset endpoint, ignoring blank values
    pub fn preset_endpoint(&self) -> Option<&str> {
        self.api_base
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
