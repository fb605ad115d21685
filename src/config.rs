//! Configuration management for the shortly CLI and SDK

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Result, ShortlyError};

const API_ROUTE: &str = "api";
const API_VERSION: &str = "v1";

/// Client configuration, read once at startup.
///
/// Values come from coded defaults, then an optional JSON config file,
/// then `SHORTLY_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin of the backend, e.g. `https://short.example.com`
    pub base_url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Session token lifetime in milliseconds
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime: i64,
    /// Display name, also used as the tracking user agent
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Directory holding the session file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    10_000
}

fn default_token_lifetime() -> i64 {
    24 * 60 * 60 * 1000
}

fn default_app_name() -> String {
    "shortly".to_string()
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shortly")
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shortly")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            token_lifetime: default_token_lifetime(),
            app_name: default_app_name(),
            storage_dir: default_storage_dir(),
        }
    }
}

impl Config {
    /// Load configuration from the default file location plus environment
    pub fn load() -> Result<Self> {
        Self::from_file_and_env(Some(default_config_path()))
    }

    /// Load configuration from a specific file plus environment
    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("base_url", default_base_url())?
            .set_default("timeout", default_timeout())?
            .set_default("token_lifetime", default_token_lifetime())?
            .set_default("app_name", default_app_name())?
            .set_default(
                "storage_dir",
                default_storage_dir().to_string_lossy().to_string(),
            )?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }
        builder = builder.add_source(Environment::with_prefix("SHORTLY").try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Persist the configuration as JSON
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ShortlyError::invalid_endpoint("Base URL cannot be empty"));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ShortlyError::invalid_endpoint(format!(
                "Base URL is not a valid URL: {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Compose a full API URL: `<base>/api/v1/<endpoint>`
    pub fn api_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            API_ROUTE,
            API_VERSION,
            endpoint
        )
    }

    /// Compose a URL directly against the configured origin, bypassing the
    /// API base. Used by the fallback-probing redirect and tracking paths,
    /// whose routes predate the versioned API prefix.
    pub fn origin_url(&self, route: &str) -> Result<String> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| ShortlyError::invalid_endpoint(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ShortlyError::invalid_endpoint("Base URL has no host"))?;

        let origin = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };
        Ok(format!("{}{}", origin, route))
    }

    /// Path of the durable session file
    pub fn session_path(&self) -> PathBuf {
        self.storage_dir.join("session.json")
    }

    /// User agent reported by access tracking
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.app_name, crate::version::CURRENT_VERSION)
    }
}

/// Handles the `config` subcommands
pub struct ConfigService {
    config: Config,
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            config_path: default_config_path(),
        }
    }

    pub fn with_config_path(config: Config, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn set_endpoint(&mut self, url: String) -> Result<()> {
        self.config.base_url = url;
        self.config.validate()?;
        self.config.save(&self.config_path).await
    }

    pub async fn set_timeout(&mut self, millis: u64) -> Result<()> {
        if millis == 0 {
            return Err(ShortlyError::validation("Timeout must be greater than 0"));
        }
        self.config.timeout = millis;
        self.config.save(&self.config_path).await
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.config = Config::default();
        self.config.save(&self.config_path).await
    }
}
