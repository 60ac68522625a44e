//! Configuration management for the media cache
//!
//! Configuration comes from an optional TOML file with four sections
//! (`[cache]`, `[client]`, `[registry]`, `[logging]`). Every field has a
//! default, so a partial file, or no file at all, is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::registry::MediaRegistry;
use crate::app::ClientConfig;
use crate::constants::{files, http, limits, remote};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Cache location and housekeeping
    pub cache: CacheConfigToml,
    /// Remote store client settings
    pub client: ClientConfigToml,
    /// Media types and thumbnail sizes
    pub registry: MediaRegistry,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path (system cache directory when unset)
    pub cache_root: Option<PathBuf>,
    /// Age after which a temp file is considered abandoned, in seconds
    pub stale_temp_age_secs: u64,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            cache_root: None,
            stale_temp_age_secs: files::STALE_TEMP_AGE.as_secs(),
        }
    }
}

impl CacheConfigToml {
    /// Age after which a temp file is considered abandoned
    pub fn stale_temp_age(&self) -> Duration {
        Duration::from_secs(self.stale_temp_age_secs)
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfigToml {
    /// RPC endpoint base URL
    pub api_base_url: String,
    /// Content endpoint base URL
    pub content_base_url: String,
    /// TCP keep-alive in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Metadata and thumbnail request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            api_base_url: remote::API_BASE_URL.to_string(),
            content_base_url: remote::CONTENT_BASE_URL.to_string(),
            tcp_keepalive_secs: Some(http::TCP_KEEPALIVE.as_secs()),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    ///
    /// The access token is not part of the file; it comes from the environment.
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            api_base_url: self.api_base_url.clone(),
            content_base_url: self.content_base_url.clone(),
            access_token: None,
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed log level
    pub fn level(&self) -> ConfigResult<tracing::Level> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            })
    }
}

impl AppConfig {
    /// Load configuration from the first file found
    ///
    /// An explicit `config_file_override` must exist; otherwise the standard
    /// locations are searched and defaults are used when none exists.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Self::load_from_file(&path).await?
            }
            None => match Self::find_config_file() {
                Some(path) => Self::load_from_file(&path).await?,
                None => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.client.rate_limit_rps == 0 {
            return Err(invalid(
                "client.rate_limit_rps",
                "0".to_string(),
                "Rate limit must be greater than 0",
            ));
        }
        if self.client.request_timeout_secs == 0 {
            return Err(invalid(
                "client.request_timeout_secs",
                "0".to_string(),
                "Timeout must be greater than 0",
            ));
        }
        if let Err(e) = self.registry.validate() {
            return Err(invalid("registry", "<table>".to_string(), &e.to_string()));
        }
        self.logging.level()?;

        Ok(())
    }

    /// Cache root: CLI override, then config file, then the system cache directory
    pub fn resolve_cache_root(&self, cli_override: Option<&Path>) -> ConfigResult<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.cache.cache_root {
            return Ok(path.clone());
        }
        default_cache_root()
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(format!("./{}.toml", files::APP_DIR_NAME))];
        if let Ok(path) = Self::default_config_path() {
            search_paths.push(path);
        }
        #[cfg(unix)]
        search_paths.push(PathBuf::from(format!(
            "/etc/{}/config.toml",
            files::APP_DIR_NAME
        )));

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoPlatformDirectory {
            what: "user config",
        })?;

        Ok(config_dir.join(files::APP_DIR_NAME).join("config.toml"))
    }

    /// Write a commented default configuration to `path` unless one exists
    ///
    /// Returns `true` when a file was written.
    pub async fn write_default_config(path: &Path) -> ConfigResult<bool> {
        if path.exists() {
            return Ok(false);
        }

        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(io_error)?;

        info!("Wrote default configuration to {}", path.display());
        Ok(true)
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        let default_cache_path = default_cache_root().unwrap_or_else(|_| PathBuf::from("./cache"));
        let client = ClientConfigToml::default();

        let mut sizes = String::new();
        for size in &MediaRegistry::default().sizes {
            sizes.push_str(&format!(
                "\n[[registry.sizes]]\nlabel = \"{}\"\nremote_size = \"{}\"\n",
                size.label, size.remote_size
            ));
        }

        format!(
            r#"# Media Cache Configuration
# Every setting is optional; removed keys fall back to the values shown here.
# The access token is read from the {token_var} environment variable
# (a .env file in the working directory is honoured).

[cache]
# Cache directory (default: {cache_path})
# cache_root = "/path/to/custom/cache"

# Temp files older than this are removed by `cache sweep`
stale_temp_age_secs = {stale}

[client]
api_base_url = "{api}"
content_base_url = "{content}"
tcp_keepalive_secs = {keepalive}
tcp_nodelay = true
pool_idle_timeout_secs = {idle}
pool_max_per_host = {pool}
request_timeout_secs = {request}
connect_timeout_secs = {connect}
rate_limit_rps = {rps}

[logging]
level = "warn"  # error, warn, info, debug, trace

# Thumbnail sizes. Listing any size replaces the whole default list.
# Media types can be overridden the same way with [[registry.types]].
{sizes}"#,
            token_var = crate::constants::ENV_ACCESS_TOKEN,
            cache_path = default_cache_path.display(),
            stale = files::STALE_TEMP_AGE.as_secs(),
            api = client.api_base_url,
            content = client.content_base_url,
            keepalive = http::TCP_KEEPALIVE.as_secs(),
            idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            pool = client.pool_max_per_host,
            request = client.request_timeout_secs,
            connect = client.connect_timeout_secs,
            rps = client.rate_limit_rps,
            sizes = sizes,
        )
    }
}

/// Default cache root under the system cache directory
fn default_cache_root() -> ConfigResult<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(files::APP_DIR_NAME))
        .ok_or(ConfigError::NoPlatformDirectory {
            what: "user cache",
        })
}
