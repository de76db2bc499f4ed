//! Configuration module for luckydraw-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{AdminConfig, GatewayConfig, ServerConfig, SharedConfig};
use luckydraw_core::config::{DrawSettings, NotifierConfig};
use luckydraw_core::utils::trigger_time::{TriggerTimeError, parse_time_zone};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("invalid draw time zone: {0}")]
    TimeZone(#[from] TriggerTimeError),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub gateway: GatewayConfig,
    pub draw: DrawSettings,
    pub notifier: NotifierConfig,
}

impl LoadedConfig {
    /// Split the reloadable sections into separately locked parts.
    ///
    /// The notifier section is returned as-is; it lives in a
    /// [`ConfigStore`](luckydraw_core::config::ConfigStore) watched by the
    /// notification sender.
    pub fn into_shared(self) -> (SharedConfig, NotifierConfig) {
        let shared = SharedConfig {
            server: Arc::new(RwLock::new(self.server)),
            admin: Arc::new(RwLock::new(self.admin)),
            gateway: Arc::new(RwLock::new(self.gateway)),
            draw: Arc::new(RwLock::new(self.draw)),
        };
        (shared, self.notifier)
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        let draw = self.validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = self.hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(build_loaded_config(file_config, secret_hash, draw))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<DrawSettings, ConfigError> {
        if config.admin.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "admin secret must not be empty".to_string(),
            ));
        }
        if config.gateway.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway secret must not be empty".to_string(),
            ));
        }
        if config.draw.resync_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "draw.resync_interval_secs must be at least 1".to_string(),
            ));
        }
        if config.notifications.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(DrawSettings {
            timezone: parse_time_zone(&config.draw.timezone)?,
            resync_interval: Duration::from_secs(config.draw.resync_interval_secs),
        })
    }

    fn hash_secret(&self, plaintext: &str) -> Result<String, ConfigError> {
        use argon2::{
            Argon2, PasswordHasher,
            password_hash::{SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ConfigError::HashError(e.to_string()))
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn build_loaded_config(
    file_config: FileConfig,
    secret_hash: String,
    draw: DrawSettings,
) -> LoadedConfig {
    let gateway_secret = file_config.gateway.secret.into_bytes();
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        notifier: NotifierConfig {
            webhook_url: file_config.notifications.webhook_url,
            signing_key: gateway_secret.clone(),
            max_attempts: file_config.notifications.max_attempts,
        },
        gateway: GatewayConfig::new(gateway_secret),
        draw,
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
