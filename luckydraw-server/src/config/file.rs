//! TOML file configuration structures.
//!
//! These structs directly map to the `luckydraw.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub draw: DrawConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Draw scheduling section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    /// IANA zone name in which draw deadlines are written, e.g. `Asia/Shanghai`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            resync_interval_secs: default_resync_interval(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_resync_interval() -> u64 {
    300
}

/// Chat gateway section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HMAC key shared with the gateway, used in both directions.
    pub secret: String,
}

/// Outgoing notification section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Gateway endpoint receiving signed notifications. Unset means log only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<Url>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    luckydraw_core::config::DEFAULT_MAX_ATTEMPTS
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "test-secret"

[draw]
timezone = "Asia/Shanghai"
resync_interval_secs = 60

[gateway]
secret = "gateway-secret"

[notifications]
webhook_url = "https://gateway.example.com/notify"
max_attempts = 3
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.draw.timezone, "Asia/Shanghai");
        assert_eq!(config.draw.resync_interval_secs, 60);
        assert_eq!(config.gateway.secret, "gateway-secret");
        assert_eq!(
            config.notifications.webhook_url.as_ref().map(Url::as_str),
            Some("https://gateway.example.com/notify")
        );
        assert_eq!(config.notifications.max_attempts, 3);
        assert!(!config.is_admin_secret_hashed());
    }

    #[test]
    fn test_optional_sections_default() {
        let toml_str = r#"
[server]

[admin]
secret = "$argon2id$v=19$m=19456,t=2,p=1$abc123"

[gateway]
secret = "gateway-secret"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.draw.timezone, "UTC");
        assert_eq!(config.draw.resync_interval_secs, 300);
        assert!(config.notifications.webhook_url.is_none());
        assert_eq!(config.notifications.max_attempts, 5);
        assert!(config.is_admin_secret_hashed());
    }

    #[test]
    fn test_rewrite_round_trip_keeps_missing_webhook_absent() {
        let config = FileConfig {
            server: ServerConfig {
                listen: default_listen_addr(),
            },
            admin: AdminConfig {
                secret: "s".to_string(),
            },
            draw: DrawConfig::default(),
            gateway: GatewayConfig {
                secret: "g".to_string(),
            },
            notifications: NotificationsConfig::default(),
        };
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("webhook_url"));
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.draw.timezone, "UTC");
    }
}
