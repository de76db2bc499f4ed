//! Validated configuration held by the running server.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use luckydraw_core::config::DrawSettings;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Admin authentication.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// The argon2 hashed admin secret.
    pub secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Verify a plaintext secret against the stored hash.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Key for requests signed by the chat gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    secret: Box<[u8]>,
}

impl GatewayConfig {
    pub fn new(secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}

/// Shared configuration state with separate locks for each section.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub admin: Arc<RwLock<AdminConfig>>,
    pub gateway: Arc<RwLock<GatewayConfig>>,
    /// Only the time zone is picked up on reload; the resync interval is read
    /// once at startup.
    pub draw: Arc<RwLock<DrawSettings>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{
        PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    #[test]
    fn test_verify_secret() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"open-sesame", &salt)
            .unwrap()
            .to_string();
        let admin = AdminConfig::new(hash);

        assert!(admin.verify_secret("open-sesame"));
        assert!(!admin.verify_secret("open sesame"));
    }

    #[test]
    fn test_unparseable_hash_rejects_everything() {
        let admin = AdminConfig::new("plaintext".to_string());
        assert!(!admin.verify_secret("plaintext"));
    }
}
