use url::Url;

/// Default number of delivery attempts per notification.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Where and how draw notifications are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Gateway webhook. When `None` notifications are only logged.
    pub webhook_url: Option<Url>,
    /// HMAC key shared with the gateway.
    pub signing_key: Vec<u8>,
    pub max_attempts: u32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            signing_key: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
