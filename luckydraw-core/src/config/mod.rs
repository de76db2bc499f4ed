//! Runtime configuration shared between the server and the processors.
//!
//! Loading and parsing of the TOML file lives in the server crate; these are
//! the validated values it hands to the core.

mod config_store;
mod draw;
mod notifier;

pub use config_store::{ConfigStore, ConfigWatcher};
pub use draw::DrawSettings;
pub use notifier::{DEFAULT_MAX_ATTEMPTS, NotifierConfig};
