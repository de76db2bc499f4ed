use std::time::Duration;
use time_tz::{TimeZone, Tz};

/// Scheduler and display settings from the `[draw]` section.
#[derive(Clone, Copy)]
pub struct DrawSettings {
    /// Zone in which administrators write and read draw deadlines.
    pub timezone: &'static Tz,
    /// How often the scheduler re-reads open events from the store.
    pub resync_interval: Duration,
}

impl std::fmt::Debug for DrawSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawSettings")
            .field("timezone", &self.timezone.name())
            .field("resync_interval", &self.resync_interval)
            .finish()
    }
}
