// Application state module
// Immutable state shared by every connection

use super::types::Config;
use crate::handler::Router;

/// Application state
///
/// Built once at startup and shared behind an `Arc`; nothing in it
/// changes while the server runs.
pub struct AppState {
    pub config: Config,
    pub router: Router,
}

impl AppState {
    pub const fn new(config: Config, router: Router) -> Self {
        Self { config, router }
    }

    /// Whether per-request access log lines are written
    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
