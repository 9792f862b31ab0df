// Application state module
// Shared, read-only state handed to every request

use super::types::Config;
use crate::store::EmployeeStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: EmployeeStore,
}

impl AppState {
    pub const fn new(config: Config, store: EmployeeStore) -> Self {
        Self { config, store }
    }

    /// Whether per-request access lines are written
    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
