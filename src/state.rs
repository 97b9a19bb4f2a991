//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;

/// Configuration and database, passed to every command.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Database handle.
    pub db: Arc<Database>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: Config, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
        }
    }
}
