//! Shared application state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::fetcher::Fetcher;

/// The published pipeline snapshot exposed to the metadata endpoint.
/// Replaced as one unit; readers never observe a partial update.
#[derive(Debug, Clone, Copy)]
pub struct Published {
    pub captured_at: DateTime<Utc>,
}

/// State owned by the process entry point and injected into every task
/// and handler.
pub struct AppState {
    pub config: Config,
    pub fetcher: Arc<Fetcher>,
    published: RwLock<Option<Published>>,
}

impl AppState {
    pub fn new(config: Config, fetcher: Arc<Fetcher>) -> Self {
        Self {
            config,
            fetcher,
            published: RwLock::new(None),
        }
    }

    pub async fn published(&self) -> Option<Published> {
        *self.published.read().await
    }

    /// Atomically swap the published snapshot.
    pub async fn set_published(&self, published: Published) {
        *self.published.write().await = Some(published);
    }
}
