use std::sync::Arc;

use rusqlite::Connection;

use super::error::ApiError;
use crate::config::AppConfig;
use crate::storage::Pool;

/// Shared handler context: the connection pool plus startup configuration.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: Pool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    /// Run a blocking store call on a pooled connection off the async workers.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<T> {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(anyhow::Error::from)?;

        result.map_err(ApiError::from)
    }
}
