//! Shared application state.
//!
//! `CoreState` owns the configuration and tracks whether the database is
//! reachable. Handlers open a short-lived connection per request through
//! [`CoreState::open_db`]; SQLite connections are cheap and WAL mode lets
//! readers and a writer proceed concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rusqlite::Connection;
use thiserror::Error;

use crate::config::Config;
use crate::db::{self, DatabaseError};

pub struct CoreState {
    pub config: Config,
    connected: AtomicBool,
    started_at: Instant,
}

impl CoreState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
            started_at: Instant::now(),
        }
    }

    /// Bring the database up with the configured retry policy.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let result = db::connect_with_retry(
            &self.config.database_path,
            self.config.db_connect_attempts,
            self.config.db_retry_delay,
        )
        .await;

        match result {
            Ok(_) => {
                self.connected.store(true, Ordering::SeqCst);
                tracing::info!(path = %self.config.database_path.display(), "Database connected");
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(CoreError::Database(e))
            }
        }
    }

    /// Open a connection for one request. Fails fast while disconnected;
    /// a failed open flips the state to disconnected.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        if !self.is_connected() {
            return Err(CoreError::Disconnected);
        }
        db::open_database(&self.config.database_path).map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            tracing::error!(error = %e, "Database connection lost");
            CoreError::Database(e)
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// "Connected" or "Disconnected", as reported by the status endpoints.
    pub fn db_status(&self) -> &'static str {
        if self.is_connected() {
            "Connected"
        } else {
            "Disconnected"
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    #[cfg(test)]
    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database is not connected")]
    Disconnected,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_disconnected_then_connects() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::new(Config::for_tests(dir.path()));
        assert!(!core.is_connected());
        assert_eq!(core.db_status(), "Disconnected");
        assert!(matches!(core.open_db(), Err(CoreError::Disconnected)));

        core.connect().await.unwrap();
        assert!(core.is_connected());
        assert_eq!(core.db_status(), "Connected");
        assert!(core.open_db().is_ok());
    }

    #[tokio::test]
    async fn failed_connect_stays_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let mut config = Config::for_tests(dir.path());
        config.database_path = blocker.join("healthcare.db");
        let core = CoreState::new(config);

        assert!(core.connect().await.is_err());
        assert!(!core.is_connected());
    }
}
