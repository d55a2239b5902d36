pub mod api;
pub mod auth;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::core_state::{CoreError, CoreState};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Admin bootstrap failed: {0}")]
    Auth(#[from] auth::AuthError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Load configuration, connect the database and serve until shutdown.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("healthdir starting v{}", config::APP_VERSION);

    let config = config::Config::load()?;
    config.log_summary();
    api::error::hide_internal_details(config.environment.is_production());

    let core = Arc::new(CoreState::new(config));
    core.connect().await?;

    {
        let conn = core.open_db()?;
        let purged = db::sessions::purge_expired(&conn).map_err(CoreError::from)?;
        if purged > 0 {
            tracing::info!(purged, "Expired sessions removed");
        }
        auth::seed_admin(&conn, &core.config)?;
    }

    api::serve(ApiContext::new(core)).await?;
    Ok(())
}
