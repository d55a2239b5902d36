use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

/// Application-level constants
pub const APP_NAME: &str = "healthdir";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File loaded into the environment before anything else in development.
pub const DEV_ENV_FILE: &str = "config.env";

/// Origins allowed when `CORS_ORIGINS` is not set.
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "https://v-web-five.vercel.app",
    "https://v-web-frontend-flame.vercel.app",
    "https://v-web-frontend-s8pe.vercel.app",
    "https://v-web-frontend-gaci.vercel.app",
    "https://v-web-frontend-beta.vercel.app",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub db_connect_attempts: u32,
    pub db_retry_delay: Duration,
    pub uploads_dir: PathBuf,
    pub public_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub token_ttl_hours: i64,
    pub password_iterations: u32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Load from the process environment. In development, `config.env`
    /// is merged into the environment first.
    pub fn load() -> Result<Self, ConfigError> {
        let environment: Environment = try_load("APP_ENV", "development")?;

        if environment == Environment::Development {
            match dotenv::from_filename(DEV_ENV_FILE) {
                Ok(path) => info!(path = %path.display(), "Loaded development environment file"),
                Err(_) => warn!("{DEV_ENV_FILE} not found, using process environment variables"),
            }
        }

        let db_connect_attempts: u32 = try_load("DB_CONNECT_ATTEMPTS", "3")?;
        if db_connect_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_CONNECT_ATTEMPTS".into(),
                reason: "must be at least 1".into(),
            });
        }

        let database_path = var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

        Ok(Self {
            environment,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "6003")?,
            database_path,
            db_connect_attempts,
            db_retry_delay: Duration::from_millis(try_load("DB_RETRY_DELAY_MS", "2000")?),
            uploads_dir: try_load::<String>("UPLOADS_DIR", "Uploads")?.into(),
            public_dir: try_load::<String>("PUBLIC_DIR", "public")?.into(),
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", "5242880")?,
            cors_origins,
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", "168")?,
            password_iterations: try_load("PASSWORD_ITERATIONS", "600000")?,
            admin_email: var("ADMIN_EMAIL"),
            admin_password: var("ADMIN_PASSWORD"),
        })
    }

    /// Log a redacted summary of the loaded configuration.
    pub fn log_summary(&self) {
        info!(
            environment = %self.environment,
            port = self.port,
            database = %self.database_path.display(),
            uploads = %self.uploads_dir.display(),
            admin_seed = if self.admin_email.is_some() && self.admin_password.is_some() { "Set" } else { "Not set" },
            "Configuration loaded"
        );
    }

    /// Configuration rooted in a scratch directory, with cheap password hashing.
    #[cfg(test)]
    pub fn for_tests(dir: &Path) -> Self {
        Self {
            environment: Environment::Test,
            host: "127.0.0.1".into(),
            port: 0,
            database_path: dir.join("healthcare.db"),
            db_connect_attempts: 1,
            db_retry_delay: Duration::from_millis(1),
            uploads_dir: dir.join("Uploads"),
            public_dir: dir.join("public"),
            max_upload_bytes: 1024,
            cors_origins: vec!["http://localhost:5173".into()],
            token_ttl_hours: 1,
            password_iterations: 1_000,
            admin_email: None,
            admin_password: None,
        }
    }
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "healthdir=info,tower_http=warn"
}

/// `<local data dir>/healthdir/healthcare.db`, or `./healthcare.db` when
/// the platform has no data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_NAME).join("healthcare.db"))
        .unwrap_or_else(|| Path::new("healthcare.db").to_path_buf())
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
