use crate::config::{AppConfig, AppConfigError};
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbBackend};
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// How long a caller queues for a connection once the pool is exhausted
    pub acquire_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

// The url embeds the store password.
impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout", &self.connect_timeout)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}

impl TryFrom<&AppConfig> for DbConfig {
    type Error = AppConfigError;

    fn try_from(cfg: &AppConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            url: cfg.database_url()?,
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
        })
    }
}

/// Establishes the process-wide connection pool.
///
/// # Errors
/// Returns `ServiceError::StartupFailure` if the pool cannot be created; the
/// caller must not start serving traffic in that case.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    info!(
        "Connecting to database with min_connections={} max_connections={}",
        config.min_connections, config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database pool creation failed: {}", e);
        ServiceError::StartupFailure(format!("database pool creation failed: {}", e))
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg = DbConfig::try_from(cfg)
        .map_err(|e| ServiceError::StartupFailure(e.to_string()))?;
    // The pool grows one connection at a time on demand.
    debug!(
        "Configured pool increment {} is advisory",
        cfg.db_pool_increment
    );
    establish_connection_with_config(&db_cfg).await
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::StoreFailure);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => debug!("Database connection check successful in {:?}", elapsed),
        Err(e) => error!(
            "Database connection check failed after {:?}: {}",
            elapsed, e
        ),
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");
    pool.close().await.map_err(ServiceError::StoreFailure)
}

/// Pseudo-column exposing physical row position, used as a last-resort
/// ordering tie-break.
pub fn physical_row_column(backend: DbBackend) -> Option<&'static str> {
    match backend {
        DbBackend::Postgres => Some("ctid"),
        DbBackend::Sqlite => Some("rowid"),
        DbBackend::MySql => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let cfg = DbConfig {
            url: "postgres://sales:hunter2@db:5432/sh".into(),
            ..Default::default()
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("sales:***@db:5432/sh"));
    }

    #[test]
    fn db_config_follows_app_config() {
        let mut app = AppConfig::with_database_url("sqlite://orders.db?mode=rwc");
        app.db_max_connections = 4;
        app.db_min_connections = 1;
        let cfg = DbConfig::try_from(&app).unwrap();
        assert_eq!(cfg.url, "sqlite://orders.db?mode=rwc");
        assert_eq!(cfg.max_connections, 4);
        assert_eq!(cfg.min_connections, 1);
    }

    #[test]
    fn physical_row_column_per_backend() {
        assert_eq!(physical_row_column(DbBackend::Postgres), Some("ctid"));
        assert_eq!(physical_row_column(DbBackend::Sqlite), Some("rowid"));
        assert_eq!(physical_row_column(DbBackend::MySql), None);
    }

    #[tokio::test]
    async fn unreachable_store_is_a_startup_failure() {
        let cfg = DbConfig {
            url: "sqlite:///nonexistent-dir/for/sure/orders.db?mode=ro".into(),
            connect_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(1),
            min_connections: 1,
            ..Default::default()
        };
        let err = establish_connection_with_config(&cfg).await.unwrap_err();
        assert!(matches!(err, ServiceError::StartupFailure(_)));
    }
}
