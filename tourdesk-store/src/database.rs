use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tourdesk_core::CoreError;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Maps a driver error onto the core error space. Unique violations become
/// `Conflict` so the API can answer 400 instead of 500.
pub(crate) fn storage_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CoreError::Conflict("Record already exists".into())
        }
        _ => CoreError::StorageError(err.to_string()),
    }
}

/// An UPDATE that matched no row means the record is gone.
pub(crate) fn expect_affected(rows: u64, missing: impl FnOnce() -> String) -> Result<(), CoreError> {
    if rows == 0 {
        return Err(CoreError::NotFound(missing()));
    }
    Ok(())
}
