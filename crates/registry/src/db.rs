//! Database connection and pool management.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Writes go through one long-lived batch transaction; a second connection
// would only ever wait on it.
const MAX_CONNECTIONS: u32 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Connection pool for one registry file.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the registry at `path` and bring its schema up to date.
    ///
    /// With `create` unset the file must already exist.
    pub async fn connect(path: impl AsRef<Path>, create: bool) -> Result<Self> {
        Self::open(Self::options().filename(path.as_ref()).create_if_missing(create)).await
    }

    /// A private in-memory registry. Left public for other crates' tests.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Self::options().filename(":memory:")).await
    }

    async fn open(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .after_connect(|conn, _meta| Box::pin(async move { Self::tune(conn).await }))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn options() -> SqliteConnectOptions {
        // A registry is copied around as one file: no -wal/-shm sidecars.
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
    }

    async fn tune(conn: &mut SqliteConnection) -> sqlx::Result<()> {
        sqlx::query("PRAGMA temp_store = MEMORY; PRAGMA analysis_limit = 400;").execute(conn).await?;
        Ok(())
    }

    /// Create whatever part of the schema is missing. Every statement is
    /// `IF NOT EXISTS`, so registries written before migrations were tracked
    /// are upgraded in place.
    #[instrument(level = "debug", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Refresh planner statistics and close every connection. The handle is
    /// unusable afterwards.
    pub async fn close(&self) {
        if let Err(err) = sqlx::query("PRAGMA optimize").execute(&self.pool).await {
            debug!(error = %err, "PRAGMA optimize failed");
        }
        self.pool.close().await;
    }
}
