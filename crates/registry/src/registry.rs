//! The registry handle used while ingesting.
//!
//! Every statement runs inside one lazily-opened transaction, which
//! [`Registry::commit`] closes. Callers decide the batch size by choosing when
//! to commit; anything not yet committed is rolled back if the handle is
//! dropped without [`Registry::close`].

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Exposure, ExposureKey, ExposureRow, StoredExposure};
use exn::ResultExt;
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct Registry {
    db: Database,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl Registry {
    /// Create the registry at `output`, either empty or as a copy of `input`.
    ///
    /// Fails with [`ErrorKind::OutputExists`] if anything is already at
    /// `output`, and with [`ErrorKind::InputMissing`] if `input` is given but
    /// absent; in both cases nothing is written.
    #[instrument(level = "info", skip_all, fields(output = %output.as_ref().display()))]
    pub async fn create(output: impl AsRef<Path>, input: Option<&Path>) -> Result<Self> {
        let output = output.as_ref();
        if tokio::fs::try_exists(output).await.or_raise(|| ErrorKind::Io)? {
            exn::bail!(ErrorKind::OutputExists(output.to_path_buf()));
        }
        if let Some(input) = input {
            if !tokio::fs::try_exists(input).await.or_raise(|| ErrorKind::Io)? {
                exn::bail!(ErrorKind::InputMissing(input.to_path_buf()));
            }
            let bytes = tokio::fs::copy(input, output).await.or_raise(|| ErrorKind::Io)?;
            info!(input = %input.display(), bytes, "copied input registry");
        }
        let db = Database::connect(output, input.is_none()).await?;
        Ok(Self { db, tx: None })
    }

    /// A throwaway registry (useful for testing).
    pub async fn in_memory() -> Result<Self> {
        Ok(Self { db: Database::connect_in_memory().await?, tx: None })
    }

    /// The open batch transaction, beginning one if needed.
    ///
    /// Reads go through it too: the pool holds one connection, which the
    /// transaction keeps checked out.
    async fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.db.pool().begin().await.or_raise(|| ErrorKind::Database)?,
        };
        Ok(self.tx.insert(tx))
    }

    /// Whether an exposure with this key is already registered.
    pub async fn contains(&mut self, key: &ExposureKey) -> Result<bool> {
        let tx = self.tx().await?;
        sqlx::query_scalar(include_str!("../queries/contains_exposure.sql"))
            .bind(i64::from(key.run))
            .bind(i64::from(key.rerun))
            .bind(key.band.as_str())
            .bind(i64::from(key.camcol))
            .bind(i64::from(key.frame))
            .fetch_one(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Number of registered exposures.
    pub async fn count(&mut self) -> Result<u64> {
        let tx = self.tx().await?;
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_exposures.sql"))
            .fetch_one(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("exposure count"))
    }

    /// Register an exposure and return its new row id, or `None` if an
    /// exposure with the same key is already registered.
    #[instrument(level = "debug", skip_all, fields(key = %exposure.key))]
    pub async fn insert_exposure(&mut self, exposure: &Exposure) -> Result<Option<i64>> {
        let key = &exposure.key;
        let tx = self.tx().await?;
        sqlx::query_scalar(include_str!("../queries/insert_exposure.sql"))
            .bind(i64::from(key.run))
            .bind(i64::from(key.rerun))
            .bind(key.band.as_str())
            .bind(i64::from(key.camcol))
            .bind(i64::from(key.frame))
            .bind(&exposure.tai_obs)
            .bind(exposure.exp_time)
            .fetch_optional(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Record that exposure `id` overlaps each of `tiles`. Pairs already
    /// recorded are left alone.
    #[instrument(level = "debug", skip(self, tiles), fields(tiles = tiles.len()))]
    pub async fn insert_coverage(&mut self, id: i64, tiles: &[u64]) -> Result<()> {
        let tx = self.tx().await?;
        for tile in tiles {
            let tile = i64::try_from(*tile).or_raise(|| ErrorKind::InvalidData("sky tile"))?;
            sqlx::query(include_str!("../queries/insert_coverage.sql"))
                .bind(id)
                .bind(tile)
                .execute(&mut **tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    /// The registered exposure with this key.
    pub async fn exposure(&mut self, key: &ExposureKey) -> Result<Option<StoredExposure>> {
        let tx = self.tx().await?;
        let row: Option<ExposureRow> = sqlx::query_as(include_str!("../queries/get_exposure.sql"))
            .bind(i64::from(key.run))
            .bind(i64::from(key.rerun))
            .bind(key.band.as_str())
            .bind(i64::from(key.camcol))
            .bind(i64::from(key.frame))
            .fetch_optional(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(StoredExposure::try_from).transpose()
    }

    /// Tiles recorded for exposure `id`, ascending.
    pub async fn coverage(&mut self, id: i64) -> Result<Vec<u64>> {
        let tx = self.tx().await?;
        let tiles: Vec<i64> = sqlx::query_scalar(include_str!("../queries/list_coverage.sql"))
            .bind(id)
            .fetch_all(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tiles
            .into_iter()
            .map(|tile| u64::try_from(tile).or_raise(|| ErrorKind::InvalidData("sky tile")))
            .collect()
    }

    /// Commit the open batch, if there is one.
    pub async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.or_raise(|| ErrorKind::Database)?;
            debug!("committed batch");
        }
        Ok(())
    }

    /// Commit anything pending and close the database. The database is closed
    /// even if the commit fails.
    pub async fn close(mut self) -> Result<()> {
        debug!("cleaning up");
        let committed = self.commit().await;
        self.db.close().await;
        committed
    }
}
