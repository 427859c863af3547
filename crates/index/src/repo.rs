use crate::error::{ErrorKind, Result};
use crate::models::MediaRow;
use crate::{Database, MediaAsset, MediaIndex, NewAsset};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;
use tracing::instrument;

/// SQLite-backed [`MediaIndex`].
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaIndex for Repository {
    #[instrument(skip_all, fields(filename = %asset.filename))]
    async fn insert(&self, asset: &NewAsset) -> Result<MediaAsset> {
        let size = i64::try_from(asset.size_bytes).or_raise(|| ErrorKind::InvalidData("size"))?;
        let inserted = sqlx::query_as::<_, MediaRow>(include_str!("../queries/insert_asset.sql"))
            .bind(&asset.filename)
            .bind(asset.media_type.as_str())
            .bind(&asset.mime_type)
            .bind(size)
            .bind(UtcDateTime::now().unix_timestamp())
            .fetch_one(&self.pool)
            .await;
        let row = match inserted {
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                exn::bail!(ErrorKind::Duplicate(asset.filename.clone()))
            },
            other => other.or_raise(|| ErrorKind::Database)?,
        };
        tracing::debug!("Media asset recorded");
        row.try_into()
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Option<MediaAsset>> {
        let row: Option<MediaRow> = sqlx::query_as(include_str!("../queries/get_by_filename.sql"))
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(MediaAsset::try_from).transpose()
    }

    async fn find_by_filenames(&self, filenames: &[String]) -> Result<Vec<MediaAsset>> {
        if filenames.is_empty() {
            return Ok(Vec::new());
        }
        // Bound as a single JSON array so the statement stays static.
        let names = serde_json::to_string(filenames).or_raise(|| ErrorKind::InvalidData("filenames"))?;
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/find_by_filenames.sql"))
            .bind(names)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(MediaAsset::try_from).collect()
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_filenames(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(include_str!("../queries/list_filenames.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_by_filename.sql"))
            .bind(filename)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
