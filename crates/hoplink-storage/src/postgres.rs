use async_trait::async_trait;
use hoplink_core::error::StorageError;
use hoplink_core::mapping::{MappingPatch, OwnerQuery, Page, SortBy, SortOrder, UrlMapping};
use hoplink_core::repository::{ReadRepository, Repository};
use hoplink_core::shortcode::ShortCode;
use jiff::Timestamp;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::time::Duration;

type Result<T> = std::result::Result<T, StorageError>;

const SELECT_COLUMNS: &str = "short_code, long_url, owner_id, created_at, expires_at, \
     click_count, last_accessed, active, metadata";

/// Postgres implementation of the repository contract.
///
/// Soft delete flips `active` to false. Short codes are never reused,
/// including by soft-deleted rows, which preserves analytics history
/// with a single row per code. All timestamp columns hold integer Unix
/// seconds.
#[derive(Debug, Clone)]
pub struct PgMappingStore {
    pool: PgPool,
}

impl PgMappingStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a bounded connection pool against the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .max_lifetime(Duration::from_secs(5 * 60))
            .acquire_timeout(Duration::from_millis(500))
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_optional_timestamp(column: &str, seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds.map(|value| parse_timestamp(column, value)).transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn mapping_from_row(row: &PgRow) -> Result<UrlMapping> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let click_count: i64 = row.try_get("click_count").map_err(map_sqlx_error)?;
    let last_accessed: Option<i64> = row.try_get("last_accessed").map_err(map_sqlx_error)?;
    let active: bool = row.try_get("active").map_err(map_sqlx_error)?;
    let metadata: sqlx::types::Json<BTreeMap<String, String>> =
        row.try_get("metadata").map_err(map_sqlx_error)?;

    Ok(UrlMapping {
        short_code: ShortCode::new_unchecked(short_code),
        long_url,
        owner_id,
        created_at: parse_timestamp("created_at", created_at)?,
        expires_at: parse_optional_timestamp("expires_at", expires_at)?,
        click_count: click_count.max(0) as u64,
        last_accessed: parse_optional_timestamp("last_accessed", last_accessed)?,
        active,
        metadata: metadata.0,
    })
}

#[async_trait]
impl ReadRepository for PgMappingStore {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM url_mappings WHERE short_code = $1 LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(mapping_from_row).transpose()
    }

    async fn get_active(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM url_mappings \
             WHERE short_code = $1 AND active LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(mapping_from_row).transpose()
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM url_mappings WHERE short_code = $1 LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl Repository for PgMappingStore {
    async fn insert(&self, mapping: &UrlMapping) -> Result<()> {
        let metadata = sqlx::types::Json(&mapping.metadata);
        let created_at = mapping.created_at.as_second();

        let result = sqlx::query(
            r#"
            INSERT INTO url_mappings
                (short_code, long_url, owner_id, created_at, updated_at,
                 expires_at, click_count, active, metadata)
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(mapping.short_code.as_str())
        .bind(&mapping.long_url)
        .bind(&mapping.owner_id)
        .bind(created_at)
        .bind(mapping.expires_at.map(|ts| ts.as_second()))
        .bind(mapping.click_count as i64)
        .bind(mapping.active)
        .bind(metadata)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(mapping.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update(&self, code: &ShortCode, patch: MappingPatch) -> Result<Option<UrlMapping>> {
        let metadata = patch.metadata.map(sqlx::types::Json);

        let row = sqlx::query(&format!(
            r#"
            UPDATE url_mappings SET
                long_url   = COALESCE($2, long_url),
                expires_at = COALESCE($3, expires_at),
                metadata   = COALESCE($4, metadata),
                updated_at = $5
            WHERE short_code = $1 AND active
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(code.as_str())
        .bind(patch.long_url)
        .bind(patch.expires_at.map(|ts| ts.as_second()))
        .bind(metadata)
        .bind(now_unix_seconds())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(mapping_from_row).transpose()
    }

    async fn soft_delete(&self, code: &ShortCode) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE url_mappings
            SET active = FALSE, updated_at = $2
            WHERE short_code = $1 AND active
            "#,
        )
        .bind(code.as_str())
        .bind(now_unix_seconds())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        query: OwnerQuery,
    ) -> Result<Page<UrlMapping>> {
        let order_column = match query.sort_by {
            SortBy::CreatedAt => "created_at",
            SortBy::ClickCount => "click_count",
        };
        let order_direction = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        // Fetch one row beyond the page to learn whether more follow.
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM url_mappings \
             WHERE owner_id = $1 AND active \
             ORDER BY {order_column} {order_direction} \
             LIMIT $2 OFFSET $3"
        ))
        .bind(owner_id)
        .bind(i64::from(query.page_size) + 1)
        .bind(query.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let has_next = rows.len() > query.page_size as usize;
        let mut items = rows
            .iter()
            .map(mapping_from_row)
            .collect::<Result<Vec<_>>>()?;
        items.truncate(query.page_size as usize);

        Ok(Page { items, has_next })
    }

    async fn increment_click(&self, code: &ShortCode) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE url_mappings
            SET click_count = click_count + 1, last_accessed = $2
            WHERE short_code = $1
            "#,
        )
        .bind(code.as_str())
        .bind(now_unix_seconds())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn click_count(&self, code: &ShortCode) -> Result<Option<u64>> {
        let row = sqlx::query("SELECT click_count FROM url_mappings WHERE short_code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| {
            let count: i64 = row.try_get("click_count").map_err(map_sqlx_error)?;
            Ok(count.max(0) as u64)
        })
        .transpose()
    }
}
