//! Database-backed cache store.
//!
//! Items live in one table with four columns: the key, the JSON value, the
//! lifetime in seconds (`NULL` for none) and the Unix time of the write.
//! Any driver registered with `sqlx::any` works; SQLite, PostgreSQL and
//! MySQL are built in.

use crate::config::{StoreConfig, unix_now};
use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use std::time::Duration;
use tracing::debug;

/// Table and column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    pub table: String,
    pub id_col: String,
    pub data_col: String,
    pub lifetime_col: String,
    pub time_col: String,
}

impl Default for DatabaseSchema {
    fn default() -> Self {
        Self {
            table: "cache_items".to_string(),
            id_col: "item_id".to_string(),
            data_col: "item_data".to_string(),
            lifetime_col: "item_lifetime".to_string(),
            time_col: "item_time".to_string(),
        }
    }
}

impl DatabaseSchema {
    /// Check that every name is a plain identifier and that columns are distinct.
    pub fn validate(&self) -> CacheResult<()> {
        let names = [
            &self.table,
            &self.id_col,
            &self.data_col,
            &self.lifetime_col,
            &self.time_col,
        ];

        for name in names {
            let plain = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit());
            if !plain {
                return Err(CacheError::Config(format!("invalid SQL identifier \"{}\"", name)));
            }
        }

        let columns = &names[1..];
        for (i, a) in columns.iter().enumerate() {
            if columns[i + 1..].contains(a) {
                return Err(CacheError::Config(format!(
                    "column \"{}\" is used for more than one purpose in table \"{}\"",
                    a, self.table
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    fn from_scheme(scheme: &str) -> Self {
        match scheme {
            "postgres" | "postgresql" => Self::Postgres,
            "mysql" | "mariadb" => Self::MySql,
            _ => Self::Sqlite,
        }
    }

    /// Bind placeholder for the `n`th (1-based) parameter.
    fn param(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::Sqlite | Self::MySql => "?".to_string(),
        }
    }

    fn key_type(self) -> &'static str {
        match self {
            Self::Sqlite => "TEXT",
            Self::Postgres | Self::MySql => "VARCHAR(255)",
        }
    }

    fn data_type(self) -> &'static str {
        match self {
            Self::MySql => "MEDIUMTEXT",
            Self::Sqlite | Self::Postgres => "TEXT",
        }
    }
}

/// Cache store over an `sqlx` Any pool.
pub struct DatabaseCache {
    pool: AnyPool,
    schema: DatabaseSchema,
    config: StoreConfig,
    dialect: Dialect,
}

impl DatabaseCache {
    /// Create a store over `pool`.
    ///
    /// The schema is checked on every operation, so a store with an unusable
    /// schema can be built but fails when used.
    pub fn new(
        pool: AnyPool,
        schema: DatabaseSchema,
        namespace: impl Into<String>,
        default_lifetime: u64,
    ) -> Self {
        let dialect = Dialect::from_scheme(pool.connect_options().database_url.scheme());
        Self {
            pool,
            schema,
            config: StoreConfig::new()
                .with_namespace(namespace)
                .with_default_lifetime(default_lifetime),
            dialect,
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn default_lifetime(&self) -> u64 {
        self.config.default_lifetime
    }

    /// Create the cache table if it does not exist.
    pub async fn create_table(&self) -> CacheResult<()> {
        self.schema.validate()?;
        let s = &self.schema;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} ({id} {key_type} NOT NULL PRIMARY KEY, {data} {data_type} NOT NULL, {lifetime} BIGINT, {time} BIGINT NOT NULL)",
            table = s.table,
            id = s.id_col,
            key_type = self.dialect.key_type(),
            data = s.data_col,
            data_type = self.dialect.data_type(),
            lifetime = s.lifetime_col,
            time = s.time_col,
        );

        debug!(table = %s.table, "Creating cache table");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Delete expired rows.
    pub async fn prune(&self) -> CacheResult<u64> {
        self.schema.validate()?;
        let s = &self.schema;

        let sql = format!(
            "DELETE FROM {table} WHERE {lifetime} IS NOT NULL AND {lifetime} + {time} <= {p1}",
            table = s.table,
            lifetime = s.lifetime_col,
            time = s.time_col,
            p1 = self.dialect.param(1),
        );

        let result = sqlx::query(&sql)
            .bind(now_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn now_i64() -> i64 {
    i64::try_from(unix_now()).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheStore for DatabaseCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        self.schema.validate()?;
        let id = self.config.build_key(key)?;
        let s = &self.schema;

        let sql = format!(
            "SELECT {data} FROM {table} WHERE {id} = {p1} AND ({lifetime} IS NULL OR {lifetime} + {time} > {p2})",
            data = s.data_col,
            table = s.table,
            id = s.id_col,
            lifetime = s.lifetime_col,
            time = s.time_col,
            p1 = self.dialect.param(1),
            p2 = self.dialect.param(2),
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(now_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<String, _>(0)?)),
            None => Ok(None),
        }
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        self.schema.validate()?;
        let id = self.config.build_key(key)?;
        let now = now_i64();
        // A lifetime whose expiry overflows the column is stored as none
        let lifetime = self
            .config
            .effective_ttl(ttl)
            .and_then(|ttl| i64::try_from(ttl.as_secs().max(1)).ok())
            .filter(|lifetime| now.checked_add(*lifetime).is_some());
        let s = &self.schema;

        let delete = format!(
            "DELETE FROM {table} WHERE {id} = {p1}",
            table = s.table,
            id = s.id_col,
            p1 = self.dialect.param(1),
        );
        let insert = format!(
            "INSERT INTO {table} ({id}, {data}, {lifetime}, {time}) VALUES ({p1}, {p2}, {p3}, {p4})",
            table = s.table,
            id = s.id_col,
            data = s.data_col,
            lifetime = s.lifetime_col,
            time = s.time_col,
            p1 = self.dialect.param(1),
            p2 = self.dialect.param(2),
            p3 = self.dialect.param(3),
            p4 = self.dialect.param(4),
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query(&delete).bind(id.clone()).execute(&mut *tx).await?;
        sqlx::query(&insert)
            .bind(id)
            .bind(value)
            .bind(lifetime)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.schema.validate()?;
        let id = self.config.build_key(key)?;

        let sql = format!(
            "DELETE FROM {table} WHERE {id} = {p1}",
            table = self.schema.table,
            id = self.schema.id_col,
            p1 = self.dialect.param(1),
        );
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.schema.validate()?;
        let s = &self.schema;

        match self.config.scoped_prefix(prefix) {
            Some(prefix) => {
                let sql = format!(
                    "DELETE FROM {table} WHERE SUBSTR({id}, 1, {len}) = {p1}",
                    table = s.table,
                    id = s.id_col,
                    len = prefix.chars().count(),
                    p1 = self.dialect.param(1),
                );
                sqlx::query(&sql).bind(prefix).execute(&self.pool).await?;
            }
            None => {
                sqlx::query(&format!("DELETE FROM {}", s.table))
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }
}
