use std::collections::HashMap;
use std::sync::Arc;

use model::{DataSource, DataSourceName, Driver};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::{Mutex, OnceCell};

use crate::error::SourceError;

const DEFAULT_POOL_SIZE: u32 = 4;

#[derive(Clone)]
enum Pool {
    Postgres(sqlx::PgPool),
    Sqlite(sqlx::SqlitePool),
}

/// C1: the Data Source Registry. Owns one lazily-established, bounded
/// connection pool per declared data source (spec §5: "each worker may draw
/// from a bounded connection pool, default 4 per data source"). ODBC
/// (`sql-access`) connections are opened fresh per query, since `odbc-api`'s
/// `Environment` is not `Sync` and cheap per-statement connections are the
/// documented usage pattern for that crate.
pub struct ConnectionRegistry {
    pools: Mutex<HashMap<DataSourceName, Arc<OnceCell<Pool>>>>,
    pool_size: u32,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        ConnectionRegistry {
            pools: Mutex::new(HashMap::new()),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl ConnectionRegistry {
    pub fn with_pool_size(pool_size: u32) -> Self {
        ConnectionRegistry {
            pools: Mutex::new(HashMap::new()),
            pool_size,
        }
    }

    async fn cell_for(&self, name: &DataSourceName) -> Arc<OnceCell<Pool>> {
        let mut pools = self.pools.lock().await;
        pools
            .entry(name.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    #[tracing::instrument(skip(self, source), fields(data_source = %name))]
    pub async fn pg_pool(
        &self,
        name: &DataSourceName,
        source: &DataSource,
    ) -> Result<sqlx::PgPool, SourceError> {
        let cell = self.cell_for(name).await;
        let pool = cell
            .get_or_try_init(|| async {
                let url = connection_url(name, source)?;
                PgPoolOptions::new()
                    .max_connections(self.pool_size)
                    .connect(&url)
                    .await
                    .map(Pool::Postgres)
                    .map_err(|e| SourceError::Connection(name.clone(), e.to_string()))
            })
            .await?;
        match pool {
            Pool::Postgres(p) => Ok(p.clone()),
            Pool::Sqlite(_) => Err(SourceError::Connection(
                name.clone(),
                "data source was previously opened as sqlite".into(),
            )),
        }
    }

    #[tracing::instrument(skip(self, source), fields(data_source = %name))]
    pub async fn sqlite_pool(
        &self,
        name: &DataSourceName,
        source: &DataSource,
    ) -> Result<sqlx::SqlitePool, SourceError> {
        let cell = self.cell_for(name).await;
        let pool = cell
            .get_or_try_init(|| async {
                let url = connection_url(name, source)?;
                SqlitePoolOptions::new()
                    .max_connections(self.pool_size)
                    .connect(&url)
                    .await
                    .map(Pool::Sqlite)
                    .map_err(|e| SourceError::Connection(name.clone(), e.to_string()))
            })
            .await?;
        match pool {
            Pool::Sqlite(p) => Ok(p.clone()),
            Pool::Postgres(_) => Err(SourceError::Connection(
                name.clone(),
                "data source was previously opened as postgres".into(),
            )),
        }
    }

    /// `sql-access` connections go through ODBC directly: build a DSN-less
    /// connection string from `source.parameters["dsn"]` (or `"odbc_connection_string"`
    /// verbatim, if set).
    pub fn odbc_connection_string(
        name: &DataSourceName,
        source: &DataSource,
    ) -> Result<String, SourceError> {
        if let Some(raw) = source.parameter("odbc_connection_string") {
            return Ok(raw.to_string());
        }
        let dbq = source.parameter("path").ok_or_else(|| {
            SourceError::Connection(
                name.clone(),
                "missing `path` parameter for sql-access data source".into(),
            )
        })?;
        Ok(format!(
            "Driver={{Microsoft Access Driver (*.mdb, *.accdb)}};Dbq={dbq};"
        ))
    }
}

fn connection_url(name: &DataSourceName, source: &DataSource) -> Result<String, SourceError> {
    match source.driver {
        Driver::SqlPostgres | Driver::SqlSqlite => source
            .parameter("url")
            .map(str::to_string)
            .ok_or_else(|| {
                SourceError::Connection(name.clone(), "missing `url` parameter".to_string())
            }),
        other => Err(SourceError::Connection(
            name.clone(),
            format!("driver {other:?} is not a pooled SQL driver"),
        )),
    }
}
