use model::{ColumnName, DataSourceName, Driver, Entity, EntityName, Project};
use sqlx::{Column, Row};
use tables::{Table, Value};

use crate::error::SourceError;
use crate::pool::ConnectionRegistry;

/// C2, `kind: sql`: execute `query` (or `SELECT * FROM table`) against the
/// entity's `data_source` (spec §4.2).
pub async fn load(
    name: &EntityName,
    entity: &Entity,
    project: &Project,
    registry: &ConnectionRegistry,
) -> Result<Table, SourceError> {
    let ds_name = entity
        .data_source
        .as_ref()
        .ok_or_else(|| SourceError::MissingDataSource(name.clone()))?;
    let data_source = project
        .data_source(ds_name)
        .ok_or_else(|| SourceError::UnknownDataSource(ds_name.clone()))?;

    let query_text = match (&entity.query, &entity.table) {
        (Some(q), _) => q.clone(),
        (None, Some(t)) => format!("SELECT * FROM {t}"),
        (None, None) => return Err(SourceError::MissingQueryOrTable(name.clone())),
    };

    query(ds_name, data_source, &query_text, registry).await
}

/// Executes a raw SQL statement against a named data source and returns its
/// result set as a [`Table`]. Used directly by `kind: sql` entities (via
/// [`load`]) and by the Transform Kernel's `append: {type: sql}` step,
/// which has no `Entity` of its own to dispatch on (spec §4.3.2).
pub async fn query(
    ds_name: &DataSourceName,
    data_source: &model::DataSource,
    query_text: &str,
    registry: &ConnectionRegistry,
) -> Result<Table, SourceError> {
    match data_source.driver {
        Driver::SqlPostgres => {
            let pool = registry.pg_pool(ds_name, data_source).await?;
            let rows = sqlx::query(query_text)
                .fetch_all(&pool)
                .await
                .map_err(|e| SourceError::Query(ds_name.clone(), e))?;
            postgres_rows_to_table(&rows)
        }
        Driver::SqlSqlite => {
            let pool = registry.sqlite_pool(ds_name, data_source).await?;
            let rows = sqlx::query(query_text)
                .fetch_all(&pool)
                .await
                .map_err(|e| SourceError::Query(ds_name.clone(), e))?;
            sqlite_rows_to_table(&rows)
        }
        Driver::SqlAccess => {
            let conn_str = ConnectionRegistry::odbc_connection_string(ds_name, data_source)?;
            load_via_odbc(ds_name, &conn_str, query_text)
        }
        other => Err(SourceError::Connection(
            ds_name.clone(),
            format!("driver {other:?} cannot execute kind=sql queries"),
        )),
    }
}

fn postgres_rows_to_table(rows: &[sqlx::postgres::PgRow]) -> Result<Table, SourceError> {
    let columns = column_names(rows.first());
    let mut table = Table::new(columns);
    for row in rows {
        let values: Vec<Value> = (0..row.columns().len())
            .map(|i| postgres_value(row, i))
            .collect();
        table.push_row(values)?;
    }
    Ok(table)
}

fn sqlite_rows_to_table(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Table, SourceError> {
    let columns = column_names(rows.first());
    let mut table = Table::new(columns);
    for row in rows {
        let values: Vec<Value> = (0..row.columns().len())
            .map(|i| sqlite_value(row, i))
            .collect();
        table.push_row(values)?;
    }
    Ok(table)
}

fn column_names<R: Row>(row: Option<&R>) -> Vec<ColumnName> {
    row.map(|r| r.columns().iter().map(|c| ColumnName::new(c.name())).collect())
        .unwrap_or_default()
}

/// Decodes a Postgres cell without knowing its static type, by attempting
/// each candidate Rust type in turn and falling back to `Null` only when
/// every decode attempt fails outright (e.g. a genuinely NULL cell).
fn postgres_value(row: &sqlx::postgres::PgRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map(|d| Value::Text(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    Value::Null
}

fn sqlite_value(row: &sqlx::sqlite::SqliteRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    Value::Null
}

/// `sql-access`: each query opens its own ODBC connection (`odbc-api`'s
/// `Environment` is `!Sync`, so it cannot be pooled the way the sqlx drivers
/// are) and runs synchronously on the calling worker thread -- the
/// Normalizer always invokes loaders from inside `spawn_blocking` (spec
/// §5), so this never blocks the async runtime.
fn load_via_odbc(ds_name: &DataSourceName, conn_str: &str, query: &str) -> Result<Table, SourceError> {
    let env = odbc_api::Environment::new()
        .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?;
    let conn = env
        .connect_with_connection_string(conn_str, odbc_api::ConnectionOptions::default())
        .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?;

    let mut table = Table::new(Vec::new());
    match conn
        .execute(query, ())
        .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?
    {
        None => Ok(table),
        Some(mut cursor) => {
            // `odbc-api`'s column-name lookup requires UTF-16 buffer handling
            // this crate otherwise has no use for; positional names are used
            // instead, which is sufficient since `sql-access` entities are
            // expected to declare `columns` explicitly for projection.
            let num_cols = cursor
                .num_result_cols()
                .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?;
            let column_names: Vec<ColumnName> =
                (1..=num_cols).map(|i| ColumnName::new(format!("column_{i}"))).collect();
            table = Table::new(column_names.clone());

            let mut buffers = odbc_api::buffers::TextRowSet::for_cursor(256, &mut cursor, Some(4096))
                .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?;
            let mut row_set_cursor = cursor
                .bind_buffer(&mut buffers)
                .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?;

            while let Some(batch) = row_set_cursor
                .fetch()
                .map_err(|e| SourceError::Odbc(ds_name.clone(), e.to_string()))?
            {
                for row_idx in 0..batch.num_rows() {
                    let row: Vec<Value> = (0..column_names.len())
                        .map(|col_idx| match batch.at(col_idx, row_idx) {
                            Some(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                            None => Value::Null,
                        })
                        .collect();
                    table.push_row(row)?;
                }
            }
            Ok(table)
        }
    }
}
