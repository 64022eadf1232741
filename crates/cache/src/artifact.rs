use model::ValidationIssue;
use tables::{Table, Value};

/// Default row limit for a preview run (spec §4.6).
pub const DEFAULT_PREVIEW_LIMIT: usize = 1000;

/// A crude per-column type summary, good enough for an editor to render a
/// preview grid without re-deriving it from every `Value` in the table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnMeta {
    pub name: model::ColumnName,
    pub inferred_type: &'static str,
    pub nullable: bool,
}

fn value_kind(value: &Value) -> (&'static str, bool) {
    match value {
        Value::Null => ("null", true),
        Value::Bool(_) => ("bool", false),
        Value::Int(_) => ("int", false),
        Value::Float(_) => ("float", false),
        Value::Text(_) => ("text", false),
    }
}

fn column_metadata(table: &Table) -> Vec<ColumnMeta> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let mut inferred_type = "null";
            let mut nullable = false;
            for row in table.rows() {
                let (kind, is_null) = value_kind(&row[idx]);
                nullable |= is_null;
                if !is_null {
                    inferred_type = kind;
                }
            }
            ColumnMeta {
                name: name.clone(),
                inferred_type,
                nullable,
            }
        })
        .collect()
}

/// C8's preview artifact (spec §4.6): a truncated table, its column
/// metadata, and the bookkeeping a caller needs to explain the result
/// (`cache_hit`, timing, which transformation steps actually ran).
#[derive(Debug, Clone, serde::Serialize)]
pub struct PreviewArtifact {
    pub table: Table,
    pub columns: Vec<ColumnMeta>,
    pub total_rows: usize,
    pub truncated: bool,
    pub cache_hit: bool,
    pub execution_time_ms: u64,
    pub applied_transformations: Vec<String>,
}

impl PreviewArtifact {
    pub(crate) fn from_table(
        table: Table,
        limit: usize,
        cache_hit: bool,
        execution_time_ms: u64,
        applied_transformations: Vec<String>,
    ) -> Self {
        let total_rows = table.len();
        let truncated = total_rows > limit;
        let columns = column_metadata(&table);
        let table = if truncated { truncate(table, limit) } else { table };
        PreviewArtifact {
            table,
            columns,
            total_rows,
            truncated,
            cache_hit,
            execution_time_ms,
            applied_transformations,
        }
    }
}

fn truncate(table: Table, limit: usize) -> Table {
    let columns = table.columns().to_vec();
    let mut out = Table::new(columns);
    for row in table.rows().iter().take(limit) {
        out.push_row(row.clone()).expect("row shape is unchanged by truncation");
    }
    out
}

/// C8's validation artifact: whichever mode ran, the result is just the
/// issue list that mode's validators raised.
pub type ValidationArtifact = Vec<ValidationIssue>;
