use crate::Value;
use model::ColumnName;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("column {0:?} not found")]
    ColumnNotFound(String),
    #[error("row has {got} values but schema declares {want} columns")]
    RowShapeMismatch { got: usize, want: usize },
}

/// A minimal row-oriented tabular artifact with a typed, named schema: the
/// common interface the Transform Kernel, Linker, and previews operate
/// against, standing in for the source's untyped pandas-style frames
/// (spec Design Note 9).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Table {
    columns: Vec<ColumnName>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<ColumnName>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &ColumnName) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &ColumnName) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowShapeMismatch {
                got: row.len(),
                want: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, row: usize, column: &ColumnName) -> Result<&Value, TableError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| TableError::ColumnNotFound(column.to_string()))?;
        Ok(&self.rows[row][idx])
    }

    /// Append a new column, filling every existing row with `value`.
    pub fn add_column(&mut self, name: ColumnName, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Drop a column by name, if present. No-op otherwise.
    pub fn drop_column(&mut self, name: &ColumnName) {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            for row in self.rows.iter_mut() {
                row.remove(idx);
            }
        }
    }

    /// Project down to exactly `columns`, in that order. Columns absent
    /// from this table are a [`TableError::ColumnNotFound`].
    pub fn project(&self, columns: &[ColumnName]) -> Result<Table, TableError> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| TableError::ColumnNotFound(c.to_string()))
            })
            .collect::<Result<_, _>>()?;

        let mut out = Table::new(columns.to_vec());
        for row in &self.rows {
            out.rows.push(indices.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(out)
    }

    /// Truncate to at most `limit` rows, for previews.
    pub fn truncated(&self, limit: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<ColumnName> {
        names.iter().map(|s| ColumnName::new(*s)).collect()
    }

    #[test]
    fn projects_columns_in_requested_order() {
        let mut t = Table::new(cols(&["a", "b", "c"]));
        t.push_row(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();

        let p = t
            .project(&[ColumnName::new("c"), ColumnName::new("a")])
            .unwrap();
        assert_eq!(p.rows()[0], vec![Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn project_missing_column_errors() {
        let t = Table::new(cols(&["a"]));
        assert!(matches!(
            t.project(&[ColumnName::new("missing")]),
            Err(TableError::ColumnNotFound(_))
        ));
    }
}
