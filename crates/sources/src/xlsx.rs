use calamine::{open_workbook_auto, Data, Reader};
use model::{ColumnName, Entity, EntityName};
use tables::{Table, Value};

use crate::error::SourceError;

/// C2, `kind: xlsx`: read the declared `options.sheet` from `options.filename`
/// (spec §4.2). The workbook's first sheet is used when `sheet` is absent.
/// The first row is taken as the header.
pub fn load(name: &EntityName, entity: &Entity) -> Result<Table, SourceError> {
    let filename = entity
        .options
        .filename
        .as_ref()
        .ok_or_else(|| SourceError::MissingFilename(name.clone(), "xlsx"))?;

    let mut workbook = open_workbook_auto(filename)
        .map_err(|e| SourceError::Xlsx(filename.clone(), e.to_string()))?;

    let sheet_name = match &entity.options.sheet {
        Some(s) => s.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SourceError::Xlsx(filename.clone(), "workbook has no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|_| SourceError::SheetNotFound {
            file: filename.clone(),
            sheet: sheet_name.clone(),
        })?;

    let mut rows = range.rows();
    let headers: Vec<ColumnName> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| ColumnName::new(cell_text(c))).collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers.clone());
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        table.push_row(values)?;
    }
    Ok(table)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::Float(dt.as_f64()),
        Data::DateTimeIso(s) => Value::Text(s.clone()),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(format!("{e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_filename_is_an_error() {
        let entity: Entity = serde_yaml::from_str("kind: xlsx\npublic_id: x_id\n").unwrap();
        assert!(matches!(
            load(&EntityName::new("t"), &entity),
            Err(SourceError::MissingFilename(_, "xlsx"))
        ));
    }
}
