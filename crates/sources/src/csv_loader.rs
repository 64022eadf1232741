use model::{ColumnName, Entity, EntityName};
use tables::{Table, Value};

use crate::error::SourceError;

/// C2, `kind: csv`: read `options.filename` with the declared separator and
/// encoding (spec §4.2). Defaults: separator `,`, encoding `utf-8`.
pub fn load(name: &EntityName, entity: &Entity) -> Result<Table, SourceError> {
    let filename = entity
        .options
        .filename
        .as_ref()
        .ok_or_else(|| SourceError::MissingFilename(name.clone(), "csv"))?;

    let bytes = std::fs::read(filename).map_err(|e| SourceError::Io(filename.clone(), e))?;
    let decoded = decode(&bytes, entity.options.encoding.as_deref());

    let separator = entity.options.separator.unwrap_or(',') as u8;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .from_reader(decoded.as_bytes());

    let headers: Vec<ColumnName> = reader
        .headers()
        .map_err(|e| SourceError::Csv(filename.clone(), e))?
        .iter()
        .map(ColumnName::new)
        .collect();

    let mut table = Table::new(headers.clone());
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Csv(filename.clone(), e))?;
        let row: Vec<Value> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                }
            })
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

/// Decodes `bytes` per the declared `encoding`, defaulting to UTF-8 (spec
/// §4.2). Non-UTF-8 encodings (e.g. `windows-1252`, common in exports from
/// legacy desktop tools) are handled by `encoding_rs`.
fn decode(bytes: &[u8], encoding: Option<&str>) -> String {
    let label = encoding.unwrap_or("utf-8");
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(enc) => enc.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entity_for(filename: &str) -> Entity {
        serde_yaml::from_str(&format!(
            "kind: csv\npublic_id: x_id\noptions:\n  filename: {filename}\n"
        ))
        .unwrap()
    }

    #[test]
    fn reads_headers_and_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b\n1,hello\n2,").unwrap();

        let entity = entity_for(file.path().to_str().unwrap());
        let table = load(&EntityName::new("t"), &entity).unwrap();

        assert_eq!(table.columns(), &[ColumnName::new("a"), ColumnName::new("b")]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][1], Value::Null);
    }

    #[test]
    fn missing_filename_is_an_error() {
        let entity: Entity = serde_yaml::from_str("kind: csv\npublic_id: x_id\n").unwrap();
        assert!(matches!(
            load(&EntityName::new("t"), &entity),
            Err(SourceError::MissingFilename(_, "csv"))
        ));
    }
}
