use model::{ColumnName, Entity, ExtraColumnSource};
use tables::{Table, Value};

use crate::error::TransformError;

/// An `extra_columns` entry whose template referenced a column not yet
/// available in pass 1 (constants and literal copies always resolve
/// immediately; only interpolated templates can defer).
#[derive(Debug, Clone)]
pub struct DeferredColumn {
    pub name: ColumnName,
    pub source: ExtraColumnSource,
}

/// Step 5, pass 1 (spec §4.3.5): evaluate every `extra_columns` entry whose
/// dependencies are already present; anything else is returned for pass 2.
pub fn pass_one(table: &mut Table, entity: &Entity) -> Result<Vec<DeferredColumn>, TransformError> {
    let mut deferred = Vec::new();
    for (name, source) in &entity.extra_columns {
        match evaluate(source, table) {
            Some(values) => table.add_column(name.clone(), values),
            None => deferred.push(DeferredColumn {
                name: name.clone(),
                source: source.clone(),
            }),
        }
    }
    Ok(deferred)
}

/// Step 5, pass 2: re-evaluate deferred entries once the Linker has merged
/// parent columns onto `table`. An entry that still cannot resolve is a hard
/// error (spec §4.3.5: "unresolved dependencies are a hard error").
pub fn pass_two(table: &mut Table, deferred: Vec<DeferredColumn>) -> Result<(), TransformError> {
    for d in deferred {
        match evaluate(&d.source, table) {
            Some(values) => table.add_column(d.name.clone(), values),
            None => return Err(TransformError::UnresolvedComputedColumn(d.name)),
        }
    }
    Ok(())
}

fn case_insensitive_index(table: &Table, name: &ColumnName) -> Option<usize> {
    table
        .columns()
        .iter()
        .position(|c| c.as_str().eq_ignore_ascii_case(name.as_str()))
}

fn evaluate(source: &ExtraColumnSource, table: &Table) -> Option<Vec<Value>> {
    match source {
        ExtraColumnSource::Constant(v) => {
            let value = Value::from_json(v);
            Some(std::iter::repeat(value).take(table.len()).collect())
        }
        ExtraColumnSource::ColumnRef(name) => {
            let idx = case_insensitive_index(table, name)?;
            Some(table.rows().iter().map(|row| row[idx].clone()).collect())
        }
        ExtraColumnSource::Interpolated(template) => {
            let refs = referenced_columns(template);
            let indices: Vec<Option<usize>> = refs
                .iter()
                .map(|c| case_insensitive_index(table, c))
                .collect();
            if indices.iter().any(Option::is_none) {
                return None;
            }
            let indices: Vec<usize> = indices.into_iter().flatten().collect();

            Some(
                table
                    .rows()
                    .iter()
                    .map(|row| {
                        let lookup = |col: &ColumnName| -> Option<Value> {
                            refs.iter()
                                .position(|r| r == col)
                                .map(|pos| row[indices[pos]].clone())
                        };
                        Value::Text(render(template, &lookup))
                    })
                    .collect(),
            )
        }
    }
}

/// `"{col}"` substitution with `{{`/`}}` as literal braces (spec §4.3.5).
/// Renders null values as the empty string.
fn render(template: &str, lookup: &dyn Fn(&ColumnName) -> Option<Value>) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                for nc in chars.by_ref() {
                    if nc == '}' {
                        break;
                    }
                    name.push(nc);
                }
                let col = ColumnName::new(name.trim());
                if let Some(value) = lookup(&col) {
                    out.push_str(&value.interpolate());
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn referenced_columns(template: &str) -> Vec<ColumnName> {
    let mut out = Vec::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
            }
            '{' => {
                let mut name = String::new();
                for nc in chars.by_ref() {
                    if nc == '}' {
                        break;
                    }
                    name.push(nc);
                }
                out.push(ColumnName::new(name.trim()));
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_and_treats_double_braces_as_literal() {
        let mut table = Table::new(vec![ColumnName::new("site_name"), ColumnName::new("country_code")]);
        table
            .push_row(vec![
                Value::Text("Oslo".into()),
                Value::Text("NO".into()),
            ])
            .unwrap();

        let lookup = |col: &ColumnName| table.get(0, col).ok().cloned();
        let rendered = render("{{literal}} {site_name} ({country_code})", &lookup);
        assert_eq!(rendered, "{literal} Oslo (NO)");
    }

    #[test]
    fn null_renders_as_empty_string() {
        let mut table = Table::new(vec![ColumnName::new("x")]);
        table.push_row(vec![Value::Null]).unwrap();
        let lookup = |col: &ColumnName| table.get(0, col).ok().cloned();
        assert_eq!(render("[{x}]", &lookup), "[]");
    }

    #[test]
    fn pass_one_defers_columns_referencing_future_parent_columns() {
        let mut table = Table::new(vec![ColumnName::new("name")]);
        table.push_row(vec![Value::Text("Oslo".into())]).unwrap();

        let entity: Entity = serde_yaml::from_str(
            "kind: fixed\npublic_id: x_id\nextra_columns:\n  full: \"{name}, {region_name}\"\n",
        )
        .unwrap();

        let deferred = pass_one(&mut table, &entity).unwrap();
        assert_eq!(deferred.len(), 1);
        assert!(!table.has_column(&ColumnName::new("full")));

        table.add_column(ColumnName::new("region_name"), vec![Value::Text("East".into())]);
        pass_two(&mut table, deferred).unwrap();
        assert_eq!(
            table.get(0, &ColumnName::new("full")).unwrap(),
            &Value::Text("Oslo, East".into())
        );
    }
}
