use indexmap::IndexMap;
use model::{Cardinality, Category, EntityName, Priority, Project, Severity, ValidationIssue};
use normalize::EntityStats;
use tables::{TableStore, Value};

/// Runs every data validator (spec §4.7) against a completed normalization
/// run. Requires the Normalizer to have already produced `table_store` and
/// `per_entity_stats` -- this module never loads or transforms rows itself.
pub fn run(
    project: &Project,
    table_store: &TableStore,
    per_entity_stats: &IndexMap<EntityName, EntityStats>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    issues.extend(column_existence(project, table_store));
    issues.extend(fk_match_rate(per_entity_stats));
    issues.extend(business_key_duplicates(project, table_store));
    issues.extend(cardinality_violations(project, per_entity_stats));
    issues.extend(null_key_policy(project, table_store));
    issues.extend(type_compatibility(project, table_store));
    issues.extend(empty_entity(per_entity_stats));
    issues.extend(extra_column_null_rate(project, table_store));
    issues
}

fn issue(
    severity: Severity,
    priority: Priority,
    code: &'static str,
    entity: &EntityName,
    message: impl Into<String>,
) -> ValidationIssue {
    ValidationIssue::new(severity, Category::Data, priority, code, message).with_entity(entity.clone())
}

/// An entity's declared `columns`, plus its two identity columns, should all
/// be present in what the Normalizer actually produced.
fn column_existence(project: &Project, table_store: &TableStore) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        let Some(table) = table_store.try_get(name) else { continue };
        for col in &entity.columns {
            if !table.has_column(col) {
                out.push(
                    issue(
                        Severity::Error,
                        Priority::High,
                        "COLUMN_MISSING_POST_LOAD",
                        name,
                        format!("declared column {col:?} is absent from the loaded table"),
                    )
                    .with_field(col.as_str()),
                );
            }
        }
        if !table.has_column(&entity.public_id) {
            out.push(issue(
                Severity::Error,
                Priority::Critical,
                "COLUMN_MISSING_POST_LOAD",
                name,
                format!("public_id column {:?} is absent from the loaded table", entity.public_id),
            ));
        }
    }
    out
}

/// Errors when an inner join would lose more than 10% of child rows;
/// warns on any loss at all (spec §4.7).
fn fk_match_rate(per_entity_stats: &IndexMap<EntityName, EntityStats>) -> Vec<ValidationIssue> {
    const ERROR_THRESHOLD: f64 = 0.1;
    let mut out = Vec::new();
    for (name, stats) in per_entity_stats {
        for (parent, fk_stats) in &stats.fk_stats {
            let total = fk_stats.matched + fk_stats.unmatched_left;
            if total == 0 || fk_stats.unmatched_left == 0 {
                continue;
            }
            let loss = fk_stats.unmatched_left as f64 / total as f64;
            if loss > ERROR_THRESHOLD {
                out.push(issue(
                    Severity::Error,
                    Priority::High,
                    "FK_MATCH_RATE_LOW",
                    name,
                    format!(
                        "{:.1}% of rows failed to match {parent:?} ({} of {total})",
                        loss * 100.0,
                        fk_stats.unmatched_left
                    ),
                ));
            } else {
                out.push(issue(
                    Severity::Warning,
                    Priority::Low,
                    "FK_MATCH_RATE_LOW",
                    name,
                    format!(
                        "{} of {total} rows failed to match {parent:?}",
                        fk_stats.unmatched_left
                    ),
                ));
            }
        }
    }
    out
}

/// Rows that share the same business-key tuple, scanned by rendering each
/// key value with the same textual rule previews use (spec §4.4: a table's
/// `Value` has no total `Eq`/`Hash`, so equality here is on that rendering).
fn business_key_duplicates(project: &Project, table_store: &TableStore) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        if entity.keys.is_empty() {
            continue;
        }
        let Some(table) = table_store.try_get(name) else { continue };
        let indices: Vec<usize> = entity
            .keys
            .iter()
            .filter_map(|col| table.column_index(col))
            .collect();
        if indices.len() != entity.keys.len() {
            continue; // already reported by `column_existence`
        }

        let mut seen: std::collections::HashMap<Vec<String>, usize> = std::collections::HashMap::new();
        for row in table.rows() {
            let key: Vec<String> = indices.iter().map(|&i| row[i].interpolate()).collect();
            *seen.entry(key).or_insert(0) += 1;
        }
        let duplicate_count = seen.values().filter(|&&n| n > 1).count();
        if duplicate_count > 0 {
            out.push(issue(
                Severity::Warning,
                Priority::Medium,
                "BUSINESS_KEY_DUPLICATE",
                name,
                format!("{duplicate_count} distinct business-key value(s) appear more than once"),
            ));
        }
    }
    out
}

/// A declared `one_to_one`/`many_to_one` cardinality promises each child row
/// matches at most one parent row; the Linker's `duplicate_matches` counter
/// says otherwise.
fn cardinality_violations(
    project: &Project,
    per_entity_stats: &IndexMap<EntityName, EntityStats>,
) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, stats) in per_entity_stats {
        let Some(entity) = project.entity(name) else { continue };
        for (parent, fk_stats) in &stats.fk_stats {
            if fk_stats.duplicate_matches == 0 {
                continue;
            }
            let Some(fk) = entity.foreign_keys.iter().find(|fk| &fk.entity == parent) else {
                continue;
            };
            if matches!(fk.constraints.cardinality, Cardinality::OneToOne | Cardinality::ManyToOne) {
                out.push(issue(
                    Severity::Error,
                    Priority::High,
                    "CARDINALITY_VIOLATION",
                    name,
                    format!(
                        "{} row(s) matched more than one {parent:?} row under {:?}",
                        fk_stats.duplicate_matches, fk.constraints.cardinality
                    ),
                ));
            }
        }
    }
    out
}

/// `allow_null_keys = false` promises every local key column is fully
/// populated; check the loaded table directly rather than trusting the
/// Linker alone, since a project can be re-validated without re-linking.
fn null_key_policy(project: &Project, table_store: &TableStore) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        let Some(table) = table_store.try_get(name) else { continue };
        for fk in &entity.foreign_keys {
            if fk.constraints.allow_null_keys {
                continue;
            }
            for col in &fk.local_keys {
                let Some(idx) = table.column_index(col) else { continue };
                let nulls = table.rows().iter().filter(|row| row[idx].is_null()).count();
                if nulls > 0 {
                    out.push(
                        issue(
                            Severity::Error,
                            Priority::High,
                            "NULL_KEY_VIOLATION",
                            name,
                            format!(
                                "{nulls} row(s) have a null {col:?}, but foreign key to {:?} disallows null keys",
                                fk.entity
                            ),
                        )
                        .with_field(col.as_str()),
                    );
                }
            }
        }
    }
    out
}

fn value_kind(value: &Value) -> Option<&'static str> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some("bool"),
        Value::Int(_) => Some("int"),
        Value::Float(_) => Some("float"),
        Value::Text(_) => Some("text"),
    }
}

/// The dominant non-null kind of a column, or `None` if every value is null.
fn dominant_kind(table: &tables::Table, idx: usize) -> Option<&'static str> {
    let mut counts: std::collections::HashMap<&'static str, usize> = std::collections::HashMap::new();
    for row in table.rows() {
        if let Some(kind) = value_kind(&row[idx]) {
            *counts.entry(kind).or_insert(0) += 1;
        }
    }
    counts.into_iter().max_by_key(|(_, n)| *n).map(|(kind, _)| kind)
}

/// A join across columns whose values are predominantly different kinds
/// (e.g. the child holds text, the parent holds integers) usually signals
/// a typo rather than a real join, even when enough rows happen to match.
fn type_compatibility(project: &Project, table_store: &TableStore) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        let Some(child) = table_store.try_get(name) else { continue };
        for fk in &entity.foreign_keys {
            let (Some(local), Some(remote)) = (fk.local_keys.first(), fk.remote_keys.first()) else {
                continue;
            };
            let Some(parent) = table_store.try_get(&fk.entity) else { continue };
            let (Some(child_idx), Some(parent_idx)) =
                (child.column_index(local), parent.column_index(remote))
            else {
                continue;
            };
            if let (Some(child_kind), Some(parent_kind)) =
                (dominant_kind(child, child_idx), dominant_kind(parent, parent_idx))
            {
                if child_kind != parent_kind {
                    out.push(issue(
                        Severity::Warning,
                        Priority::Medium,
                        "TYPE_MISMATCH",
                        name,
                        format!(
                            "{local:?} is predominantly {child_kind} but {:?}.{remote:?} is predominantly {parent_kind}",
                            fk.entity
                        ),
                    ));
                }
            }
        }
    }
    out
}

fn empty_entity(per_entity_stats: &IndexMap<EntityName, EntityStats>) -> Vec<ValidationIssue> {
    per_entity_stats
        .iter()
        .filter(|(_, stats)| stats.state == normalize::EntityState::Done && stats.row_count == 0)
        .map(|(name, _)| {
            issue(Severity::Warning, Priority::Low, "EMPTY_ENTITY", name, "entity produced zero rows")
        })
        .collect()
}

/// A computed column whose interpolation references mostly fail (missing
/// source columns, typo'd placeholders) ends up mostly null; that's a
/// strong signal the template itself is wrong.
fn extra_column_null_rate(project: &Project, table_store: &TableStore) -> Vec<ValidationIssue> {
    const WARN_THRESHOLD: f64 = 0.5;
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        if entity.extra_columns.is_empty() {
            continue;
        }
        let Some(table) = table_store.try_get(name) else { continue };
        if table.is_empty() {
            continue;
        }
        for col in entity.extra_columns.keys() {
            let Some(idx) = table.column_index(col) else { continue };
            let nulls = table.rows().iter().filter(|row| row[idx].is_null()).count();
            let rate = nulls as f64 / table.len() as f64;
            if rate > WARN_THRESHOLD {
                out.push(
                    issue(
                        Severity::Warning,
                        Priority::Low,
                        "EXTRA_COLUMN_MOSTLY_NULL",
                        name,
                        format!("computed column {col:?} is null in {:.0}% of rows", rate * 100.0),
                    )
                    .with_field(col.as_str()),
                );
            }
        }
    }
    out
}
