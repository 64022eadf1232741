use std::collections::HashSet;

use model::{Append, Category, ColumnName, Entity, EntityName, Priority, Project, Severity};
use model::{Suggestion, ValidationIssue};

/// Runs every structural check (spec §4.7) against `project` and returns
/// every issue raised, in check order. No data access; safe to call on
/// every project edit.
pub fn run(project: &Project) -> Vec<ValidationIssue> {
    let dependency_graph = graph::build(project);

    let mut issues = Vec::new();
    issues.extend(required_fields(project));
    issues.extend(column_reference_integrity(project));
    issues.extend(fk_parent_existence(project));
    issues.extend(public_id_naming(project));
    issues.extend(cycle_presence(&dependency_graph));
    issues.extend(orphan_entities(project, &dependency_graph));
    issues.extend(deep_dependency_chains(&dependency_graph));
    issues.extend(system_id_public_id_collision(project));
    issues.extend(task_list_topological_extension(project));
    issues.extend(unnest_column_references(project));
    issues.extend(append_row_arity(project));
    issues
}

fn issue(
    severity: Severity,
    priority: Priority,
    code: &'static str,
    entity: &EntityName,
    message: impl Into<String>,
) -> ValidationIssue {
    ValidationIssue::new(severity, Category::Structural, priority, code, message)
        .with_entity(entity.clone())
}

/// Every column name `entity`'s own rows are guaranteed to carry once
/// loaded: its declared projection, its computed columns, and its two
/// identity columns.
fn known_columns(entity: &Entity) -> HashSet<ColumnName> {
    let mut known: HashSet<ColumnName> = entity.columns.iter().cloned().collect();
    known.extend(entity.extra_columns.keys().cloned());
    known.insert(entity.public_id.clone());
    known.insert(entity.system_id.clone());
    known
}

/// Fields required by an entity's declared `kind`, beyond what `deny_unknown_fields`
/// already enforces at parse time (spec §7 ConfigurationError).
fn required_fields(project: &Project) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        match entity.kind {
            model::Kind::Sql => {
                if entity.data_source.is_none() {
                    out.push(issue(
                        Severity::Error,
                        Priority::Critical,
                        "REQUIRED_FIELD_MISSING",
                        name,
                        "kind: sql requires data_source",
                    ));
                } else if let Some(ds) = &entity.data_source {
                    if !project.data_sources.contains_key(ds) {
                        out.push(issue(
                            Severity::Error,
                            Priority::Critical,
                            "DATA_SOURCE_UNDEFINED",
                            name,
                            format!("data_source {ds:?} is not declared in data_sources"),
                        ));
                    }
                }
                if entity.query.is_none() && entity.table.is_none() {
                    out.push(issue(
                        Severity::Error,
                        Priority::Critical,
                        "REQUIRED_FIELD_MISSING",
                        name,
                        "kind: sql requires either query or table",
                    ));
                }
            }
            model::Kind::Csv | model::Kind::Xlsx => {
                if entity.options.filename.is_none() {
                    out.push(issue(
                        Severity::Error,
                        Priority::Critical,
                        "REQUIRED_FIELD_MISSING",
                        name,
                        "kind: csv/xlsx requires options.filename",
                    ));
                }
            }
            model::Kind::Derived => {
                if entity.source.is_none() {
                    out.push(issue(
                        Severity::Error,
                        Priority::Critical,
                        "REQUIRED_FIELD_MISSING",
                        name,
                        "kind: derived requires source",
                    ));
                }
            }
            model::Kind::Fixed => {}
        }
    }
    out
}

/// Every `local_keys`/`remote_keys`/filter column an entity declares must
/// name a column that will actually exist once it (or its referenced
/// parent) is loaded.
fn column_reference_integrity(project: &Project) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        if entity.columns.is_empty() {
            // Nothing declared to check against -- the source determines
            // shape at load time instead (spec §4.2, sql/derived entities).
            continue;
        }
        let own_known = known_columns(entity);

        for fk in &entity.foreign_keys {
            for col in &fk.local_keys {
                if !own_known.contains(col) {
                    out.push(
                        issue(
                            Severity::Error,
                            Priority::High,
                            "FK_COLUMN_NOT_FOUND",
                            name,
                            format!("local_keys column {col:?} is not among {name:?}'s columns"),
                        )
                        .with_field(col.as_str()),
                    );
                }
            }
            if let Some(parent) = project.entity(&fk.entity) {
                if !parent.columns.is_empty() {
                    let parent_known = known_columns(parent);
                    for col in &fk.remote_keys {
                        if !parent_known.contains(col) {
                            out.push(
                                issue(
                                    Severity::Error,
                                    Priority::High,
                                    "FK_COLUMN_NOT_FOUND",
                                    name,
                                    format!(
                                        "remote_keys column {col:?} is not among {:?}'s columns",
                                        fk.entity
                                    ),
                                )
                                .with_field(col.as_str()),
                            );
                        }
                    }
                }
            }
        }

        for filter in &entity.filters {
            let model::Filter::ExistsIn { entity: target, column, remote_column } = filter;
            if !own_known.contains(column) {
                out.push(
                    issue(
                        Severity::Error,
                        Priority::High,
                        "FILTER_COLUMN_NOT_FOUND",
                        name,
                        format!("filter column {column:?} is not among {name:?}'s columns"),
                    )
                    .with_field(column.as_str()),
                );
            }
            if let Some(parent) = project.entity(target) {
                if !parent.columns.is_empty() && !known_columns(parent).contains(remote_column) {
                    out.push(
                        issue(
                            Severity::Error,
                            Priority::High,
                            "FILTER_COLUMN_NOT_FOUND",
                            name,
                            format!(
                                "filter remote_column {remote_column:?} is not among {target:?}'s columns"
                            ),
                        )
                        .with_field(remote_column.as_str()),
                    );
                }
            }
        }
    }
    out
}

/// FK targets, `derived` sources, and explicit `depends_on` entries that
/// name an entity absent from the project.
fn fk_parent_existence(project: &Project) -> Vec<ValidationIssue> {
    graph::missing_parents(project)
        .into_iter()
        .map(|(child, missing)| {
            issue(
                Severity::Error,
                Priority::Critical,
                "MISSING_PARENT",
                &child,
                format!("{missing:?} is referenced but not declared in this project"),
            )
            .with_field(missing.as_str())
        })
        .collect()
}

/// `public_id` is conventionally expected to end in `_id` so downstream FK
/// columns read naturally (spec §4.7).
fn public_id_naming(project: &Project) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        if !model::names::is_valid_public_id(entity.public_id.as_str()) {
            let replacement = format!("{}_id", name.as_str());
            out.push(
                issue(
                    Severity::Warning,
                    Priority::Low,
                    "PUBLIC_ID_NAMING_CONVENTION",
                    name,
                    format!("public_id {:?} does not end in \"_id\"", entity.public_id),
                )
                .with_field("public_id")
                .with_suggestion(Suggestion {
                    description: format!("rename public_id to {replacement:?}"),
                    replacement: Some(replacement),
                }),
            );
        }
    }
    out
}

fn cycle_presence(dependency_graph: &graph::DependencyGraph) -> Vec<ValidationIssue> {
    dependency_graph
        .cycles
        .iter()
        .map(|cycle| {
            let names = cycle.iter().map(EntityName::as_str).collect::<Vec<_>>().join(" -> ");
            ValidationIssue::new(
                Severity::Error,
                Category::Structural,
                Priority::Critical,
                "CYCLE_DETECTED",
                format!("dependency cycle: {names}"),
            )
            .with_entity(cycle[0].clone())
        })
        .collect()
}

/// Entities nothing reaches when processing starts only from the explicit
/// `task_list` (spec §4.7 "orphan entities"). Without a `task_list`, every
/// entity is a potential output and this check is skipped.
fn orphan_entities(
    project: &Project,
    dependency_graph: &graph::DependencyGraph,
) -> Vec<ValidationIssue> {
    let Some(task_list) = &project.task_list else {
        return Vec::new();
    };

    let mut reachable: HashSet<EntityName> = HashSet::new();
    let mut stack: Vec<EntityName> = task_list.clone();
    while let Some(name) = stack.pop() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        if let Some(node) = dependency_graph.nodes.get(&name) {
            stack.extend(node.depends_on.iter().cloned());
        }
    }

    project
        .entities
        .keys()
        .filter(|name| !reachable.contains(*name))
        .map(|name| {
            issue(
                Severity::Warning,
                Priority::Medium,
                "ORPHAN_ENTITY",
                name,
                format!("{name:?} is defined but unreachable from task_list"),
            )
        })
        .collect()
}

/// A chain deeper than 5 levels makes every future edit slow to reason
/// about, even though it's not itself invalid (spec §4.7).
fn deep_dependency_chains(dependency_graph: &graph::DependencyGraph) -> Vec<ValidationIssue> {
    const MAX_DEPTH: usize = 5;
    dependency_graph
        .nodes
        .iter()
        .filter(|(_, node)| node.depth > MAX_DEPTH)
        .map(|(name, node)| {
            issue(
                Severity::Warning,
                Priority::Medium,
                "DEEP_DEPENDENCY_CHAIN",
                name,
                format!("dependency chain depth {} exceeds {MAX_DEPTH}", node.depth),
            )
        })
        .collect()
}

/// `system_id` and `public_id` name two distinct columns; declaring the
/// same name for both silently discards one of them at load time.
fn system_id_public_id_collision(project: &Project) -> Vec<ValidationIssue> {
    project
        .entities
        .iter()
        .filter(|(_, entity)| entity.system_id == entity.public_id)
        .map(|(name, entity)| {
            issue(
                Severity::Error,
                Priority::High,
                "SYSTEM_ID_PUBLIC_ID_COLLISION",
                name,
                format!("system_id and public_id are both {:?}", entity.public_id),
            )
        })
        .collect()
}

/// When present, `task_list` must be a topological extension of the
/// implicit graph: every entity's dependencies must precede it (spec §6.1).
fn task_list_topological_extension(project: &Project) -> Vec<ValidationIssue> {
    let Some(task_list) = &project.task_list else {
        return Vec::new();
    };
    let position: std::collections::HashMap<&EntityName, usize> =
        task_list.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        let Some(&pos) = position.get(name) else {
            continue;
        };
        for dep in entity.static_dependencies() {
            if let Some(&dep_pos) = position.get(&dep) {
                if dep_pos >= pos {
                    out.push(issue(
                        Severity::Error,
                        Priority::High,
                        "TASK_LIST_ORDER_VIOLATION",
                        name,
                        format!("task_list places {dep:?} at or after {name:?}, which depends on it"),
                    ));
                }
            }
        }
    }
    out
}

fn unnest_column_references(project: &Project) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        let Some(unnest) = &entity.unnest else { continue };
        if entity.columns.is_empty() {
            continue;
        }
        let known = known_columns(entity);
        for col in unnest.id_vars.iter().chain(&unnest.value_vars) {
            if !known.contains(col) {
                out.push(
                    issue(
                        Severity::Error,
                        Priority::High,
                        "UNNEST_COLUMN_NOT_FOUND",
                        name,
                        format!("unnest references column {col:?}, which {name:?} does not declare"),
                    )
                    .with_field(col.as_str()),
                );
            }
        }
    }
    out
}

fn append_row_arity(project: &Project) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for (name, entity) in &project.entities {
        if entity.columns.is_empty() {
            continue;
        }
        for append in &entity.append {
            let Append::Fixed { values } = append else { continue };
            for (row_index, row) in values.iter().enumerate() {
                if row.len() != entity.columns.len() {
                    out.push(issue(
                        Severity::Error,
                        Priority::High,
                        "APPEND_ROW_ARITY_MISMATCH",
                        name,
                        format!(
                            "append row {row_index} has {} values but {name:?} declares {} columns",
                            row.len(),
                            entity.columns.len()
                        ),
                    ));
                }
            }
        }
    }
    out
}
