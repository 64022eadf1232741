use model::{Driver, Entity, EntityName, Kind, Project};

use crate::model::{SourceEdge, SourceNode};
use crate::sql_extract;

/// Builds the source-level lineage subgraph: for each entity, the physical
/// origin it is materialized from -- a SQL table (or tables, parsed from a
/// free-text query), a CSV/XLSX file, ultimately rooted at a data source
/// (spec §4.1). These are supplementary nodes tagged with a distinct `kind`
/// so a renderer can tell an entity apart from a table or file.
pub fn build_source_lineage(project: &Project) -> (Vec<SourceNode>, Vec<SourceEdge>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for (name, entity) in &project.entities {
        match entity.kind {
            Kind::Sql => add_sql_lineage(project, name, entity, &mut nodes, &mut edges),
            Kind::Csv | Kind::Xlsx => add_file_lineage(name, entity, &mut nodes, &mut edges),
            Kind::Fixed | Kind::Derived => {}
        }
    }

    nodes.sort();
    nodes.dedup();
    (nodes, edges)
}

fn add_sql_lineage(
    project: &Project,
    name: &EntityName,
    entity: &Entity,
    nodes: &mut Vec<SourceNode>,
    edges: &mut Vec<SourceEdge>,
) {
    let Some(ds_name) = &entity.data_source else {
        return;
    };
    let entity_node = SourceNode::Entity(name.clone());
    nodes.push(entity_node.clone());

    let table_names: Vec<String> = if let Some(table) = &entity.table {
        vec![table.clone()]
    } else if let Some(query) = &entity.query {
        sql_extract::extract_table_names(query)
    } else {
        Vec::new()
    };

    let driver_is_sql = project
        .data_sources
        .get(ds_name)
        .map(|ds| ds.driver_is_sql())
        .unwrap_or(true);
    if !driver_is_sql {
        return;
    }

    for table in table_names {
        let table_node = SourceNode::Table {
            data_source: ds_name.clone(),
            table,
        };
        nodes.push(table_node.clone());
        edges.push(SourceEdge {
            from: entity_node.clone(),
            to: table_node,
        });
    }
}

fn add_file_lineage(
    name: &EntityName,
    entity: &Entity,
    nodes: &mut Vec<SourceNode>,
    edges: &mut Vec<SourceEdge>,
) {
    let Some(filename) = &entity.options.filename else {
        return;
    };
    let path = match &entity.options.sheet {
        Some(sheet) => format!("{filename}#{sheet}"),
        None => filename.clone(),
    };

    let entity_node = SourceNode::Entity(name.clone());
    let file_node = SourceNode::File { path };
    nodes.push(entity_node.clone());
    nodes.push(file_node.clone());
    edges.push(SourceEdge {
        from: entity_node,
        to: file_node,
    });
}

trait DriverIsSql {
    fn driver_is_sql(&self) -> bool;
}

impl DriverIsSql for model::DataSource {
    fn driver_is_sql(&self) -> bool {
        matches!(
            self.driver,
            Driver::SqlPostgres | Driver::SqlSqlite | Driver::SqlAccess
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sql_entity(table: Option<&str>, query: Option<&str>) -> Entity {
        let mut yaml = String::from("kind: sql\npublic_id: x_id\ndata_source: db\n");
        if let Some(t) = table {
            yaml.push_str(&format!("table: {t}\n"));
        }
        if let Some(q) = query {
            yaml.push_str(&format!("query: \"{q}\"\n"));
        }
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn builds_table_node_for_declared_table() {
        let mut data_sources = BTreeMap::new();
        data_sources.insert(
            model::DataSourceName::new("db"),
            model::DataSource {
                driver: Driver::SqlPostgres,
                parameters: BTreeMap::new(),
            },
        );
        let mut entities = BTreeMap::new();
        entities.insert(EntityName::new("locations"), sql_entity(Some("raw_locations"), None));

        let project = Project {
            name: "t".into(),
            version: 1,
            data_sources,
            entities,
            options: model::Options::default(),
            task_list: None,
            reconciliation: None,
        };

        let (nodes, edges) = build_source_lineage(&project);
        assert!(nodes.contains(&SourceNode::Table {
            data_source: model::DataSourceName::new("db"),
            table: "raw_locations".to_string(),
        }));
        assert_eq!(edges.len(), 1);
    }
}
