use crate::names::{ColumnName, DataSourceName, EntityName};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selects which [`Loader`](crate) variant materializes an entity's source rows.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Sql,
    Csv,
    Xlsx,
    Fixed,
    Derived,
}

/// Options for `csv`/`xlsx` entities: filename, sheet, separator, encoding.
#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FileOptions {
    pub filename: Option<String>,
    /// Sheet name, for `xlsx` entities. Defaults to the workbook's first sheet.
    pub sheet: Option<String>,
    /// Field separator, for `csv` entities. Defaults to `,`.
    pub separator: Option<char>,
    /// Source encoding, for `csv` entities. Defaults to `utf-8`.
    pub encoding: Option<String>,
}

/// Join variants supported by a [`ForeignKey`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum How {
    Inner,
    Left,
    Right,
    Outer,
    Cross,
}

/// Declared cardinality of a foreign key's join.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
}

/// Constraints enforced by the [`Linker`](crate) when joining a child to a parent.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    pub cardinality: Cardinality,
    #[serde(default)]
    pub allow_null_keys: bool,
    #[serde(default)]
    pub require_unique_left: bool,
    #[serde(default)]
    pub require_unique_right: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            cardinality: Cardinality::ManyToOne,
            allow_null_keys: true,
            require_unique_left: false,
            require_unique_right: false,
        }
    }
}

/// `{entity, local_keys[], remote_keys[], how, constraints, extra_columns, drop_remote_id}`.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ForeignKey {
    pub entity: EntityName,
    pub local_keys: Vec<ColumnName>,
    pub remote_keys: Vec<ColumnName>,
    #[serde(default = "default_how")]
    pub how: How,
    #[serde(default)]
    pub constraints: Constraints,
    /// Additional parent columns to carry onto the child besides `public_id`.
    #[serde(default)]
    pub extra_columns: Vec<ColumnName>,
    /// Rare: drop the parent's `public_id` column after linking.
    #[serde(default)]
    pub drop_remote_id: bool,
}

fn default_how() -> How {
    How::Inner
}

/// A single filter applied to an entity's rows. `exists_in` is the only
/// built-in predicate (spec §4.3.4); other `type`s carry the same shape but
/// are left for the `transform` crate's pluggable filter registry.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Filter {
    ExistsIn {
        entity: EntityName,
        column: ColumnName,
        remote_column: ColumnName,
    },
}

/// Wide-to-long melt configuration (spec §4.3.6).
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Unnest {
    pub id_vars: Vec<ColumnName>,
    pub value_vars: Vec<ColumnName>,
    pub var_name: ColumnName,
    pub value_name: ColumnName,
}

/// Extra rows appended to an entity before business-key deduplication.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Append {
    Fixed { values: Vec<Vec<serde_json::Value>> },
    Sql { data_source: DataSourceName, query: String },
}

/// The source expression of a computed `extra_columns` entry.
///
/// * `Constant(v)` -- same value in every row.
/// * `ColumnRef(name)` -- a case-insensitive copy of an existing column.
/// * `Interpolated(template)` -- a `"{col_a}/{col_b}"` style template.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraColumnSource {
    Constant(serde_json::Value),
    ColumnRef(ColumnName),
    Interpolated(String),
}

impl Serialize for ExtraColumnSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ExtraColumnSource::Constant(v) => v.serialize(serializer),
            ExtraColumnSource::ColumnRef(name) => name.as_str().serialize(serializer),
            ExtraColumnSource::Interpolated(template) => template.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ExtraColumnSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => ExtraColumnSource::from_str(&s),
            other => ExtraColumnSource::Constant(other),
        })
    }
}

impl ExtraColumnSource {
    /// A bare string is either a literal column reference (no `{...}`
    /// placeholders at all) or an interpolated template.
    fn from_str(s: &str) -> Self {
        if s.contains('{') || s.contains('}') {
            ExtraColumnSource::Interpolated(s.to_string())
        } else {
            ExtraColumnSource::ColumnRef(ColumnName::new(s))
        }
    }
}

impl JsonSchema for ExtraColumnSource {
    fn schema_name() -> String {
        "ExtraColumnSource".to_string()
    }

    fn json_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        serde_json::from_value(serde_json::json!({
            "anyOf": [{"type": "string"}, {"type": "number"}, {"type": "boolean"}, {"type": "null"}],
        }))
        .unwrap()
    }
}

/// Either `true` (use the entity's `keys`) or an explicit column list.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSelector {
    Disabled,
    Default,
    Columns(Vec<ColumnName>),
}

impl Default for ColumnSelector {
    fn default() -> Self {
        ColumnSelector::Disabled
    }
}

impl Serialize for ColumnSelector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ColumnSelector::Disabled => false.serialize(serializer),
            ColumnSelector::Default => true.serialize(serializer),
            ColumnSelector::Columns(cols) => cols.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Columns(Vec<ColumnName>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bool(true) => ColumnSelector::Default,
            Repr::Bool(false) => ColumnSelector::Disabled,
            Repr::Columns(cols) => ColumnSelector::Columns(cols),
        })
    }
}

impl JsonSchema for ColumnSelector {
    fn schema_name() -> String {
        "ColumnSelector".to_string()
    }

    fn json_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        serde_json::from_value(serde_json::json!({
            "anyOf": [{"type": "boolean"}, {"type": "array", "items": {"type": "string"}}],
        }))
        .unwrap()
    }
}

/// The central record of a project: a named definition of where an entity's
/// rows come from, and how they're shaped on the way to the table store.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub kind: Kind,

    /// Required for `kind: sql`.
    pub data_source: Option<DataSourceName>,
    pub query: Option<String>,
    pub table: Option<String>,

    /// For `kind: csv` / `kind: xlsx`.
    #[serde(default)]
    pub options: FileOptions,

    /// For `kind: fixed`: inline rows, in `columns` order.
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,

    /// For `kind: derived`: another entity's name, whose output is the source.
    pub source: Option<EntityName>,

    /// Ordered list of columns to project out of the source.
    #[serde(default)]
    pub columns: Vec<ColumnName>,

    /// Business key columns: the natural identifier tuple in the source.
    #[serde(default)]
    pub keys: Vec<ColumnName>,

    /// Name of the column carrying this entity's identifier downstream.
    /// Conventionally ends in `_id`.
    pub public_id: ColumnName,

    /// Name of the auto-assigned sequential identifier column.
    #[serde(default = "default_system_id")]
    pub system_id: ColumnName,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    #[serde(default)]
    pub filters: Vec<Filter>,

    pub unnest: Option<Unnest>,

    #[serde(default)]
    pub append: Vec<Append>,

    /// Mapping `new_col -> source`.
    #[serde(default)]
    pub extra_columns: BTreeMap<ColumnName, ExtraColumnSource>,

    #[serde(default)]
    pub drop_duplicates: ColumnSelector,

    #[serde(default)]
    pub drop_empty_rows: ColumnSelector,

    /// Extra dependencies beyond FK/`source`.
    #[serde(default)]
    pub depends_on: Vec<EntityName>,
}

fn default_system_id() -> ColumnName {
    ColumnName::new("system_id")
}

impl Entity {
    /// The set of entities this entity structurally depends on: FK parents,
    /// the `derived` source, and explicit `depends_on` (spec §4.1).
    pub fn static_dependencies(&self) -> Vec<EntityName> {
        let mut deps: Vec<EntityName> = self
            .foreign_keys
            .iter()
            .map(|fk| fk.entity.clone())
            .collect();
        if self.kind == Kind::Derived {
            if let Some(source) = &self.source {
                deps.push(source.clone());
            }
        }
        deps.extend(self.depends_on.iter().cloned());
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_column_source_classifies_bare_strings() {
        assert_eq!(
            ExtraColumnSource::from_str("country_code"),
            ExtraColumnSource::ColumnRef(ColumnName::new("country_code"))
        );
        assert_eq!(
            ExtraColumnSource::from_str("{a}/{b}"),
            ExtraColumnSource::Interpolated("{a}/{b}".to_string())
        );
    }

    #[test]
    fn deserializes_extra_columns_from_yaml() {
        let yaml = r#"
kind: fixed
public_id: site_id
values: []
extra_columns:
  full_info: "{site_name}, {location_name} ({country_code})"
  constant_col: "hello"
"#;
        let entity: Entity = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            entity.extra_columns.get(&ColumnName::new("full_info")),
            Some(&ExtraColumnSource::Interpolated(
                "{site_name}, {location_name} ({country_code})".to_string()
            ))
        );
        assert_eq!(
            entity.extra_columns.get(&ColumnName::new("constant_col")),
            Some(&ExtraColumnSource::ColumnRef(ColumnName::new("hello")))
        );
    }
}
