use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The driver family backing a [`DataSource`]. Opaque to the core beyond the
/// two capabilities `sources` exposes: listing rows of a table/query, and
/// introspecting schema.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Driver {
    SqlPostgres,
    SqlSqlite,
    SqlAccess,
    CsvFile,
    ExcelFile,
}

impl Driver {
    pub fn is_sql(self) -> bool {
        matches!(
            self,
            Driver::SqlPostgres | Driver::SqlSqlite | Driver::SqlAccess
        )
    }
}

/// A named connection handle: `{driver, parameters}`. Connection parameters
/// are already-resolved by the time the core sees them -- `${ENV_VAR}`
/// placeholder resolution happens outside the core, at the API boundary
/// (spec §6.1).
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DataSource {
    pub driver: Driver,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl DataSource {
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}
