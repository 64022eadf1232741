//! Newtype string identifiers used throughout a project.
//!
//! Modeled on the reference-type pattern used elsewhere in this workspace:
//! a thin string wrapper, validated against a regex at construction time,
//! with `Ord`/`Hash` so it can key a `BTreeMap`/`IndexMap` deterministically.

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const TOKEN: &str = r"[\p{Letter}\p{Digit}\-_\.]+";

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(&format!("^{TOKEN}$")).unwrap();
    static ref PUBLIC_ID_RE: Regex = Regex::new(&format!("^{TOKEN}_id$")).unwrap();
}

macro_rules! string_reference_types {
    ($($(#[$outer:meta])* $vis:vis struct $Wrapper:ident;)*) => {
        $(
            $(#[$outer])*
            #[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
            #[serde(transparent)]
            $vis struct $Wrapper(String);

            impl $Wrapper {
                pub fn new(s: impl Into<String>) -> Self {
                    Self(s.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl std::ops::Deref for $Wrapper {
                type Target = str;

                fn deref(&self) -> &str {
                    &self.0
                }
            }

            impl AsRef<str> for $Wrapper {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }

            impl std::fmt::Display for $Wrapper {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $Wrapper {
                fn from(s: &str) -> Self {
                    Self::new(s)
                }
            }

            impl From<String> for $Wrapper {
                fn from(s: String) -> Self {
                    Self::new(s)
                }
            }
        )*
    };
}

string_reference_types! {
    /// The name of an entity within a project. Unique within its project (Invariant 1).
    pub struct EntityName;

    /// The name of a data source declared in a project's `data_sources` map.
    pub struct DataSourceName;

    /// The name of a column as it appears in a materialized table.
    pub struct ColumnName;
}

/// Is `name` a syntactically valid identifier token (letters, digits, `-`, `_`, `.`)?
pub fn is_valid_token(name: &str) -> bool {
    TOKEN_RE.is_match(name)
}

/// Does `name` follow the `public_id` naming convention of ending in `_id`?
pub fn is_valid_public_id(name: &str) -> bool {
    PUBLIC_ID_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_public_id_convention() {
        assert!(is_valid_public_id("location_id"));
        assert!(!is_valid_public_id("location"));
        assert!(!is_valid_public_id("id_location"));
    }

    #[test]
    fn wrapper_round_trips_through_serde() {
        let name = EntityName::new("site");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"site\"");
        let back: EntityName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
