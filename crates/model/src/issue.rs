use crate::names::EntityName;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How serious a [`ValidationIssue`] is.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What kind of concern raised the issue.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Structural,
    Data,
    Performance,
}

/// How urgently an issue should be addressed, independent of `severity`
/// (a `warning` can still be `critical`, e.g. a deep dependency chain that
/// will make every future edit slow).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// A mechanically-applicable fix an editor could offer for an
/// `auto_fixable` issue.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Suggestion {
    pub description: String,
    /// Proposed replacement value, when the fix is a simple field rewrite
    /// (e.g. renaming `id` to `entity_name_id`).
    pub replacement: Option<String>,
}

/// A single finding surfaced by the Dependency Graph Service, the Linker, or
/// the Validation Engine. Every surfaced issue carries a stable `code` so
/// callers can match on it without parsing `message` (spec §7).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub entity: Option<EntityName>,
    pub field: Option<String>,
    pub message: String,
    pub code: &'static str,
    pub category: Category,
    pub priority: Priority,
    #[serde(default)]
    pub auto_fixable: bool,
    #[serde(default)]
    pub suggestion: Option<Suggestion>,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        category: Category,
        priority: Priority,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            severity,
            entity: None,
            field: None,
            message: message.into(),
            code,
            category,
            priority,
            auto_fixable: false,
            suggestion: None,
        }
    }

    pub fn with_entity(mut self, entity: EntityName) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.auto_fixable = true;
        self.suggestion = Some(suggestion);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
