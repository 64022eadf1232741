//! `model` defines the in-memory, already-parsed shape of a Shape Shifter
//! project: data sources, entities, foreign keys, and the row-shape
//! transformations declared on each entity. The core never parses YAML --
//! it receives these types already built by the (external) loader.

mod datasource;
mod entity;
mod error;
mod issue;
pub mod names;
mod project;

pub use datasource::{DataSource, Driver};
pub use entity::{
    Append, Cardinality, ColumnSelector, Constraints, Entity, ExtraColumnSource, FileOptions,
    Filter, ForeignKey, How, Kind, Unnest,
};
pub use error::ConfigError;
pub use issue::{Category, Priority, Severity, Suggestion, ValidationIssue};
pub use names::{ColumnName, DataSourceName, EntityName};
pub use project::{Options, Project, VersionSource};
