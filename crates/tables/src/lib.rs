//! `tables` is the in-memory tabular substrate shared by the Transform
//! Kernel, Identity Manager, Linker, and Normalizer: a typed `Table`
//! abstraction standing in for the source system's untyped data frames, a
//! `TableStore` keyed by entity name, and the content hashing primitive the
//! Preview/Validation Cache builds its three-tier invalidation on.

mod hash;
mod store;
mod table;
mod value;

pub use hash::{combine_hashes, content_hash};
pub use store::{StoreError, TableStore};
pub use table::{Table, TableError};
pub use value::Value;
