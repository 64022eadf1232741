//! `identity` is the Identity Manager (C4) and Linker (C5), spec §4.4: the
//! three-tier identity scheme (`system_id`, business `keys`, `public_id`)
//! and the FK-join algorithm the Normalizer invokes once per declared
//! foreign key, in declaration order.

mod error;
mod linker;
mod stats;
mod system_id;

pub use error::IdentityError;
pub use linker::{link, LinkOutcome};
pub use stats::FkStats;
pub use system_id::assign as assign_system_id;
