mod error;
mod record;

pub use error::*;
pub use record::*;

/// Scope key for hub-wide aggregates, as opposed to a single client name.
pub const ALL_SYSTEMS: &str = "all";
