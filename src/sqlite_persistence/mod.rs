mod versioned_schema;

pub use versioned_schema::{Column, ForeignKey, SqlType, Table, VersionedSchema};

/// Offset added to schema versions before they are written to `PRAGMA user_version`,
/// so a database created by something else is never mistaken for ours.
pub const BASE_DB_VERSION: usize = 77000;
