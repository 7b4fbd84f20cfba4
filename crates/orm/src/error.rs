//! Error types for the migration system
//!
//! `OrmError` is what every public operation returns. Schema validation
//! failures carry a structured `SchemaError` so callers can tell exactly which
//! rule a schema update broke.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for migration operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Migration definitions do not form a single linear chain
    #[error("Chain integrity error: {0}")]
    ChainIntegrity(String),

    /// A schema update is inconsistent with the live schema
    #[error("Validation error: {0}")]
    Validation(#[from] SchemaError),

    /// A migrate/rollback target cannot be reached
    #[error("Sequencing error: {0}")]
    Sequencing(String),

    /// An upgrade/downgrade factory produced no schema update
    #[error("Migration {0} did not return a SchemaUpdate")]
    FactoryContract(String),

    /// The recorded migration status is not prefix-closed
    #[error("Inconsistent migration status: {0}")]
    InconsistentStatus(String),

    /// Schema administration, snapshot or status store failure
    #[error("Administration error: {0}")]
    Admin(String),

    /// A migration definition file could not be read or parsed
    #[error("Invalid migration definition {}: {message}", path.display())]
    Definition { path: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    pub fn admin(message: impl Into<String>) -> Self {
        OrmError::Admin(message.into())
    }

    pub fn definition(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        OrmError::Definition {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Admin(format!("failed to encode emulator state: {}", err))
    }
}

/// Structural rule broken by a schema update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("New table has no name")]
    EmptyTableName,

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Table {0} does not exist")]
    TableMissing(String),

    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),

    #[error("Table {table} column {column} in primary key but not in schema")]
    PrimaryKeyNotInSchema { table: String, column: String },

    #[error("Table {table} is not a child of parent table {parent}")]
    NotChildOfParent { table: String, parent: String },

    #[error("Table {0} has a secondary index")]
    HasSecondaryIndex(String),

    #[error("Table {table} has interleaved table {child}")]
    HasInterleavedTable { table: String, child: String },

    #[error("Table {table} has interleaved index {index}")]
    HasInterleavedIndex { table: String, index: String },

    #[error("Column {column} already exists on {table}")]
    ColumnExists { table: String, column: String },

    #[error("Column {0} is not nullable")]
    ColumnNotNullable(String),

    #[error("Column {column} is a primary key on {table}")]
    ColumnIsPrimaryKey { table: String, column: String },

    #[error("Column {column} does not exist on {table}")]
    ColumnMissing { table: String, column: String },

    #[error("Column {0} is indexed")]
    ColumnIndexed(String),

    #[error("Column {0} is changing type")]
    ColumnTypeChanged(String),

    #[error("Column {0} has no changes")]
    ColumnUnchanged(String),

    #[error("Index {0} has no columns")]
    IndexWithoutColumns(String),

    #[error("Index {0} already exists")]
    IndexExists(String),

    #[error("Index {0} does not exist")]
    IndexMissing(String),

    #[error("Index {0} is the primary index")]
    PrimaryIndex(String),

    #[error("{column} is part of the primary key for {table}")]
    StoringPrimaryKey { table: String, column: String },

    #[error("{parent} is not a parent of table {table}")]
    NotAParent { table: String, parent: String },
}
