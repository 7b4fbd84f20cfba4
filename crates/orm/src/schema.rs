//! Live schema snapshot
//!
//! Schema updates validate themselves against what the database currently
//! looks like. `SchemaSnapshot` is the read-only view they query; each backend
//! decides how to assemble `TableMetadata` from its own catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::OrmResult;
use crate::field::Field;
use crate::index::Index;

/// Table as it currently exists in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    /// Columns in ordinal order, with `primary_key` set for key columns
    pub fields: Vec<Field>,
    pub primary_keys: Vec<String>,
    /// All indexes, including the synthetic primary index
    pub indexes: BTreeMap<String, Index>,
    /// Table this one is interleaved in
    pub parent: Option<String>,
}

impl TableMetadata {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|key| key == column)
    }

    pub fn secondary_indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values().filter(|index| !index.is_primary())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

/// Read-only view of the live schema
#[async_trait]
pub trait SchemaSnapshot: Send + Sync {
    /// Metadata for a single table, `None` if it does not exist
    async fn get_table(&self, name: &str) -> OrmResult<Option<TableMetadata>>;

    /// Metadata for every table, keyed by table name
    async fn get_all_tables(&self) -> OrmResult<BTreeMap<String, TableMetadata>>;

    /// Number of index entries (key or storing, primary index included)
    /// referencing the column
    async fn count_indexed_columns(&self, table: &str, column: &str) -> OrmResult<usize>;
}
