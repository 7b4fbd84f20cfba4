//! Schema administration and status persistence traits
//!
//! These are the seams between the migration engine and a concrete database.
//! The engine never talks to a database in any other way.

use async_trait::async_trait;

use crate::error::OrmResult;
use crate::migrations::status::StatusRecord;
use crate::schema::SchemaSnapshot;

/// Issues DDL against a database
#[async_trait]
pub trait SchemaAdmin: Send + Sync {
    async fn database_exists(&self) -> OrmResult<bool>;

    async fn create_database(&self) -> OrmResult<()>;

    async fn drop_database(&self) -> OrmResult<()>;

    /// Apply a single DDL statement, returning once it has been applied
    async fn update_schema(&self, ddl: &str) -> OrmResult<()>;
}

/// Keyed store for migration status rows
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn all_status(&self, table: &str) -> OrmResult<Vec<StatusRecord>>;

    async fn get_status(&self, table: &str, id: &str) -> OrmResult<Option<StatusRecord>>;

    /// Insert or replace the row keyed by `record.id`
    async fn upsert_status(&self, table: &str, record: StatusRecord) -> OrmResult<()>;
}

/// Everything the migration executor needs from a database
pub trait Backend: SchemaAdmin + SchemaSnapshot + StatusStore {}

impl<T> Backend for T where T: SchemaAdmin + SchemaSnapshot + StatusStore {}
