//! # spanner-orm: Schema migrations for Cloud Spanner
//!
//! Migrations are independently authored records linked through the id of the
//! migration they follow. This crate orders them into a single chain, applies
//! or reverts them as validated schema updates, and keeps track of which ones
//! are applied in a status table inside the database itself.
//!
//! The database is reached only through the traits in [`admin`] and
//! [`schema`]. [`emulator::EmulatorDatabase`] implements them in process.

pub mod admin;
pub mod emulator;
pub mod error;
pub mod field;
pub mod index;
pub mod migrations;
pub mod model;
pub mod schema;
pub mod update;

// Re-export core traits and types
pub use admin::{Backend, SchemaAdmin, StatusStore};
pub use emulator::EmulatorDatabase;
pub use error::{OrmError, OrmResult, SchemaError};
pub use field::{Field, FieldType};
pub use index::Index;
pub use migrations::{
    build_chain, Migration, MigrationConfig, MigrationExecutor, MigrationManager,
    MigrationRunResult, MigrationSource, MigrationState, RollbackResult,
};
pub use model::{Model, ModelBuilder, ParentTable};
pub use schema::{SchemaSnapshot, TableMetadata};
pub use update::{
    AddColumn, AlterColumn, CreateIndex, CreateTable, DropColumn, DropIndex, DropTable,
    SchemaUpdate, Update,
};
