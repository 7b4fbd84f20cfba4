//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the migration record itself, the configuration of the migration
//! system and the results reported by migrate and rollback runs.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::update::SchemaUpdate;

/// Produces the schema update for one direction of a migration.
///
/// Returning `None` breaks the factory contract and aborts execution before any
/// DDL is issued.
pub type UpdateFactory = Arc<dyn Fn() -> Option<SchemaUpdate> + Send + Sync>;

fn no_update() -> UpdateFactory {
    Arc::new(|| Some(SchemaUpdate::NoOp))
}

/// A single migration: its place in the chain and how to apply or revert it
#[derive(Clone)]
pub struct Migration {
    id: String,
    prev_id: Option<String>,
    description: String,
    upgrade: UpdateFactory,
    downgrade: UpdateFactory,
}

impl Migration {
    /// Create a migration whose upgrade and downgrade touch no schema
    pub fn new(id: impl Into<String>, prev_id: Option<&str>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prev_id: prev_id.map(str::to_string),
            description: description.into(),
            upgrade: no_update(),
            downgrade: no_update(),
        }
    }

    pub fn with_upgrade<F>(self, upgrade: F) -> Self
    where
        F: Fn() -> SchemaUpdate + Send + Sync + 'static,
    {
        self.with_upgrade_factory(Arc::new(move || Some(upgrade())))
    }

    pub fn with_downgrade<F>(self, downgrade: F) -> Self
    where
        F: Fn() -> SchemaUpdate + Send + Sync + 'static,
    {
        self.with_downgrade_factory(Arc::new(move || Some(downgrade())))
    }

    pub fn with_upgrade_factory(mut self, factory: UpdateFactory) -> Self {
        self.upgrade = factory;
        self
    }

    pub fn with_downgrade_factory(mut self, factory: UpdateFactory) -> Self {
        self.downgrade = factory;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the migration this one follows, `None` for the first migration
    pub fn prev_id(&self) -> Option<&str> {
        self.prev_id.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Build the schema update that applies this migration
    pub fn upgrade(&self) -> Option<SchemaUpdate> {
        (self.upgrade)()
    }

    /// Build the schema update that reverts this migration
    pub fn downgrade(&self) -> Option<SchemaUpdate> {
        (self.downgrade)()
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("prev_id", &self.prev_id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration definition files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
}

impl MigrationConfig {
    pub const DEFAULT_DIRECTORY: &'static str = "migrations";
    pub const DEFAULT_TABLE: &'static str = "spanner_orm_migrations";
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(Self::DEFAULT_DIRECTORY),
            migrations_table: Self::DEFAULT_TABLE.to_string(),
        }
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// IDs of migrations that were applied, in order
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were already applied
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back migrations
#[derive(Debug)]
pub struct RollbackResult {
    /// Number of migrations that were rolled back
    pub rolled_back_count: usize,
    /// IDs of migrations that were rolled back, most recent first
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run the upgrade)
    Up,
    /// Rollback the migration (run the downgrade)
    Down,
}

impl MigrationDirection {
    /// Status a migration has once executed in this direction
    pub fn applied(self) -> bool {
        matches!(self, MigrationDirection::Up)
    }
}

/// Applied state of one migration, as listed by `show_migrations`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub id: String,
    pub description: String,
    pub applied: bool,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}, {}",
            if self.applied { "X" } else { " " },
            self.id,
            self.description
        )
    }
}
