//! Migration Manager - File system operations for migrations
//!
//! Handles creating, loading, and parsing migration definition files. Each
//! `*.toml` file in the migrations directory defines one migration:
//!
//! ```toml
//! migration_id = "eceb25f170dd"
//! prev_migration_id = "5c078bbb4d43"
//! description = "add nickname"
//!
//! [upgrade]
//! kind = "add_column"
//! table = "Users"
//! column = "nickname"
//! field = { type = "string", nullable = true }
//!
//! [downgrade]
//! kind = "drop_column"
//! table = "Users"
//! column = "nickname"
//! ```

use chrono::Local;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::chain::build_chain;
use super::definitions::{Migration, MigrationConfig};
use crate::error::{OrmError, OrmResult};
use crate::update::SchemaUpdate;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").expect("static regex"));

/// Yields the migrations known to the system, in no particular order
pub trait MigrationSource: Send + Sync {
    fn discover(&self) -> OrmResult<Vec<Migration>>;
}

impl MigrationSource for Vec<Migration> {
    fn discover(&self) -> OrmResult<Vec<Migration>> {
        Ok(self.clone())
    }
}

/// On-disk shape of a migration definition
#[derive(Debug, Serialize, Deserialize)]
struct MigrationFile {
    migration_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prev_migration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upgrade: Option<SchemaUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    downgrade: Option<SchemaUpdate>,
}

/// Migration manager for creating and loading migrations
pub struct MigrationManager {
    config: MigrationConfig,
    migrations: OnceCell<Vec<Migration>>,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self {
            config,
            migrations: OnceCell::new(),
        }
    }

    /// Create a manager reading from the given directory
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self::with_config(MigrationConfig {
            migrations_dir: directory.into(),
            ..MigrationConfig::default()
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// All migrations in the order they have to be applied, loaded once
    pub fn migrations(&self) -> OrmResult<&[Migration]> {
        self.migrations
            .get_or_try_init(|| build_chain(self.load_migrations()?))
            .map(Vec::as_slice)
    }

    /// Creates a new migration that is the last migration to be executed
    pub fn generate(&self, name: &str) -> OrmResult<PathBuf> {
        fs::create_dir_all(&self.config.migrations_dir)?;

        let chain = build_chain(self.load_migrations()?)?;
        let prev_id = chain.last().map(|migration| migration.id().to_string());

        let uuid = Uuid::new_v4().simple().to_string();
        let migration_id = uuid[uuid.len() - 12..].to_string();

        let filename = format!("{}_{}.toml", NON_WORD.replace_all(name, "_"), migration_id);
        let filepath = self.config.migrations_dir.join(filename);

        let template = self.create_migration_template(name, &migration_id, prev_id)?;
        fs::write(&filepath, template)?;

        tracing::info!("Generated migration {} at {}", migration_id, filepath.display());
        Ok(filepath)
    }

    /// Load all migration files from the migrations directory, unordered
    pub fn load_migrations(&self) -> OrmResult<Vec<Migration>> {
        if !self.config.migrations_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.config.migrations_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "toml") {
                paths.push(path);
            }
        }
        // Keeps error reporting stable; chain order comes from the links alone
        paths.sort();

        paths
            .iter()
            .map(|path| self.migration_from_file(path))
            .collect()
    }

    /// Parse a single migration definition file
    pub fn migration_from_file(&self, path: &Path) -> OrmResult<Migration> {
        let content = fs::read_to_string(path)
            .map_err(|e| OrmError::definition(path, format!("failed to read file: {}", e)))?;
        let file: MigrationFile =
            toml::from_str(&content).map_err(|e| OrmError::definition(path, e.to_string()))?;

        if file.migration_id.trim().is_empty() {
            return Err(OrmError::definition(path, "migration has no migration id"));
        }

        let description = file.description.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let upgrade = file.upgrade;
        let downgrade = file.downgrade;
        Ok(
            Migration::new(file.migration_id, file.prev_migration_id.as_deref(), description)
                .with_upgrade_factory(Arc::new(move || upgrade.clone()))
                .with_downgrade_factory(Arc::new(move || downgrade.clone())),
        )
    }

    /// Create migration template content
    fn create_migration_template(
        &self,
        name: &str,
        migration_id: &str,
        prev_migration_id: Option<String>,
    ) -> OrmResult<String> {
        let header = MigrationFile {
            migration_id: migration_id.to_string(),
            prev_migration_id,
            description: Some(name.to_string()),
            upgrade: None,
            downgrade: None,
        };
        let header = toml::to_string(&header)
            .map_err(|e| OrmError::Configuration(format!("failed to render migration: {}", e)))?;

        Ok(format!(
            "# Migration: {}\n\
             # Created: {}\n\n\
             {}\n\
             # Schema update applied by this migration, for example:\n\
             #\n\
             # [upgrade]\n\
             # kind = \"add_column\"\n\
             # table = \"Users\"\n\
             # column = \"nickname\"\n\
             # field = {{ type = \"string\", nullable = true }}\n\
             #\n\
             # Schema update that rolls it back:\n\
             #\n\
             # [downgrade]\n\
             # kind = \"drop_column\"\n\
             # table = \"Users\"\n\
             # column = \"nickname\"\n\
             #\n\
             # Use kind = \"no_op\" for a direction that changes no schema.\n",
            name,
            Local::now().format("%Y-%m-%d %H:%M"),
            header
        ))
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationSource for MigrationManager {
    fn discover(&self) -> OrmResult<Vec<Migration>> {
        self.load_migrations()
    }
}
