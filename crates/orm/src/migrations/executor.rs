//! Migration Executor - Applies migrations and tracks their status
//!
//! The executor walks the ordered migration chain, runs each migration's
//! schema update against the backend and records the outcome in the status
//! table, one migration at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::chain::build_chain;
use super::definitions::{
    Migration, MigrationConfig, MigrationDirection, MigrationRunResult, MigrationState,
};
use super::manager::{MigrationManager, MigrationSource};
use super::status::{status_model, StatusRecord};
use crate::admin::Backend;
use crate::error::{OrmError, OrmResult};
use crate::update::SchemaUpdate;

/// Runs migrations against a single database.
///
/// Assumes it is the only writer of the status table while it runs.
pub struct MigrationExecutor<B: Backend> {
    backend: B,
    source: Box<dyn MigrationSource>,
    chain: Option<Arc<[Migration]>>,
    status: Option<HashMap<String, bool>>,
    status_table: String,
}

impl<B: Backend> MigrationExecutor<B> {
    /// Create an executor over the given migrations
    pub fn new(backend: B, source: impl MigrationSource + 'static) -> Self {
        Self {
            backend,
            source: Box::new(source),
            chain: None,
            status: None,
            status_table: MigrationConfig::DEFAULT_TABLE.to_string(),
        }
    }

    /// Create an executor reading migrations from the configured directory
    pub fn from_config(backend: B, config: MigrationConfig) -> Self {
        let status_table = config.migrations_table.clone();
        Self::new(backend, MigrationManager::with_config(config)).with_status_table(status_table)
    }

    pub fn with_status_table(mut self, table: impl Into<String>) -> Self {
        self.status_table = table.into();
        self.status = None;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn status_table(&self) -> &str {
        &self.status_table
    }

    /// All migrations in the order they have to be applied
    pub fn migrations(&mut self) -> OrmResult<Arc<[Migration]>> {
        if let Some(chain) = &self.chain {
            return Ok(chain.clone());
        }

        let chain: Arc<[Migration]> = build_chain(self.source.discover()?)?.into();
        self.chain = Some(chain.clone());
        Ok(chain)
    }

    /// Whether the migration is currently applied. No migration (`None`) is
    /// always considered applied.
    pub async fn migrated(&mut self, migration_id: Option<&str>) -> OrmResult<bool> {
        let Some(migration_id) = migration_id else {
            return Ok(true);
        };
        Ok(self
            .migration_status()
            .await?
            .get(migration_id)
            .copied()
            .unwrap_or(false))
    }

    /// Execute unapplied migrations in chain order, stopping after `target`
    /// when one is given. An empty target counts as none.
    pub async fn migrate(&mut self, target: Option<&str>) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();
        let target = target.filter(|target| !target.is_empty());

        self.connect().await?;
        self.validate_chain().await?;

        let chain = self.migrations()?;
        let pending = self
            .filter_migrations(chain.iter(), false, target)
            .await?;
        let skipped_count = self.applied_count(&chain).await?;

        let mut applied_migrations = Vec::with_capacity(pending.len());
        for migration in pending {
            self.execute(&migration, MigrationDirection::Up).await?;
            applied_migrations.push(migration.id().to_string());
        }

        Ok(MigrationRunResult {
            applied_count: applied_migrations.len(),
            applied_migrations,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Applied state of every migration, most recent first
    pub async fn show_migrations(&mut self) -> OrmResult<Vec<MigrationState>> {
        self.connect().await?;
        self.validate_chain().await?;

        let chain = self.migrations()?;
        let mut states = Vec::with_capacity(chain.len());
        for migration in chain.iter().rev() {
            states.push(MigrationState {
                id: migration.id().to_string(),
                description: migration.description().to_string(),
                applied: self.migrated(Some(migration.id())).await?,
            });
        }
        Ok(states)
    }

    /// Create the database if it does not exist yet
    pub(crate) async fn connect(&self) -> OrmResult<()> {
        if !self.backend.database_exists().await? {
            tracing::warn!("Database does not exist, creating it");
            self.backend.create_database().await?;
        }
        Ok(())
    }

    /// Check that the applied migrations form a prefix of the chain
    pub async fn validate_chain(&mut self) -> OrmResult<()> {
        let chain = self.migrations()?;
        let Some(first) = chain.first() else {
            return Ok(());
        };

        if !self.migrated(first.prev_id()).await? {
            return Err(OrmError::InconsistentStatus(format!(
                "First migration {} depends on unmigrated migration {}",
                first.id(),
                first.prev_id().unwrap_or_default()
            )));
        }

        for migration in chain.iter() {
            if self.migrated(Some(migration.id())).await?
                && !self.migrated(migration.prev_id()).await?
            {
                return Err(OrmError::InconsistentStatus(format!(
                    "Migrated migration {} depends on an unmigrated migration",
                    migration.id()
                )));
            }
        }
        Ok(())
    }

    /// Keep the migrations whose status equals `applied`, stopping after
    /// `target`. A target that is never kept is an error.
    pub(crate) async fn filter_migrations<'a>(
        &mut self,
        migrations: impl Iterator<Item = &'a Migration>,
        applied: bool,
        target: Option<&str>,
    ) -> OrmResult<Vec<Migration>> {
        let mut filtered = Vec::new();
        let mut target_found = false;

        for migration in migrations {
            if self.migrated(Some(migration.id())).await? != applied {
                continue;
            }
            filtered.push(migration.clone());

            if target == Some(migration.id()) {
                target_found = true;
                break;
            }
        }

        match target {
            Some(target) if !target_found => Err(OrmError::Sequencing(format!(
                "{} already has desired status or does not exist",
                target
            ))),
            _ => Ok(filtered),
        }
    }

    /// Run one migration in the given direction and record its new status
    pub(crate) async fn execute(
        &mut self,
        migration: &Migration,
        direction: MigrationDirection,
    ) -> OrmResult<()> {
        tracing::info!("Processing migration {}", migration.id());

        let update: SchemaUpdate = match direction {
            MigrationDirection::Up => migration.upgrade(),
            MigrationDirection::Down => migration.downgrade(),
        }
        .ok_or_else(|| OrmError::FactoryContract(migration.id().to_string()))?;

        update.execute(&self.backend, &self.backend).await?;
        self.update_status(migration.id(), direction.applied()).await
    }

    /// Persist the status of a migration and update the cache
    pub async fn update_status(&mut self, migration_id: &str, applied: bool) -> OrmResult<()> {
        let table = self.status_table.clone();
        self.migration_status().await?;
        self.backend
            .upsert_status(&table, StatusRecord::now(migration_id, applied))
            .await?;

        if let Some(status) = self.status.as_mut() {
            status.insert(migration_id.to_string(), applied);
        }
        Ok(())
    }

    async fn applied_count(&mut self, chain: &[Migration]) -> OrmResult<usize> {
        let mut count = 0;
        for migration in chain {
            if self.migrated(Some(migration.id())).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Status of every migration ever executed, loaded once. Creates the
    /// status table when the database does not have one yet.
    async fn migration_status(&mut self) -> OrmResult<&HashMap<String, bool>> {
        if self.status.is_none() {
            if self.backend.get_table(&self.status_table).await?.is_none() {
                tracing::debug!("Creating migration status table {}", self.status_table);
                SchemaUpdate::create_table(status_model(&self.status_table))
                    .execute(&self.backend, &self.backend)
                    .await?;
            }

            let records = self.backend.all_status(&self.status_table).await?;
            tracing::debug!("Loaded {} migration status records", records.len());
            self.status = Some(
                records
                    .into_iter()
                    .map(|record| (record.id, record.applied))
                    .collect(),
            );
        }

        Ok(self.status.get_or_insert_with(HashMap::new))
    }
}
