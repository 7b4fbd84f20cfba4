//! Migration Rollback - Handles rolling back applied migrations
//!
//! Rolling back walks the chain from the most recent migration backwards,
//! executing each applied migration's downgrade until the target migration
//! itself has been rolled back.

use std::time::Instant;

use super::definitions::{MigrationDirection, RollbackResult};
use super::executor::MigrationExecutor;
use crate::admin::Backend;
use crate::error::{OrmError, OrmResult};

impl<B: Backend> MigrationExecutor<B> {
    /// Roll back applied migrations, most recent first, up to and including
    /// `target`
    pub async fn rollback(&mut self, target: &str) -> OrmResult<RollbackResult> {
        let start_time = Instant::now();

        if target.is_empty() {
            return Err(OrmError::Sequencing(
                "Must specify a migration to roll back".to_string(),
            ));
        }

        self.connect().await?;
        self.validate_chain().await?;

        let chain = self.migrations()?;
        let applied = self
            .filter_migrations(chain.iter().rev(), true, Some(target))
            .await?;

        let mut rolled_back_migrations = Vec::with_capacity(applied.len());
        for migration in applied {
            self.execute(&migration, MigrationDirection::Down).await?;
            rolled_back_migrations.push(migration.id().to_string());
        }

        Ok(RollbackResult {
            rolled_back_count: rolled_back_migrations.len(),
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
