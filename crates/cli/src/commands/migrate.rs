use anyhow::Context;
use std::path::Path;

use spanner_orm::{EmulatorDatabase, MigrationExecutor, MigrationManager};

use crate::config::CliConfig;

fn executor(
    config: &CliConfig,
    instance: &str,
    database: &str,
    directory: Option<&Path>,
) -> anyhow::Result<MigrationExecutor<EmulatorDatabase>> {
    let path = config.database_path(instance, database);
    let db = EmulatorDatabase::open(&path)
        .with_context(|| format!("failed to open database {}/{}", instance, database))?;
    Ok(MigrationExecutor::from_config(
        db,
        config.migration_config(directory),
    ))
}

/// Create a new migration file after the current last migration
pub fn generate(config: &CliConfig, name: &str, directory: Option<&Path>) -> anyhow::Result<()> {
    let manager = MigrationManager::with_config(config.migration_config(directory));
    let path = manager.generate(name)?;
    println!("Created migration: {}", path.display());
    Ok(())
}

pub async fn migrate(
    config: &CliConfig,
    instance: &str,
    database: &str,
    target: Option<&str>,
    directory: Option<&Path>,
) -> anyhow::Result<()> {
    let mut executor = executor(config, instance, database, directory)?;
    let result = executor.migrate(target).await?;

    if result.applied_count == 0 {
        println!("No migrations to apply");
    } else {
        for id in &result.applied_migrations {
            println!("Applied migration: {}", id);
        }
        println!(
            "Applied {} migration(s) in {}ms",
            result.applied_count, result.execution_time_ms
        );
    }
    Ok(())
}

pub async fn show(
    config: &CliConfig,
    instance: &str,
    database: &str,
    directory: Option<&Path>,
) -> anyhow::Result<()> {
    let mut executor = executor(config, instance, database, directory)?;
    for state in executor.show_migrations().await? {
        println!("{}", state);
    }
    Ok(())
}

pub async fn rollback(
    config: &CliConfig,
    instance: &str,
    database: &str,
    target: &str,
    directory: Option<&Path>,
) -> anyhow::Result<()> {
    let mut executor = executor(config, instance, database, directory)?;
    let result = executor.rollback(target).await?;

    for id in &result.rolled_back_migrations {
        println!("Rolled back migration: {}", id);
    }
    println!(
        "Rolled back {} migration(s) in {}ms",
        result.rolled_back_count, result.execution_time_ms
    );
    Ok(())
}
