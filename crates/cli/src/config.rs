use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use spanner_orm::MigrationConfig;

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "spanner-orm.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding the migration definition files
    pub migrations_dir: PathBuf,
    /// Directory holding emulated databases, one file per database
    pub data_dir: PathBuf,
    /// Table recording migration status
    pub migrations_table: String,
    /// Log level filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub log_json: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(MigrationConfig::DEFAULT_DIRECTORY),
            data_dir: PathBuf::from(".spanner-orm"),
            migrations_table: MigrationConfig::DEFAULT_TABLE.to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl CliConfig {
    /// Load settings from `path`, or from `spanner-orm.yaml` when it exists,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        let config = serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid configuration {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Override settings from `SPANNER_ORM_*` variables
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("SPANNER_ORM_MIGRATIONS_DIR") {
            self.migrations_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("SPANNER_ORM_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(table) = var("SPANNER_ORM_TABLE") {
            self.migrations_table = table;
        }
        if let Some(level) = var("SPANNER_ORM_LOG") {
            self.log_level = level;
        }
    }

    /// Library configuration, with `--directory` taking precedence
    pub fn migration_config(&self, directory: Option<&Path>) -> MigrationConfig {
        MigrationConfig {
            migrations_dir: directory
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.migrations_dir.clone()),
            migrations_table: self.migrations_table.clone(),
        }
    }

    /// File backing the emulated database
    pub fn database_path(&self, instance: &str, database: &str) -> PathBuf {
        self.data_dir.join(instance).join(format!("{}.json", database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
        assert_eq!(config.migrations_table, "spanner_orm_migrations");
        assert_eq!(
            config.database_path("test-instance", "app"),
            PathBuf::from(".spanner-orm/test-instance/app.json")
        );
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("spanner-orm.yaml");
        std::fs::write(&path, "migrations_dir: db/migrations\nlog_level: debug\n").unwrap();

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.data_dir, PathBuf::from(".spanner-orm"));
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("spanner-orm.yaml");
        std::fs::write(&path, "log_json: maybe\n").unwrap();
        assert!(CliConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("SPANNER_ORM_DATA_DIR", "/var/lib/emulator"),
            ("SPANNER_ORM_TABLE", "schema_history"),
        ]
        .into_iter()
        .collect();

        let mut config = CliConfig::default();
        config.apply_env(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/emulator"));
        assert_eq!(config.migrations_table, "schema_history");
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
    }

    #[test]
    fn test_directory_flag_wins() {
        let config = CliConfig::default();
        let migration_config = config.migration_config(Some(Path::new("other")));
        assert_eq!(migration_config.migrations_dir, PathBuf::from("other"));
        assert_eq!(migration_config.migrations_table, "spanner_orm_migrations");
    }
}
