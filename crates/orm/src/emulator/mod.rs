//! In-process database emulator
//!
//! `EmulatorDatabase` implements every backend trait against an in-memory
//! catalog. DDL is parsed and applied with the same structural rejections the
//! real database makes, and the whole state can optionally be persisted to a
//! JSON file so that separate CLI invocations see the same database.

pub mod ddl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::admin::{SchemaAdmin, StatusStore};
use crate::error::{OrmError, OrmResult};
use crate::index::Index;
use crate::migrations::status::StatusRecord;
use crate::schema::{SchemaSnapshot, TableMetadata};
use ddl::DdlStatement;

#[derive(Debug, Default, Serialize, Deserialize)]
struct EmulatorState {
    exists: bool,
    tables: BTreeMap<String, TableMetadata>,
    /// Status rows keyed by table, then by migration id
    #[serde(default)]
    rows: BTreeMap<String, BTreeMap<String, StatusRecord>>,
    #[serde(default)]
    applied_ddl: Vec<String>,
}

impl EmulatorState {
    fn ensure_exists(&self) -> OrmResult<()> {
        if self.exists {
            Ok(())
        } else {
            Err(OrmError::admin("Database does not exist"))
        }
    }

    fn table_mut(&mut self, name: &str) -> OrmResult<&mut TableMetadata> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| OrmError::admin(format!("Table not found: {}", name)))
    }

    fn index_owner(&self, index: &str) -> Option<String> {
        self.tables
            .values()
            .find(|table| table.indexes.contains_key(index))
            .map(|table| table.name.clone())
    }

    fn apply(&mut self, statement: DdlStatement) -> OrmResult<()> {
        match statement {
            DdlStatement::CreateTable {
                table,
                fields,
                primary_keys,
                parent,
            } => {
                if self.tables.contains_key(&table) {
                    return Err(OrmError::admin(format!("Duplicate name in schema: {}", table)));
                }
                if let Some(parent) = &parent {
                    if !self.tables.contains_key(parent) {
                        return Err(OrmError::admin(format!("Table not found: {}", parent)));
                    }
                }
                for key in &primary_keys {
                    if !fields.iter().any(|field| &field.name == key) {
                        return Err(OrmError::admin(format!(
                            "Table {} references nonexistent key column {}",
                            table, key
                        )));
                    }
                }

                let mut indexes = BTreeMap::new();
                indexes.insert(
                    Index::PRIMARY_INDEX.to_string(),
                    Index::primary(primary_keys.clone()),
                );
                self.tables.insert(
                    table.clone(),
                    TableMetadata {
                        name: table,
                        fields,
                        primary_keys,
                        indexes,
                        parent,
                    },
                );
            }
            DdlStatement::DropTable { table } => {
                let metadata = self
                    .tables
                    .get(&table)
                    .ok_or_else(|| OrmError::admin(format!("Table not found: {}", table)))?;
                if let Some(index) = metadata.secondary_indexes().next() {
                    return Err(OrmError::admin(format!(
                        "Cannot drop table {} with indices: {}",
                        table, index.name
                    )));
                }
                if let Some(child) = self
                    .tables
                    .values()
                    .find(|other| other.parent.as_deref() == Some(table.as_str()))
                {
                    return Err(OrmError::admin(format!(
                        "Cannot drop table {} with interleaved tables: {}",
                        table, child.name
                    )));
                }
                self.tables.remove(&table);
                self.rows.remove(&table);
            }
            DdlStatement::AddColumn { table, mut field } => {
                let metadata = self.table_mut(&table)?;
                if metadata.has_column(&field.name) {
                    return Err(OrmError::admin(format!(
                        "Duplicate column name {}.{}",
                        table, field.name
                    )));
                }
                field.primary_key = false;
                metadata.fields.push(field);
            }
            DdlStatement::DropColumn { table, column } => {
                let metadata = self.table_mut(&table)?;
                if !metadata.has_column(&column) {
                    return Err(OrmError::admin(format!(
                        "Column not found in table {}: {}",
                        table, column
                    )));
                }
                if let Some(index) = metadata.indexes.values().find(|index| index.covers(&column)) {
                    return Err(OrmError::admin(format!(
                        "Cannot drop column {}.{} referenced by index {}",
                        table, column, index.name
                    )));
                }
                metadata.fields.retain(|field| field.name != column);
            }
            DdlStatement::AlterColumn { table, field } => {
                let metadata = self.table_mut(&table)?;
                let existing = metadata
                    .fields
                    .iter_mut()
                    .find(|existing| existing.name == field.name)
                    .ok_or_else(|| {
                        OrmError::admin(format!(
                            "Column not found in table {}: {}",
                            table, field.name
                        ))
                    })?;
                existing.field_type = field.field_type;
                existing.nullable = field.nullable;
                existing.allow_commit_timestamp = field.allow_commit_timestamp;
            }
            DdlStatement::CreateIndex { table, index } => {
                if self.index_owner(&index.name).is_some() {
                    return Err(OrmError::admin(format!(
                        "Duplicate name in schema: {}",
                        index.name
                    )));
                }
                if let Some(parent) = &index.parent {
                    if !self.tables.contains_key(parent) {
                        return Err(OrmError::admin(format!("Table not found: {}", parent)));
                    }
                }
                let metadata = self.table_mut(&table)?;
                for column in index.columns.iter().chain(index.storing_columns.iter()) {
                    if !metadata.has_column(column) {
                        return Err(OrmError::admin(format!(
                            "Column not found in table {}: {}",
                            table, column
                        )));
                    }
                }
                metadata.indexes.insert(index.name.clone(), index);
            }
            DdlStatement::DropIndex { index } => {
                let owner = self
                    .index_owner(&index)
                    .filter(|_| index != Index::PRIMARY_INDEX)
                    .ok_or_else(|| OrmError::admin(format!("Index not found: {}", index)))?;
                self.table_mut(&owner)?.indexes.remove(&index);
            }
        }
        Ok(())
    }
}

/// In-process database with optional file persistence. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct EmulatorDatabase {
    state: Arc<Mutex<EmulatorState>>,
    path: Option<PathBuf>,
}

impl EmulatorDatabase {
    /// Create an empty, in-memory database that does not exist yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a database persisted at `path`, starting empty when the file does
    /// not exist yet
    pub fn open(path: impl Into<PathBuf>) -> OrmResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                OrmError::admin(format!("Corrupt emulator state {}: {}", path.display(), e))
            })?
        } else {
            EmulatorState::default()
        };

        tracing::debug!("Opened emulator database at {}", path.display());
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            path: Some(path),
        })
    }

    /// File the state is persisted to, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every DDL statement applied so far, in order
    pub async fn applied_ddl(&self) -> Vec<String> {
        self.state.lock().await.applied_ddl.clone()
    }

    fn persist(&self, state: &EmulatorState) -> OrmResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }
}

#[async_trait]
impl SchemaAdmin for EmulatorDatabase {
    async fn database_exists(&self) -> OrmResult<bool> {
        Ok(self.state.lock().await.exists)
    }

    async fn create_database(&self) -> OrmResult<()> {
        let mut state = self.state.lock().await;
        if state.exists {
            return Err(OrmError::admin("Database already exists"));
        }
        state.exists = true;
        self.persist(&state)
    }

    async fn drop_database(&self) -> OrmResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_exists()?;
        *state = EmulatorState::default();
        self.persist(&state)
    }

    async fn update_schema(&self, ddl: &str) -> OrmResult<()> {
        let statement = ddl::parse(ddl)?;

        let mut state = self.state.lock().await;
        state.ensure_exists()?;
        state.apply(statement)?;
        state.applied_ddl.push(ddl.to_string());
        self.persist(&state)
    }
}

#[async_trait]
impl SchemaSnapshot for EmulatorDatabase {
    async fn get_table(&self, name: &str) -> OrmResult<Option<TableMetadata>> {
        let state = self.state.lock().await;
        state.ensure_exists()?;
        Ok(state.tables.get(name).cloned())
    }

    async fn get_all_tables(&self) -> OrmResult<BTreeMap<String, TableMetadata>> {
        let state = self.state.lock().await;
        state.ensure_exists()?;
        Ok(state.tables.clone())
    }

    async fn count_indexed_columns(&self, table: &str, column: &str) -> OrmResult<usize> {
        let state = self.state.lock().await;
        state.ensure_exists()?;
        Ok(state
            .tables
            .get(table)
            .map(|metadata| {
                metadata
                    .indexes
                    .values()
                    .filter(|index| index.covers(column))
                    .count()
            })
            .unwrap_or(0))
    }
}

#[async_trait]
impl StatusStore for EmulatorDatabase {
    async fn all_status(&self, table: &str) -> OrmResult<Vec<StatusRecord>> {
        let state = self.state.lock().await;
        state.ensure_exists()?;
        if !state.tables.contains_key(table) {
            return Err(OrmError::admin(format!("Table not found: {}", table)));
        }
        Ok(state
            .rows
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_status(&self, table: &str, id: &str) -> OrmResult<Option<StatusRecord>> {
        let state = self.state.lock().await;
        state.ensure_exists()?;
        if !state.tables.contains_key(table) {
            return Err(OrmError::admin(format!("Table not found: {}", table)));
        }
        Ok(state.rows.get(table).and_then(|rows| rows.get(id)).cloned())
    }

    async fn upsert_status(&self, table: &str, record: StatusRecord) -> OrmResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_exists()?;
        if !state.tables.contains_key(table) {
            return Err(OrmError::admin(format!("Table not found: {}", table)));
        }
        state
            .rows
            .entry(table.to_string())
            .or_default()
            .insert(record.id.clone(), record);
        self.persist(&state)
    }
}
