//! Schema updates
//!
//! Each update describes exactly one DDL change. Updates are plain values:
//! `ddl()` renders the statement, `validate()` checks it against a live schema
//! snapshot without changing anything, and `execute()` validates and only then
//! hands the statement to the administration interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::admin::SchemaAdmin;
use crate::error::{OrmResult, SchemaError};
use crate::field::Field;
use crate::index::Index;
use crate::model::{Model, ParentTable};
use crate::schema::{SchemaSnapshot, TableMetadata};

/// Validation and rendering shared by every schema update
#[async_trait]
pub trait Update: Send + Sync {
    /// The single DDL statement this update issues
    fn ddl(&self) -> String;

    /// Check the update against the live schema
    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()>;
}

async fn existing_table(snapshot: &dyn SchemaSnapshot, table: &str) -> OrmResult<TableMetadata> {
    snapshot
        .get_table(table)
        .await?
        .ok_or_else(|| SchemaError::TableMissing(table.to_string()).into())
}

fn existing_column<'a>(
    table: &'a TableMetadata,
    column: &str,
) -> Result<&'a Field, SchemaError> {
    table.field(column).ok_or_else(|| SchemaError::ColumnMissing {
        table: table.name.clone(),
        column: column.to_string(),
    })
}

/// Creates a new table from a model descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub model: Model,
}

impl CreateTable {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    fn validate_parent(&self, parent: &ParentTable) -> Result<(), SchemaError> {
        let error = || SchemaError::NotChildOfParent {
            table: self.model.table.clone(),
            parent: parent.table.clone(),
        };

        let shares_prefix = parent
            .primary_keys
            .iter()
            .zip(self.model.primary_keys.iter())
            .all(|(parent_key, key)| parent_key == key);
        if !shares_prefix || parent.primary_keys.len() > self.model.primary_keys.len() {
            return Err(error());
        }
        Ok(())
    }

    fn validate_primary_keys(&self) -> Result<(), SchemaError> {
        if self.model.primary_keys.is_empty() {
            return Err(SchemaError::NoPrimaryKey(self.model.table.clone()));
        }

        for key in &self.model.primary_keys {
            if !self.model.has_field(key) {
                return Err(SchemaError::PrimaryKeyNotInSchema {
                    table: self.model.table.clone(),
                    column: key.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Update for CreateTable {
    fn ddl(&self) -> String {
        let fields: Vec<String> = self
            .model
            .fields
            .iter()
            .map(|field| format!("{} {}", field.name, field.ddl()))
            .collect();
        let mut statement = format!(
            "CREATE TABLE {} ({}) PRIMARY KEY ({})",
            self.model.table,
            fields.join(", "),
            self.model.primary_keys.join(", ")
        );

        if let Some(parent) = &self.model.interleave_in {
            statement.push_str(&format!(
                ", INTERLEAVE IN PARENT {} ON DELETE CASCADE",
                parent.table
            ));
        }
        statement
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        if self.model.table.is_empty() {
            return Err(SchemaError::EmptyTableName.into());
        }

        if snapshot.get_table(&self.model.table).await?.is_some() {
            return Err(SchemaError::TableExists(self.model.table.clone()).into());
        }

        if let Some(parent) = &self.model.interleave_in {
            self.validate_parent(parent)?;
        }

        self.validate_primary_keys()?;
        Ok(())
    }
}

/// Drops an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    pub table: String,
}

impl DropTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

#[async_trait]
impl Update for DropTable {
    fn ddl(&self) -> String {
        format!("DROP TABLE {}", self.table)
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        let table = existing_table(snapshot, &self.table).await?;

        if table.secondary_indexes().next().is_some() {
            return Err(SchemaError::HasSecondaryIndex(self.table.clone()).into());
        }

        for other in snapshot.get_all_tables().await?.values() {
            if other.parent.as_deref() == Some(self.table.as_str()) {
                return Err(SchemaError::HasInterleavedTable {
                    table: self.table.clone(),
                    child: other.name.clone(),
                }
                .into());
            }
            for index in other.indexes.values() {
                if index.parent.as_deref() == Some(self.table.as_str()) {
                    return Err(SchemaError::HasInterleavedIndex {
                        table: self.table.clone(),
                        index: index.name.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Adds a nullable, non-key column to an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumn {
    pub table: String,
    pub column: String,
    pub field: Field,
}

impl AddColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>, field: Field) -> Self {
        let column = column.into();
        Self {
            table: table.into(),
            field: Field {
                name: column.clone(),
                ..field
            },
            column,
        }
    }
}

#[async_trait]
impl Update for AddColumn {
    fn ddl(&self) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.table,
            self.column,
            self.field.ddl()
        )
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        let table = existing_table(snapshot, &self.table).await?;

        if table.has_column(&self.column) {
            return Err(SchemaError::ColumnExists {
                table: self.table.clone(),
                column: self.column.clone(),
            }
            .into());
        }
        if !self.field.nullable {
            return Err(SchemaError::ColumnNotNullable(self.column.clone()).into());
        }
        if self.field.primary_key {
            return Err(SchemaError::ColumnIsPrimaryKey {
                table: self.table.clone(),
                column: self.column.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// Drops an unindexed column from an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumn {
    pub table: String,
    pub column: String,
}

impl DropColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[async_trait]
impl Update for DropColumn {
    fn ddl(&self) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", self.table, self.column)
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        let table = existing_table(snapshot, &self.table).await?;
        existing_column(&table, &self.column)?;

        let indexed = snapshot
            .count_indexed_columns(&self.table, &self.column)
            .await?;
        if indexed > 0 {
            return Err(SchemaError::ColumnIndexed(self.column.clone()).into());
        }
        Ok(())
    }
}

/// Flips the nullability of a non-key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterColumn {
    pub table: String,
    pub column: String,
    pub field: Field,
}

impl AlterColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>, field: Field) -> Self {
        let column = column.into();
        Self {
            table: table.into(),
            field: Field {
                name: column.clone(),
                ..field
            },
            column,
        }
    }
}

#[async_trait]
impl Update for AlterColumn {
    fn ddl(&self) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.table,
            self.column,
            self.field.ddl()
        )
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        let table = existing_table(snapshot, &self.table).await?;
        let existing = existing_column(&table, &self.column)?;

        if table.is_primary_key(&self.column) {
            return Err(SchemaError::ColumnIsPrimaryKey {
                table: self.table.clone(),
                column: self.column.clone(),
            }
            .into());
        }

        if !self.field.field_type.same_base_type(&existing.field_type) {
            return Err(SchemaError::ColumnTypeChanged(self.column.clone()).into());
        }
        if self.field.nullable == existing.nullable {
            return Err(SchemaError::ColumnUnchanged(self.column.clone()).into());
        }
        Ok(())
    }
}

/// Creates a secondary index on an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndex {
    pub table: String,
    pub index: String,
    pub columns: Vec<String>,
    /// Ancestor table to interleave the index in
    #[serde(default)]
    pub interleave_in: Option<String>,
    #[serde(default)]
    pub storing_columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub null_filtered: bool,
}

impl CreateIndex {
    pub fn new<I, S>(table: impl Into<String>, index: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            index: index.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            interleave_in: None,
            storing_columns: Vec::new(),
            unique: false,
            null_filtered: false,
        }
    }

    /// Create an update from a model's index descriptor
    pub fn from_index(table: impl Into<String>, index: &Index) -> Self {
        Self {
            table: table.into(),
            index: index.name.clone(),
            columns: index.columns.clone(),
            interleave_in: index.parent.clone(),
            storing_columns: index.storing_columns.clone(),
            unique: index.unique,
            null_filtered: index.null_filtered,
        }
    }

    pub fn interleave_in(mut self, parent: impl Into<String>) -> Self {
        self.interleave_in = Some(parent.into());
        self
    }

    pub fn storing<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.storing_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn null_filtered(mut self, null_filtered: bool) -> Self {
        self.null_filtered = null_filtered;
        self
    }

    fn validate_columns(&self, table: &TableMetadata) -> Result<(), SchemaError> {
        for column in self.columns.iter().chain(self.storing_columns.iter()) {
            existing_column(table, column)?;
        }

        for column in &self.storing_columns {
            if table.is_primary_key(column) {
                return Err(SchemaError::StoringPrimaryKey {
                    table: self.table.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    async fn validate_parent(
        &self,
        snapshot: &dyn SchemaSnapshot,
        table: &TableMetadata,
        parent: &str,
    ) -> OrmResult<()> {
        let mut seen = HashSet::new();
        let mut ancestor = table.parent.clone();
        while let Some(name) = ancestor {
            if name == parent {
                return Ok(());
            }
            if !seen.insert(name.clone()) {
                break;
            }
            ancestor = snapshot.get_table(&name).await?.and_then(|t| t.parent);
        }

        Err(SchemaError::NotAParent {
            table: self.table.clone(),
            parent: parent.to_string(),
        }
        .into())
    }
}

#[async_trait]
impl Update for CreateIndex {
    fn ddl(&self) -> String {
        let mut statement = String::from("CREATE ");
        if self.unique {
            statement.push_str("UNIQUE ");
        }
        if self.null_filtered {
            statement.push_str("NULL_FILTERED ");
        }
        statement.push_str(&format!(
            "INDEX {} ON {} ({})",
            self.index,
            self.table,
            self.columns.join(", ")
        ));
        if !self.storing_columns.is_empty() {
            statement.push_str(&format!(" STORING ({})", self.storing_columns.join(", ")));
        }
        if let Some(parent) = &self.interleave_in {
            statement.push_str(&format!(", INTERLEAVE IN {}", parent));
        }
        statement
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        let table = existing_table(snapshot, &self.table).await?;

        if self.columns.is_empty() {
            return Err(SchemaError::IndexWithoutColumns(self.index.clone()).into());
        }

        if table.indexes.contains_key(&self.index) {
            return Err(SchemaError::IndexExists(self.index.clone()).into());
        }

        self.validate_columns(&table)?;

        if let Some(parent) = &self.interleave_in {
            self.validate_parent(snapshot, &table, parent).await?;
        }
        Ok(())
    }
}

/// Drops a secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIndex {
    pub table: String,
    pub index: String,
}

impl DropIndex {
    pub fn new(table: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: index.into(),
        }
    }
}

#[async_trait]
impl Update for DropIndex {
    fn ddl(&self) -> String {
        format!("DROP INDEX {}", self.index)
    }

    async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        let table = existing_table(snapshot, &self.table).await?;

        if !table.indexes.contains_key(&self.index) {
            return Err(SchemaError::IndexMissing(self.index.clone()).into());
        }
        if self.index == Index::PRIMARY_INDEX {
            return Err(SchemaError::PrimaryIndex(self.index.clone()).into());
        }
        Ok(())
    }
}

/// One schema change, as produced by a migration's upgrade or downgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaUpdate {
    CreateTable(CreateTable),
    DropTable(DropTable),
    AddColumn(AddColumn),
    DropColumn(DropColumn),
    AlterColumn(AlterColumn),
    CreateIndex(CreateIndex),
    DropIndex(DropIndex),
    /// Migration that touches no schema
    NoOp,
}

impl SchemaUpdate {
    pub fn create_table(model: Model) -> Self {
        SchemaUpdate::CreateTable(CreateTable::new(model))
    }

    pub fn drop_table(table: impl Into<String>) -> Self {
        SchemaUpdate::DropTable(DropTable::new(table))
    }

    pub fn add_column(table: impl Into<String>, column: impl Into<String>, field: Field) -> Self {
        SchemaUpdate::AddColumn(AddColumn::new(table, column, field))
    }

    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        SchemaUpdate::DropColumn(DropColumn::new(table, column))
    }

    pub fn alter_column(
        table: impl Into<String>,
        column: impl Into<String>,
        field: Field,
    ) -> Self {
        SchemaUpdate::AlterColumn(AlterColumn::new(table, column, field))
    }

    pub fn drop_index(table: impl Into<String>, index: impl Into<String>) -> Self {
        SchemaUpdate::DropIndex(DropIndex::new(table, index))
    }

    fn as_update(&self) -> Option<&dyn Update> {
        match self {
            SchemaUpdate::CreateTable(update) => Some(update),
            SchemaUpdate::DropTable(update) => Some(update),
            SchemaUpdate::AddColumn(update) => Some(update),
            SchemaUpdate::DropColumn(update) => Some(update),
            SchemaUpdate::AlterColumn(update) => Some(update),
            SchemaUpdate::CreateIndex(update) => Some(update),
            SchemaUpdate::DropIndex(update) => Some(update),
            SchemaUpdate::NoOp => None,
        }
    }

    /// The DDL statement, empty for `NoOp`
    pub fn ddl(&self) -> String {
        self.as_update().map(|update| update.ddl()).unwrap_or_default()
    }

    pub async fn validate(&self, snapshot: &dyn SchemaSnapshot) -> OrmResult<()> {
        match self.as_update() {
            Some(update) => update.validate(snapshot).await,
            None => Ok(()),
        }
    }

    /// Validate, then issue the DDL. Nothing is sent if validation fails.
    pub async fn execute(
        &self,
        admin: &dyn SchemaAdmin,
        snapshot: &dyn SchemaSnapshot,
    ) -> OrmResult<()> {
        let Some(update) = self.as_update() else {
            return Ok(());
        };

        update.validate(snapshot).await?;
        let ddl = update.ddl();
        tracing::info!("Updating schema: {}", ddl);
        admin.update_schema(&ddl).await
    }
}

/// DDL creating a model's table followed by its secondary indexes
pub fn model_creation_ddl(model: &Model) -> Vec<String> {
    let mut statements = vec![CreateTable::new(model.clone()).ddl()];
    statements.extend(
        model
            .indexes
            .iter()
            .filter(|index| !index.is_primary())
            .map(|index| CreateIndex::from_index(model.table.clone(), index).ddl()),
    );
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::EmulatorDatabase;
    use crate::error::OrmError;
    use crate::field::FieldType;

    fn small_model() -> Model {
        Model::builder("SmallTestModel")
            .key("key", FieldType::STRING)
            .column("value_1", FieldType::STRING, false)
            .column("value_2", FieldType::STRING, true)
            .build()
    }

    fn child_model() -> Model {
        Model::builder("ChildTestModel")
            .key("key", FieldType::STRING)
            .key("child_key", FieldType::STRING)
            .column("value", FieldType::Integer, true)
            .interleave_in(&small_model())
            .build()
    }

    async fn database_with(updates: Vec<SchemaUpdate>) -> EmulatorDatabase {
        let db = EmulatorDatabase::new();
        db.create_database().await.unwrap();
        for update in updates {
            update.execute(&db, &db).await.unwrap();
        }
        db
    }

    fn schema_error(result: OrmResult<()>) -> SchemaError {
        match result {
            Err(OrmError::Validation(error)) => error,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_table_ddl() {
        let update = CreateTable::new(small_model());
        assert_eq!(
            update.ddl(),
            "CREATE TABLE SmallTestModel (key STRING(MAX) NOT NULL, \
             value_1 STRING(MAX) NOT NULL, value_2 STRING(MAX)) PRIMARY KEY (key)"
        );
    }

    #[test]
    fn test_create_interleaved_table_ddl() {
        let update = CreateTable::new(child_model());
        assert!(update
            .ddl()
            .ends_with("PRIMARY KEY (key, child_key), INTERLEAVE IN PARENT SmallTestModel ON DELETE CASCADE"));
    }

    #[test]
    fn test_create_index_ddl() {
        let update = CreateIndex::new("ChildTestModel", "value_idx", ["value"])
            .storing(["child_key"])
            .interleave_in("SmallTestModel")
            .null_filtered(true);
        assert_eq!(
            update.ddl(),
            "CREATE NULL_FILTERED INDEX value_idx ON ChildTestModel (value) \
             STORING (child_key), INTERLEAVE IN SmallTestModel"
        );

        let update = CreateIndex::new("SmallTestModel", "unique_idx", ["value_1", "value_2"]).unique(true);
        assert_eq!(
            update.ddl(),
            "CREATE UNIQUE INDEX unique_idx ON SmallTestModel (value_1, value_2)"
        );
    }

    #[test]
    fn test_column_ddl() {
        let field = Field::new("ignored", FieldType::STRING).nullable(true);
        assert_eq!(
            SchemaUpdate::add_column("foo", "bar", field).ddl(),
            "ALTER TABLE foo ADD COLUMN bar STRING(MAX)"
        );
        assert_eq!(
            SchemaUpdate::drop_column("foo", "bar").ddl(),
            "ALTER TABLE foo DROP COLUMN bar"
        );
        assert_eq!(
            SchemaUpdate::alter_column("foo", "bar", Field::new("bar", FieldType::Integer)).ddl(),
            "ALTER TABLE foo ALTER COLUMN bar INT64 NOT NULL"
        );
        assert_eq!(SchemaUpdate::drop_index("foo", "idx").ddl(), "DROP INDEX idx");
        assert_eq!(SchemaUpdate::drop_table("foo").ddl(), "DROP TABLE foo");
        assert_eq!(SchemaUpdate::NoOp.ddl(), "");
    }

    #[test]
    fn test_model_creation_ddl_includes_secondary_indexes() {
        let model = Model::builder("Users")
            .key("id", FieldType::STRING)
            .column("email", FieldType::STRING, false)
            .index(Index::new("email_idx", ["email"]).unique(true))
            .build();

        let statements = model_creation_ddl(&model);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE Users"));
        assert_eq!(statements[1], "CREATE UNIQUE INDEX email_idx ON Users (email)");
    }

    #[tokio::test]
    async fn test_create_table_round_trip() {
        let model = Model::builder("Pairs")
            .key("a", FieldType::STRING)
            .key("b", FieldType::Integer)
            .column("c", FieldType::Timestamp, true)
            .build();
        let db = database_with(vec![SchemaUpdate::create_table(model)]).await;

        let table = db.get_table("Pairs").await.unwrap().unwrap();
        assert_eq!(table.primary_keys, vec!["a", "b"]);
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert!(table.field("c").unwrap().nullable);
        assert!(table.field("a").unwrap().primary_key);
        assert_eq!(table.indexes[Index::PRIMARY_INDEX].columns, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_create_table_errors() {
        let db = database_with(vec![SchemaUpdate::create_table(small_model())]).await;

        let existing = SchemaUpdate::create_table(small_model());
        assert_eq!(
            schema_error(existing.validate(&db).await),
            SchemaError::TableExists("SmallTestModel".to_string())
        );

        let unnamed = SchemaUpdate::create_table(Model::builder("").key("id", FieldType::STRING).build());
        assert_eq!(schema_error(unnamed.validate(&db).await), SchemaError::EmptyTableName);

        let keyless = SchemaUpdate::create_table(
            Model::builder("Keyless").column("value", FieldType::STRING, true).build(),
        );
        assert_eq!(
            schema_error(keyless.validate(&db).await),
            SchemaError::NoPrimaryKey("Keyless".to_string())
        );

        let missing_key = SchemaUpdate::create_table(
            Model::builder("MissingKey")
                .column("value", FieldType::STRING, true)
                .primary_keys(["id"])
                .build(),
        );
        assert!(matches!(
            schema_error(missing_key.validate(&db).await),
            SchemaError::PrimaryKeyNotInSchema { .. }
        ));
    }

    #[tokio::test]
    async fn test_create_interleaved_table_requires_key_prefix() {
        let db = database_with(vec![SchemaUpdate::create_table(small_model())]).await;

        SchemaUpdate::create_table(child_model())
            .validate(&db)
            .await
            .unwrap();

        let wrong_prefix = Model::builder("Orphan")
            .key("other", FieldType::STRING)
            .key("key", FieldType::STRING)
            .interleave_in(&small_model())
            .build();
        assert!(matches!(
            schema_error(SchemaUpdate::create_table(wrong_prefix).validate(&db).await),
            SchemaError::NotChildOfParent { .. }
        ));

        let two_keys = Model::builder("Parent")
            .key("a", FieldType::STRING)
            .key("b", FieldType::STRING)
            .build();
        let too_short = Model::builder("Child")
            .key("a", FieldType::STRING)
            .interleave_in(&two_keys)
            .build();
        assert!(matches!(
            schema_error(SchemaUpdate::create_table(too_short).validate(&db).await),
            SchemaError::NotChildOfParent { .. }
        ));
    }

    #[tokio::test]
    async fn test_drop_table_errors() {
        let db = database_with(vec![
            SchemaUpdate::create_table(small_model()),
            SchemaUpdate::create_table(child_model()),
        ])
        .await;

        assert_eq!(
            schema_error(SchemaUpdate::drop_table("Missing").validate(&db).await),
            SchemaError::TableMissing("Missing".to_string())
        );
        assert_eq!(
            schema_error(SchemaUpdate::drop_table("SmallTestModel").validate(&db).await),
            SchemaError::HasInterleavedTable {
                table: "SmallTestModel".to_string(),
                child: "ChildTestModel".to_string(),
            }
        );

        SchemaUpdate::drop_table("ChildTestModel")
            .validate(&db)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drop_table_with_indexes() {
        let db = database_with(vec![
            SchemaUpdate::create_table(small_model()),
            SchemaUpdate::create_table(child_model()),
            SchemaUpdate::CreateIndex(CreateIndex::new("SmallTestModel", "value_idx", ["value_1"])),
        ])
        .await;

        assert_eq!(
            schema_error(SchemaUpdate::drop_table("SmallTestModel").validate(&db).await),
            SchemaError::HasSecondaryIndex("SmallTestModel".to_string())
        );

        let grandchild = Model::builder("AGrandchild")
            .key("key", FieldType::STRING)
            .key("child_key", FieldType::STRING)
            .key("grandchild_key", FieldType::STRING)
            .interleave_in(&child_model())
            .build();
        let db = database_with(vec![
            SchemaUpdate::create_table(small_model()),
            SchemaUpdate::create_table(child_model()),
            SchemaUpdate::create_table(grandchild),
            SchemaUpdate::CreateIndex(
                CreateIndex::new("AGrandchild", "by_key", ["key", "grandchild_key"])
                    .interleave_in("SmallTestModel"),
            ),
        ])
        .await;
        assert_eq!(
            schema_error(SchemaUpdate::drop_table("SmallTestModel").validate(&db).await),
            SchemaError::HasInterleavedIndex {
                table: "SmallTestModel".to_string(),
                index: "by_key".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_add_column() {
        let db = database_with(vec![SchemaUpdate::create_table(small_model())]).await;

        let nullable = Field::new("", FieldType::STRING).nullable(true);
        let update = SchemaUpdate::add_column("SmallTestModel", "extra", nullable.clone());
        update.execute(&db, &db).await.unwrap();
        let table = db.get_table("SmallTestModel").await.unwrap().unwrap();
        assert!(table.field("extra").unwrap().nullable);

        assert_eq!(
            schema_error(
                SchemaUpdate::add_column("Missing", "extra", nullable.clone())
                    .validate(&db)
                    .await
            ),
            SchemaError::TableMissing("Missing".to_string())
        );
        assert_eq!(
            schema_error(
                SchemaUpdate::add_column("SmallTestModel", "strict", Field::new("", FieldType::STRING))
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnNotNullable("strict".to_string())
        );
        assert!(matches!(
            schema_error(
                SchemaUpdate::add_column("SmallTestModel", "pk", nullable.clone().primary_key(true))
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnIsPrimaryKey { .. }
        ));
        assert!(matches!(
            schema_error(
                SchemaUpdate::add_column("SmallTestModel", "extra", nullable)
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnExists { .. }
        ));
    }

    #[tokio::test]
    async fn test_drop_column() {
        let db = database_with(vec![
            SchemaUpdate::create_table(small_model()),
            SchemaUpdate::CreateIndex(CreateIndex::new("SmallTestModel", "value_idx", ["value_1"])),
        ])
        .await;

        assert_eq!(
            schema_error(SchemaUpdate::drop_column("SmallTestModel", "value_1").validate(&db).await),
            SchemaError::ColumnIndexed("value_1".to_string())
        );
        assert_eq!(
            schema_error(SchemaUpdate::drop_column("SmallTestModel", "key").validate(&db).await),
            SchemaError::ColumnIndexed("key".to_string())
        );
        assert!(matches!(
            schema_error(SchemaUpdate::drop_column("SmallTestModel", "nope").validate(&db).await),
            SchemaError::ColumnMissing { .. }
        ));
        assert_eq!(
            schema_error(SchemaUpdate::drop_column("Missing", "value_1").validate(&db).await),
            SchemaError::TableMissing("Missing".to_string())
        );

        SchemaUpdate::drop_column("SmallTestModel", "value_2")
            .execute(&db, &db)
            .await
            .unwrap();
        let table = db.get_table("SmallTestModel").await.unwrap().unwrap();
        assert!(!table.has_column("value_2"));
    }

    #[tokio::test]
    async fn test_alter_column() {
        let db = database_with(vec![SchemaUpdate::create_table(small_model())]).await;

        let relaxed = Field::new("", FieldType::STRING).nullable(true);
        assert_eq!(
            schema_error(
                SchemaUpdate::alter_column("SmallTestModel", "value_2", relaxed.clone())
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnUnchanged("value_2".to_string())
        );
        assert_eq!(
            schema_error(
                SchemaUpdate::alter_column("SmallTestModel", "value_1", Field::new("", FieldType::Integer).nullable(true))
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnTypeChanged("value_1".to_string())
        );
        assert!(matches!(
            schema_error(
                SchemaUpdate::alter_column("SmallTestModel", "key", relaxed.clone())
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnIsPrimaryKey { .. }
        ));
        assert_eq!(
            schema_error(
                SchemaUpdate::alter_column("SmallTestModel", "nope", relaxed.clone())
                    .validate(&db)
                    .await
            ),
            SchemaError::ColumnMissing {
                table: "SmallTestModel".to_string(),
                column: "nope".to_string(),
            }
        );
        assert_eq!(
            schema_error(
                SchemaUpdate::alter_column("Missing", "value_1", relaxed.clone())
                    .validate(&db)
                    .await
            ),
            SchemaError::TableMissing("Missing".to_string())
        );

        SchemaUpdate::alter_column("SmallTestModel", "value_1", relaxed)
            .execute(&db, &db)
            .await
            .unwrap();
        let table = db.get_table("SmallTestModel").await.unwrap().unwrap();
        assert!(table.field("value_1").unwrap().nullable);
    }

    #[tokio::test]
    async fn test_create_index_errors() {
        let db = database_with(vec![
            SchemaUpdate::create_table(small_model()),
            SchemaUpdate::create_table(child_model()),
        ])
        .await;

        let no_columns = SchemaUpdate::CreateIndex(CreateIndex::new("SmallTestModel", "empty", Vec::<String>::new()));
        assert_eq!(
            schema_error(no_columns.validate(&db).await),
            SchemaError::IndexWithoutColumns("empty".to_string())
        );

        let primary = SchemaUpdate::CreateIndex(CreateIndex::new("SmallTestModel", Index::PRIMARY_INDEX, ["key"]));
        assert_eq!(
            schema_error(primary.validate(&db).await),
            SchemaError::IndexExists(Index::PRIMARY_INDEX.to_string())
        );

        let unknown_column = SchemaUpdate::CreateIndex(CreateIndex::new("SmallTestModel", "idx", ["nope"]));
        assert!(matches!(
            schema_error(unknown_column.validate(&db).await),
            SchemaError::ColumnMissing { .. }
        ));

        let unknown_storing = SchemaUpdate::CreateIndex(
            CreateIndex::new("SmallTestModel", "idx", ["value_1"]).storing(["nope"]),
        );
        assert_eq!(
            schema_error(unknown_storing.validate(&db).await),
            SchemaError::ColumnMissing {
                table: "SmallTestModel".to_string(),
                column: "nope".to_string(),
            }
        );

        let missing_table =
            SchemaUpdate::CreateIndex(CreateIndex::new("Missing", "idx", ["value_1"]));
        assert_eq!(
            schema_error(missing_table.validate(&db).await),
            SchemaError::TableMissing("Missing".to_string())
        );

        let storing_key = SchemaUpdate::CreateIndex(
            CreateIndex::new("SmallTestModel", "idx", ["value_1"]).storing(["key"]),
        );
        assert!(matches!(
            schema_error(storing_key.validate(&db).await),
            SchemaError::StoringPrimaryKey { .. }
        ));

        let bad_parent = SchemaUpdate::CreateIndex(
            CreateIndex::new("SmallTestModel", "idx", ["value_1"]).interleave_in("ChildTestModel"),
        );
        assert!(matches!(
            schema_error(bad_parent.validate(&db).await),
            SchemaError::NotAParent { .. }
        ));

        let interleaved = SchemaUpdate::CreateIndex(
            CreateIndex::new("ChildTestModel", "idx", ["key", "value"]).interleave_in("SmallTestModel"),
        );
        interleaved.execute(&db, &db).await.unwrap();
        let table = db.get_table("ChildTestModel").await.unwrap().unwrap();
        assert_eq!(table.indexes["idx"].parent.as_deref(), Some("SmallTestModel"));
    }

    #[tokio::test]
    async fn test_drop_index() {
        let db = database_with(vec![
            SchemaUpdate::create_table(small_model()),
            SchemaUpdate::CreateIndex(CreateIndex::new("SmallTestModel", "value_idx", ["value_1"])),
        ])
        .await;

        assert_eq!(
            schema_error(SchemaUpdate::drop_index("SmallTestModel", Index::PRIMARY_INDEX).validate(&db).await),
            SchemaError::PrimaryIndex(Index::PRIMARY_INDEX.to_string())
        );
        assert_eq!(
            schema_error(SchemaUpdate::drop_index("SmallTestModel", "nope").validate(&db).await),
            SchemaError::IndexMissing("nope".to_string())
        );
        assert_eq!(
            schema_error(SchemaUpdate::drop_index("Missing", "value_idx").validate(&db).await),
            SchemaError::TableMissing("Missing".to_string())
        );

        SchemaUpdate::drop_index("SmallTestModel", "value_idx")
            .execute(&db, &db)
            .await
            .unwrap();
        let table = db.get_table("SmallTestModel").await.unwrap().unwrap();
        assert_eq!(table.indexes.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_validation_issues_no_ddl() {
        let db = database_with(vec![SchemaUpdate::create_table(small_model())]).await;
        let before = db.applied_ddl().await.len();

        let result = SchemaUpdate::create_table(small_model()).execute(&db, &db).await;
        assert!(result.is_err());
        assert_eq!(db.applied_ddl().await.len(), before);
    }

    #[tokio::test]
    async fn test_noop_is_always_valid() {
        let db = EmulatorDatabase::new();
        SchemaUpdate::NoOp.validate(&db).await.unwrap();
        SchemaUpdate::NoOp.execute(&db, &db).await.unwrap();
        assert!(db.applied_ddl().await.is_empty());
    }

    #[test]
    fn test_schema_update_from_toml() {
        let update: SchemaUpdate = toml::from_str(
            r#"
kind = "add_column"
table = "Users"
column = "nickname"
field = { type = "string", length = 64, nullable = true }
"#,
        )
        .unwrap();
        assert_eq!(update.ddl(), "ALTER TABLE Users ADD COLUMN nickname STRING(64)");

        let update: SchemaUpdate = toml::from_str("kind = \"no_op\"").unwrap();
        assert_eq!(update, SchemaUpdate::NoOp);
    }
}
