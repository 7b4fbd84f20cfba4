//! Model descriptors
//!
//! A `Model` is the static description of a table: its ordered fields, its
//! primary key, the table it is interleaved in and its secondary indexes.
//! Models are assembled with [`ModelBuilder`] at load time or deserialized from
//! migration definition files; nothing about them is discovered reflectively.

use serde::{Deserialize, Serialize};

use crate::field::{Field, FieldType};
use crate::index::Index;

/// Parent table a model is interleaved in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentTable {
    pub table: String,
    pub primary_keys: Vec<String>,
}

/// Static table descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub table: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub interleave_in: Option<ParentTable>,
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Model {
    pub fn builder(table: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(table)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Reference to this model usable as an interleave parent
    pub fn as_parent(&self) -> ParentTable {
        ParentTable {
            table: self.table.clone(),
            primary_keys: self.primary_keys.clone(),
        }
    }
}

/// Builder for [`Model`]
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            model: Model {
                table: table.into(),
                fields: Vec::new(),
                primary_keys: Vec::new(),
                interleave_in: None,
                indexes: Vec::new(),
            },
        }
    }

    /// Add a column. A field flagged as primary key is appended to the key.
    pub fn field(mut self, field: Field) -> Self {
        if field.primary_key && !self.model.primary_keys.contains(&field.name) {
            self.model.primary_keys.push(field.name.clone());
        }
        self.model.fields.push(field);
        self
    }

    /// Add a non-nullable primary key column
    pub fn key(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(Field::new(name, field_type).primary_key(true))
    }

    /// Add a regular column
    pub fn column(self, name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        self.field(Field::new(name, field_type).nullable(nullable))
    }

    /// Override the primary key column list
    pub fn primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn interleave_in(mut self, parent: &Model) -> Self {
        self.model.interleave_in = Some(parent.as_parent());
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.model.indexes.push(index);
        self
    }

    pub fn build(self) -> Model {
        self.model
    }
}
