//! Column descriptors
//!
//! A `Field` describes one column: its Spanner type, nullability and whether it
//! takes part in the primary key. Fields render the column part of DDL
//! statements and are compared by schema updates against the live schema.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spanner column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    String {
        #[serde(default)]
        length: Option<u32>,
    },
    Bytes {
        #[serde(default)]
        length: Option<u32>,
    },
    StringArray {
        #[serde(default)]
        length: Option<u32>,
    },
    Timestamp,
    Date,
}

impl FieldType {
    /// Unbounded string
    pub const STRING: FieldType = FieldType::String { length: None };

    /// Unbounded bytes
    pub const BYTES: FieldType = FieldType::Bytes { length: None };

    /// Array of unbounded strings
    pub const STRING_ARRAY: FieldType = FieldType::StringArray { length: None };

    /// DDL type name, e.g. `STRING(MAX)` or `ARRAY<STRING(24)>`
    pub fn ddl(&self) -> String {
        match self {
            FieldType::Boolean => "BOOL".to_string(),
            FieldType::Integer => "INT64".to_string(),
            FieldType::Float => "FLOAT64".to_string(),
            FieldType::String { length } => format!("STRING({})", length_ddl(*length)),
            FieldType::Bytes { length } => format!("BYTES({})", length_ddl(*length)),
            FieldType::StringArray { length } => {
                format!("ARRAY<STRING({})>", length_ddl(*length))
            }
            FieldType::Timestamp => "TIMESTAMP".to_string(),
            FieldType::Date => "DATE".to_string(),
        }
    }

    /// Whether two types are the same kind, ignoring declared lengths
    pub fn same_base_type(&self, other: &FieldType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

fn length_ddl(length: Option<u32>) -> String {
    match length {
        Some(length) => length.to_string(),
        None => "MAX".to_string(),
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ddl())
    }
}

/// A column in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name; schema updates that name the column separately ignore it
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub allow_commit_timestamp: bool,
}

impl Field {
    /// Non-nullable, non-key column
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            primary_key: false,
            allow_commit_timestamp: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Only meaningful for `TIMESTAMP` columns
    pub fn allow_commit_timestamp(mut self, allow: bool) -> Self {
        self.allow_commit_timestamp = allow;
        self
    }

    /// Column definition without the column name
    pub fn ddl(&self) -> String {
        let mut ddl = self.field_type.ddl();
        if !self.nullable {
            ddl.push_str(" NOT NULL");
        }
        if self.allow_commit_timestamp && self.field_type == FieldType::Timestamp {
            ddl.push_str(" OPTIONS (allow_commit_timestamp=true)");
        }
        ddl
    }
}
