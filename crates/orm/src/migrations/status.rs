//! Migration status table
//!
//! One row per migration ever executed against a database, recording whether
//! it is currently applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldType;
use crate::model::Model;

/// Row of the migration status table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub applied: bool,
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    /// Status stamped with the current time
    pub fn now(id: impl Into<String>, applied: bool) -> Self {
        Self {
            id: id.into(),
            applied,
            updated_at: Utc::now(),
        }
    }
}

/// Descriptor of the status table, created through the regular schema update
/// path the first time an executor touches a database
pub fn status_model(table: &str) -> Model {
    Model::builder(table)
        .key("id", FieldType::STRING)
        .column("applied", FieldType::Boolean, false)
        .column("updated_at", FieldType::Timestamp, false)
        .build()
}
