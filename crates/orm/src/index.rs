//! Index descriptors

use serde::{Deserialize, Serialize};

/// A primary or secondary index on a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    /// Table the index is interleaved in, if any
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub null_filtered: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub storing_columns: Vec<String>,
}

impl Index {
    /// Name Spanner gives the index backing a table's primary key
    pub const PRIMARY_INDEX: &'static str = "PRIMARY_KEY";

    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            parent: None,
            null_filtered: false,
            unique: false,
            storing_columns: Vec::new(),
        }
    }

    /// The synthetic index over a table's primary key columns
    pub fn primary<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Self::PRIMARY_INDEX, columns).unique(true)
    }

    pub fn interleave_in(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn null_filtered(mut self, null_filtered: bool) -> Self {
        self.null_filtered = null_filtered;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
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

    pub fn is_primary(&self) -> bool {
        self.name == Self::PRIMARY_INDEX
    }

    /// Whether the column is a key or storing column of this index
    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column) || self.storing_columns.iter().any(|c| c == column)
    }
}
