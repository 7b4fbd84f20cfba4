//! Migration Chain - Orders independently authored migrations
//!
//! Every migration names the migration it follows. `build_chain` turns an
//! unordered set of migrations into the single linear order those links
//! describe, or explains why no such order exists.

use std::collections::HashMap;

use super::definitions::Migration;
use crate::error::{OrmError, OrmResult};

/// Returns the migrations in the order they have to be applied.
///
/// A migration whose previous id is absent or unknown starts the chain; there
/// must be exactly one. Each migration may have at most one successor, and every
/// migration must be reachable from the start.
pub fn build_chain(migrations: Vec<Migration>) -> OrmResult<Vec<Migration>> {
    if migrations.is_empty() {
        return Ok(Vec::new());
    }

    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(migrations.len());
    for (position, migration) in migrations.iter().enumerate() {
        if positions.insert(migration.id(), position).is_some() {
            return Err(OrmError::ChainIntegrity(format!(
                "duplicate migration id {}",
                migration.id()
            )));
        }
    }

    let mut successors: HashMap<&str, usize> = HashMap::with_capacity(migrations.len());
    let mut start: Option<usize> = None;
    for (position, migration) in migrations.iter().enumerate() {
        match migration.prev_id().filter(|prev| positions.contains_key(prev)) {
            Some(prev) => {
                if successors.insert(prev, position).is_some() {
                    return Err(OrmError::ChainIntegrity(format!(
                        "{} has unclear successor migration",
                        prev
                    )));
                }
            }
            None => {
                if start.is_some() {
                    return Err(OrmError::ChainIntegrity(
                        "Multiple migrations have no valid previous migration".to_string(),
                    ));
                }
                start = Some(position);
            }
        }
    }

    let start = start.ok_or_else(|| {
        OrmError::ChainIntegrity("No valid migration to start from".to_string())
    })?;

    let mut order = Vec::with_capacity(migrations.len());
    let mut current = Some(start);
    while let Some(position) = current {
        if order.len() == migrations.len() {
            break;
        }
        order.push(position);
        current = successors.get(migrations[position].id()).copied();
    }

    if order.len() != migrations.len() {
        let last = order[order.len() - 1];
        return Err(OrmError::ChainIntegrity(format!(
            "{} has no successor migration",
            migrations[last].id()
        )));
    }

    let mut slots: Vec<Option<Migration>> = migrations.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect())
}
