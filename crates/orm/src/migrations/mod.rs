//! Migration System
//!
//! Migrations are ordered through their previous-migration links, applied by
//! the `MigrationExecutor` and tracked in a status table in the database.

pub mod chain;
pub mod definitions;
pub mod executor;
pub mod manager;
pub mod rollback;
pub mod status;

pub use chain::build_chain;
pub use definitions::{
    Migration, MigrationConfig, MigrationDirection, MigrationRunResult, MigrationState,
    RollbackResult, UpdateFactory,
};
pub use executor::MigrationExecutor;
pub use manager::{MigrationManager, MigrationSource};
pub use status::{status_model, StatusRecord};
