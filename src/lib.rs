pub mod auth;
pub mod categories;
pub mod config;
pub mod constants;
pub mod content;
pub mod database;
pub mod error;
pub mod goal_progress;
pub mod goals;
pub mod models;
pub mod neighbor_profile;
pub mod neighbors;
pub mod profiles;
pub mod reconcile;
pub mod routes;
pub mod scraps;
pub mod stats;
pub mod transaction;
pub mod transactions;
pub mod utils;

// Re-export types at crate root for convenient importing
pub use crate::database::Db;
pub use crate::error::DomainError;
pub use crate::transaction::{TransactionError, with_transaction};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// The single application database
    pub main_db: Db,
}
