pub mod api;
pub mod config;
pub mod history;
pub mod ledger;
pub mod models;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::create_router;
pub use history::{HistoryService, HistorySnapshot};
pub use ledger::client::{ClientError, LedgerReader, SuiReadClient};
pub use ledger::processor::HistoryProcessor;
pub use ledger::resolver::ResolvedName;
pub use models::UserTransaction;
pub use validation::validate_sui_address;
