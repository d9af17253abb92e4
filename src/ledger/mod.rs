pub mod client;
pub mod models;
pub mod processor;
pub mod resolver;

// Re-exports for convenience
pub use client::{ClientError, LedgerReader, SuiReadClient};
pub use processor::HistoryProcessor;
