use crate::{
    api::{error::ApiError, response::with_total_count},
    state::AppState,
    validation::validate_sui_address,
};
use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

// GET /transactions endpoint query parameters
#[derive(Deserialize)]
pub struct TransactionsQuery {
    address: String,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/transactions", get(get_transactions))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// GET /transactions handler: one-shot history assembly for a wallet address
async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Response, ApiError> {
    validate_sui_address(&params.address)?;

    info!(
        "Fetching transaction history for address: {}",
        params.address
    );

    let transactions = state.processor.user_transactions(&params.address).await?;
    let total = transactions.len() as i64;

    Ok(with_total_count(transactions, total))
}
