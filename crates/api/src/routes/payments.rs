//! Braintree payment routes.
//!
//! The browser drop-in fetches a client token, tokenizes the card, and posts
//! the resulting nonce back here to be charged.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::check_money;

use crate::error::{AppError, Result};
use crate::middleware::RequireOwner;
use crate::services::payment::Transaction;
use crate::state::AppState;

use super::JsonBody;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenResponse {
    pub client_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_method_nonce: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub success: bool,
    pub transaction: Transaction,
}

/// POST /braintree/getToken/{user_id}
pub async fn client_token(
    State(state): State<AppState>,
    RequireOwner(_user): RequireOwner,
) -> Result<Json<ClientTokenResponse>> {
    let client_token = state.payments().client_token().await?;
    Ok(Json(ClientTokenResponse { client_token }))
}

/// POST /braintree/payment/{user_id}
pub async fn process_payment(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> Result<Json<PaymentResponse>> {
    if req.payment_method_nonce.trim().is_empty() {
        return Err(AppError::BadRequest("Payment method is required".to_string()));
    }
    if req.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }
    check_money(req.amount).map_err(|e| AppError::BadRequest(format!("Invalid amount: {e}")))?;

    let transaction = state
        .payments()
        .charge(&req.payment_method_nonce, req.amount)
        .await?;

    tracing::info!(user_id = %user.id, transaction_id = %transaction.id, "Payment processed");
    Ok(Json(PaymentResponse {
        success: true,
        transaction,
    }))
}
