//! Braintree payment processor client.
//!
//! Talks to the Braintree GraphQL API: client tokens for the browser drop-in,
//! charging a payment method nonce, and reversing a transaction when an order
//! cannot be stored after the charge went through.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BraintreeConfig;

/// Braintree GraphQL API version.
const API_VERSION: &str = "2019-01-01";

const CREATE_CLIENT_TOKEN: &str = r"
mutation CreateClientToken {
  createClientToken {
    clientToken
  }
}";

const CHARGE_PAYMENT_METHOD: &str = r"
mutation ChargePaymentMethod($input: ChargePaymentMethodInput!) {
  chargePaymentMethod(input: $input) {
    transaction {
      id
      status
      amount { value }
    }
  }
}";

const REVERSE_TRANSACTION: &str = r"
mutation ReverseTransaction($input: ReverseTransactionInput!) {
  reverseTransaction(input: $input) {
    reversal {
      ... on Transaction { id status }
      ... on Refund { id status }
    }
  }
}";

/// Errors that can occur when interacting with Braintree.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The processor refused the operation (declined card, invalid nonce, ...).
    #[error("{0}")]
    Rejected(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A charged transaction as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub status: String,
    pub amount: String,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenData {
    create_client_token: ClientTokenPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenPayload {
    client_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChargeData {
    charge_payment_method: ChargePayload,
}

#[derive(Deserialize)]
struct ChargePayload {
    transaction: TransactionNode,
}

#[derive(Deserialize)]
struct TransactionNode {
    id: String,
    status: String,
    amount: Money,
}

#[derive(Deserialize)]
struct Money {
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseData {
    reverse_transaction: ReversePayload,
}

#[derive(Deserialize)]
struct ReversePayload {
    reversal: ReversalNode,
}

#[derive(Deserialize)]
struct ReversalNode {
    id: String,
    status: String,
}

/// Braintree GraphQL client.
#[derive(Clone)]
pub struct BraintreeClient {
    client: reqwest::Client,
    endpoint: &'static str,
    merchant_id: String,
    public_key: String,
    private_key: SecretString,
}

impl std::fmt::Debug for BraintreeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraintreeClient")
            .field("endpoint", &self.endpoint)
            .field("merchant_id", &self.merchant_id)
            .finish_non_exhaustive()
    }
}

impl BraintreeClient {
    /// Create a new Braintree client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BraintreeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        headers.insert("Braintree-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.environment.endpoint(),
            merchant_id: config.merchant_id.clone(),
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
        })
    }

    /// Merchant this client charges on behalf of.
    #[must_use]
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// Generate a client token for the browser payment form.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn client_token(&self) -> Result<String, PaymentError> {
        let data: ClientTokenData = self
            .execute(CREATE_CLIENT_TOKEN, serde_json::json!({}))
            .await?;
        Ok(data.create_client_token.client_token)
    }

    /// Charge a payment method nonce.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Rejected` if the processor declines the charge.
    pub async fn charge(&self, nonce: &str, amount: Decimal) -> Result<Transaction, PaymentError> {
        let variables = serde_json::json!({
            "input": {
                "paymentMethodId": nonce,
                "transaction": { "amount": format_amount(amount) }
            }
        });

        let data: ChargeData = self.execute(CHARGE_PAYMENT_METHOD, variables).await?;
        let node = data.charge_payment_method.transaction;

        tracing::info!(
            transaction_id = %node.id,
            status = %node.status,
            merchant_id = %self.merchant_id,
            "Payment charged"
        );

        Ok(Transaction {
            id: node.id,
            status: node.status,
            amount: node.amount.value,
        })
    }

    /// Void or refund a transaction, whichever its settlement state allows.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the processor refuses.
    pub async fn reverse_transaction(&self, transaction_id: &str) -> Result<(), PaymentError> {
        let variables = serde_json::json!({
            "input": { "transactionId": transaction_id }
        });

        let data: ReverseData = self.execute(REVERSE_TRANSACTION, variables).await?;
        let reversal = data.reverse_transaction.reversal;

        tracing::info!(
            transaction_id,
            reversal_id = %reversal.id,
            status = %reversal.status,
            "Payment reversed"
        );
        Ok(())
    }

    /// Run a GraphQL operation and unwrap its `data`.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, PaymentError> {
        let body = serde_json::json!({ "query": query, "variables": variables });

        let response = self
            .client
            .post(self.endpoint)
            .basic_auth(&self.public_key, Some(self.private_key.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        unwrap_graphql(payload)
    }
}

fn unwrap_graphql<T>(payload: GraphqlResponse<T>) -> Result<T, PaymentError> {
    if !payload.errors.is_empty() {
        let message = payload
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PaymentError::Rejected(message));
    }
    payload
        .data
        .ok_or_else(|| PaymentError::Parse("response has no data".to_string()))
}

/// Amount in the decimal string form the processor expects.
fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}
