//! Request/response bodies for the payment endpoints.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Provider, Transaction, TransactionStatus};
use crate::services::ResolveOutcome;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: BigDecimal,
    pub provider: String,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub device_hint: Option<String>,
}

/// Everything the client needs to launch the payment app and to later prove
/// what it was asked to pay.
#[derive(Debug, Serialize)]
pub struct PaymentBundleResponse {
    pub id: String,
    pub redirect_url: String,
    pub alternate_url: String,
    pub payload: String,
    pub signature: String,
    pub expires_at: DateTime<Utc>,
    pub amount: BigDecimal,
    pub provider: Provider,
}

impl From<Transaction> for PaymentBundleResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            redirect_url: tx.redirect_url,
            alternate_url: tx.alternate_url,
            payload: tx.payload,
            signature: tx.signature,
            expires_at: tx.expires_at,
            amount: tx.amount,
            provider: tx.provider,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub id: String,
    pub status: TransactionStatus,
    pub amount: BigDecimal,
    pub provider: Provider,
    pub receive_address: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Transaction> for PaymentStatusResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            status: tx.status,
            amount: tx.amount,
            provider: tx.provider,
            receive_address: tx.receive_address,
            created_at: tx.created_at,
            completed_at: tx.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub status: String,
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub id: String,
    pub status: String,
    pub amount: Option<BigDecimal>,
    pub provider_reference: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub id: String,
    pub status: TransactionStatus,
    pub amount: BigDecimal,
    pub resolution: &'static str,
}

impl From<ResolveOutcome> for ResolveResponse {
    fn from(outcome: ResolveOutcome) -> Self {
        let resolution = match &outcome {
            ResolveOutcome::Applied(_) => "applied",
            ResolveOutcome::AlreadyResolved(_) => "already_resolved",
        };
        let tx = outcome.transaction();
        Self {
            id: tx.id.clone(),
            status: tx.status,
            amount: tx.amount.clone(),
            resolution,
        }
    }
}
