//! Transaction domain entity.
//! Framework-agnostic representation of a signed payment request and its
//! lifecycle from `pending` to exactly one terminal status.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed payment window: a transaction is payable for 600 seconds after creation.
pub const PAYMENT_WINDOW_SECS: i64 = 600;

/// Supported deep-link dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Paytm,
    Gpay,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Paytm => "paytm",
            Provider::Gpay => "gpay",
        }
    }

    /// Parses a caller-supplied provider name. Unrecognized values are
    /// rejected at the service boundary with `UnsupportedProvider`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "paytm" => Some(Provider::Paytm),
            "gpay" => Some(Provider::Gpay),
            _ => None,
        }
    }
}

/// Lifecycle status. `Pending` is the only non-terminal state; no edge ever
/// leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TransactionStatus::Pending),
            "success" => Some(TransactionStatus::Success),
            "failed" => Some(TransactionStatus::Failed),
            "expired" => Some(TransactionStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Domain entity for a signed payment request.
///
/// `payload`, `signature`, the deep links, `receive_address` and `expires_at`
/// are written once at creation and never recomputed; merchant configuration
/// changes after creation must not alter an in-flight record.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub amount: BigDecimal,
    pub provider: Provider,
    pub receive_address: String,
    pub status: TransactionStatus,
    pub payload: String,
    pub signature: String,
    pub redirect_url: String,
    pub alternate_url: String,
    pub note: String,
    pub provider_reference: Option<String>,
    /// Merchant secret version that signed this record. `None` only for rows
    /// predating secret versioning; those verify against the current secret.
    pub secret_version: Option<i32>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        user_id: Option<String>,
        order_id: Option<String>,
        amount: BigDecimal,
        provider: Provider,
        receive_address: String,
        payload: String,
        signature: String,
        redirect_url: String,
        alternate_url: String,
        note: String,
        secret_version: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            order_id,
            amount,
            provider,
            receive_address,
            status: TransactionStatus::Pending,
            payload,
            signature,
            redirect_url,
            alternate_url,
            note,
            provider_reference: None,
            secret_version: Some(secret_version),
            expires_at: created_at + Duration::seconds(PAYMENT_WINDOW_SECS),
            completed_at: None,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Shared lazy-expiry rule: a record qualifies for the `Expired` transition
/// when it is still pending past its window. Both the status read path and
/// the resolve path apply this before anything else, so there is exactly one
/// expiry rule in the system.
pub fn should_expire(tx: &Transaction, now: DateTime<Utc>) -> bool {
    tx.status == TransactionStatus::Pending && now > tx.expires_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample(created_at: DateTime<Utc>) -> Transaction {
        Transaction::new(
            "TXN1".into(),
            None,
            None,
            BigDecimal::from_str("100.50").unwrap(),
            Provider::Paytm,
            "merchant@upi".into(),
            "cGF5bG9hZA==".into(),
            "deadbeef".into(),
            "intent://pay?x".into(),
            "upi://pay?x".into(),
            "P123".into(),
            1,
            created_at,
        )
    }

    #[test]
    fn new_transaction_is_pending_with_fixed_window() {
        let created = Utc::now();
        let tx = sample(created);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.expires_at, created + Duration::seconds(600));
        assert!(tx.completed_at.is_none());
        assert_eq!(tx.secret_version, Some(1));
    }

    #[test]
    fn should_expire_only_past_window_and_only_pending() {
        let created = Utc::now();
        let mut tx = sample(created);

        assert!(!should_expire(&tx, created));
        assert!(!should_expire(&tx, tx.expires_at));
        assert!(should_expire(&tx, tx.expires_at + Duration::seconds(1)));

        tx.status = TransactionStatus::Success;
        assert!(!should_expire(&tx, tx.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Success,
            TransactionStatus::Failed,
            TransactionStatus::Expired,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("refunded"), None);
    }

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!(Provider::parse("PayTM"), Some(Provider::Paytm));
        assert_eq!(Provider::parse("GPAY"), Some(Provider::Gpay));
        assert_eq!(Provider::parse("phonepe"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Expired.is_terminal());
    }
}
