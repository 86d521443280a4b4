//! Outward-facing seams of the payment core: transaction persistence,
//! merchant configuration, and order reconciliation. Adapters live in
//! `crate::adapters`; the service layer only ever sees these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Transaction, TransactionStatus};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("duplicate transaction id: {0}")]
    DuplicateId(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistent transaction store. Owns the state machine's write paths.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a new pending record. Fails with `DuplicateId` on an id
    /// collision; the service retries once with a fresh id.
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn get(&self, id: &str) -> RepositoryResult<Option<Transaction>>;

    /// The single guarded write path: atomically moves the record matching
    /// both `id` and `status = pending` into `status`, setting
    /// `completed_at` and optionally `provider_reference`. Returns `None`
    /// when no pending row matched, which is how a racing caller learns it
    /// lost.
    async fn mark_terminal(
        &self,
        id: &str,
        status: TransactionStatus,
        provider_reference: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Transaction>>;

    /// Housekeeping sweep: expires every pending record whose window has
    /// passed, returning the records that transitioned.
    async fn expire_stale(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Transaction>>;
}

/// Current merchant configuration snapshot. Read on every creation; the
/// receive address and secret are snapshotted onto the transaction so later
/// updates never touch in-flight records.
#[derive(Debug, Clone)]
pub struct MerchantConfig {
    pub receive_address: String,
    pub signing_secret: String,
    pub secret_version: i32,
}

/// Read access to the merchant configuration singleton. Mutation is an
/// external administrative operation, not part of this core.
#[async_trait]
pub trait MerchantConfigProvider: Send + Sync {
    /// Returns the current configuration, lazily seeding defaults if the
    /// singleton does not exist yet.
    async fn current(&self) -> RepositoryResult<MerchantConfig>;

    /// Looks up the signing secret that was active under `version`, so that
    /// rotating the secret never invalidates in-flight transactions.
    async fn secret_for_version(&self, version: i32) -> RepositoryResult<Option<String>>;
}

/// How a terminal transaction status lands on the associated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderOutcome {
    pub payment_status: &'static str,
    pub order_status: &'static str,
}

impl OrderOutcome {
    pub fn from_status(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Success => OrderOutcome {
                payment_status: "paid",
                order_status: "confirmed",
            },
            // Pending never reaches the reconciler; treat it like a failure
            // if it ever does.
            TransactionStatus::Failed
            | TransactionStatus::Expired
            | TransactionStatus::Pending => OrderOutcome {
                payment_status: "failed",
                order_status: "cancelled",
            },
        }
    }
}

/// One-directional push to the external order store, invoked on every
/// terminal transition. Fire-and-forget: implementations absorb and log
/// their own failures; the transaction's terminal state is durable
/// regardless.
#[async_trait]
pub trait OrderReconciler: Send + Sync {
    async fn on_transaction_resolved(&self, order_id: &str, final_status: TransactionStatus);
}
