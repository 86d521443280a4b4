//! In-memory adapters.
//!
//! Thread-safe map-backed implementations of the persistence ports. Used by
//! the test suites and anywhere a database is not available; the conditional
//! write semantics match the Postgres adapter exactly.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{should_expire, Transaction, TransactionStatus};
use crate::ports::{
    MerchantConfig, MerchantConfigProvider, RepositoryError, RepositoryResult,
    TransactionRepository,
};

/// A thread-safe in-memory transaction store.
///
/// The write lock makes `mark_terminal` a single atomic check-and-set, which
/// is the same guarantee the Postgres adapter gets from its conditional
/// `UPDATE ... WHERE status = 'pending'`.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Err(RepositoryError::DuplicateId(tx.id.clone()));
        }
        transactions.insert(tx.id.clone(), tx.clone());
        Ok(tx.clone())
    }

    async fn get(&self, id: &str) -> RepositoryResult<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(id).cloned())
    }

    async fn mark_terminal(
        &self,
        id: &str,
        status: TransactionStatus,
        provider_reference: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Transaction>> {
        let mut transactions = self.transactions.write().await;
        let Some(tx) = transactions.get_mut(id) else {
            return Ok(None);
        };
        if tx.status != TransactionStatus::Pending {
            return Ok(None);
        }

        tx.status = status;
        tx.completed_at = Some(completed_at);
        tx.updated_at = completed_at;
        if let Some(reference) = provider_reference {
            tx.provider_reference = Some(reference.to_string());
        }
        Ok(Some(tx.clone()))
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Transaction>> {
        let mut transactions = self.transactions.write().await;
        let mut expired = Vec::new();
        for tx in transactions.values_mut() {
            if should_expire(tx, now) {
                tx.status = TransactionStatus::Expired;
                tx.completed_at = Some(now);
                tx.updated_at = now;
                expired.push(tx.clone());
            }
        }
        Ok(expired)
    }
}

/// In-memory merchant configuration. The current snapshot sits behind an
/// `ArcSwap` since reads vastly outnumber the rare administrative rotation;
/// prior secrets are retained per version.
pub struct InMemoryMerchantConfig {
    current: ArcSwap<MerchantConfig>,
    history: RwLock<HashMap<i32, String>>,
}

impl InMemoryMerchantConfig {
    pub fn new(receive_address: &str, signing_secret: &str) -> Self {
        let config = MerchantConfig {
            receive_address: receive_address.to_string(),
            signing_secret: signing_secret.to_string(),
            secret_version: 1,
        };
        let mut history = HashMap::new();
        history.insert(1, signing_secret.to_string());
        Self {
            current: ArcSwap::from_pointee(config),
            history: RwLock::new(history),
        }
    }

    /// Administrative update: replaces the receive address and/or secret and
    /// bumps the version. The previous secret stays resolvable by version.
    pub async fn rotate(&self, receive_address: &str, signing_secret: &str) {
        let previous = self.current.load();
        let next = MerchantConfig {
            receive_address: receive_address.to_string(),
            signing_secret: signing_secret.to_string(),
            secret_version: previous.secret_version + 1,
        };
        self.history
            .write()
            .await
            .insert(next.secret_version, signing_secret.to_string());
        self.current.store(Arc::new(next));
    }
}

#[async_trait]
impl MerchantConfigProvider for InMemoryMerchantConfig {
    async fn current(&self) -> RepositoryResult<MerchantConfig> {
        Ok(self.current.load().as_ref().clone())
    }

    async fn secret_for_version(&self, version: i32) -> RepositoryResult<Option<String>> {
        Ok(self.history.read().await.get(&version).cloned())
    }
}
