//! Payment lifecycle use cases.
//!
//! `PaymentService` is the only writer of transaction state. Creation signs
//! a provider deep-link payload under the current merchant secret; resolve
//! and the lazy expiry rule funnel every terminal transition through the
//! repository's conditional write, so at most one caller ever wins.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::domain::{
    build_payment_links, payment_note, should_expire, DeviceClass, Provider, Transaction,
    TransactionStatus,
};
use crate::domain::payload::LinkRequest;
use crate::error::PaymentError;
use crate::ports::{
    MerchantConfigProvider, OrderReconciler, RepositoryError, TransactionRepository,
};
use crate::signing;

/// Input for payment creation, already shaped by the HTTP layer.
#[derive(Debug)]
pub struct CreatePayment {
    pub amount: BigDecimal,
    pub provider: String,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub device_hint: Option<String>,
}

/// Result of a resolve call. `AlreadyResolved` is a benign outcome, not an
/// error: it carries the terminal state some earlier caller established.
#[derive(Debug)]
pub enum ResolveOutcome {
    Applied(Transaction),
    AlreadyResolved(Transaction),
}

impl ResolveOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            ResolveOutcome::Applied(tx) | ResolveOutcome::AlreadyResolved(tx) => tx,
        }
    }
}

pub struct PaymentService {
    repository: Arc<dyn TransactionRepository>,
    merchant: Arc<dyn MerchantConfigProvider>,
    reconciler: Arc<dyn OrderReconciler>,
}

impl PaymentService {
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        merchant: Arc<dyn MerchantConfigProvider>,
        reconciler: Arc<dyn OrderReconciler>,
    ) -> Self {
        Self {
            repository,
            merchant,
            reconciler,
        }
    }

    /// Creates a signed pending transaction and returns the full bundle.
    pub async fn create(&self, input: CreatePayment) -> Result<Transaction, PaymentError> {
        if input.amount <= BigDecimal::from(0) {
            return Err(PaymentError::InvalidAmount(input.amount.to_string()));
        }
        let provider = Provider::parse(&input.provider)
            .ok_or_else(|| PaymentError::UnsupportedProvider(input.provider.clone()))?;
        let device = DeviceClass::from_hint(input.device_hint.as_deref().unwrap_or(""));

        let merchant = self
            .merchant
            .current()
            .await
            .map_err(|e| PaymentError::ConfigurationUnavailable(e.to_string()))?;

        let note = fresh_note();

        // Id collisions are near-impossible but cheap to survive: one retry
        // with a fresh id, then surface DuplicateId.
        let mut attempts = 0;
        loop {
            attempts += 1;
            let id = new_transaction_id();
            let created_at = Utc::now();

            let tx = Transaction::new(
                id.clone(),
                input.user_id.clone(),
                input.order_id.clone(),
                input.amount.clone(),
                provider,
                merchant.receive_address.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                note.clone(),
                merchant.secret_version,
                created_at,
            );

            let links = build_payment_links(&LinkRequest {
                provider,
                device,
                receive_address: &merchant.receive_address,
                amount: &input.amount,
                note: &note,
                transaction_id: &id,
                expires_at: tx.expires_at,
            })?;
            let signature = signing::sign(&merchant.signing_secret, &links.payload)?;

            let tx = Transaction {
                payload: links.payload,
                signature,
                redirect_url: links.redirect_url,
                alternate_url: links.alternate_url,
                ..tx
            };

            match self.repository.insert(&tx).await {
                Ok(stored) => {
                    tracing::info!(
                        id = %stored.id,
                        provider = provider.as_str(),
                        amount = %stored.amount,
                        "payment transaction created"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::DuplicateId(_)) if attempts < 2 => {
                    tracing::warn!("transaction id collision, retrying with a fresh id");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetches a transaction, applying the lazy expiry transition first if
    /// its window has passed.
    pub async fn get_status(&self, id: &str) -> Result<Transaction, PaymentError> {
        let tx = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))?;

        self.expire_if_due(tx).await
    }

    /// The single guarded write path used by verify, webhook and simulate.
    pub async fn resolve(
        &self,
        id: &str,
        reported_status: &str,
        signature: Option<&str>,
        provider_reference: Option<&str>,
    ) -> Result<ResolveOutcome, PaymentError> {
        let tx = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))?;

        // A bad signature never mutates state, not even the expiry check.
        if let Some(signature) = signature {
            let secret = self.signing_secret_for(&tx).await?;
            if !signing::verify(&secret, &tx.payload, signature) {
                tracing::warn!(id, "payload signature mismatch");
                return Err(PaymentError::InvalidSignature);
            }
        }

        let tx = self.expire_if_due(tx).await?;
        if tx.status.is_terminal() {
            return Ok(ResolveOutcome::AlreadyResolved(tx));
        }

        let target = match TransactionStatus::parse(reported_status) {
            Some(status @ (TransactionStatus::Success | TransactionStatus::Failed)) => status,
            _ => return Err(PaymentError::InvalidStatus(reported_status.to_string())),
        };

        match self
            .repository
            .mark_terminal(id, target, provider_reference, Utc::now())
            .await?
        {
            Some(updated) => {
                tracing::info!(id, status = updated.status.as_str(), "transaction resolved");
                self.reconcile(&updated).await;
                Ok(ResolveOutcome::Applied(updated))
            }
            None => {
                // Lost the race against a concurrent resolver or the sweep;
                // report whatever terminal state won.
                let current = self
                    .repository
                    .get(id)
                    .await?
                    .ok_or_else(|| PaymentError::NotFound(id.to_string()))?;
                Ok(ResolveOutcome::AlreadyResolved(current))
            }
        }
    }

    /// Housekeeping: force-expires all overdue pending records. Lazy expiry
    /// on read remains the correctness mechanism; this bounds growth.
    pub async fn sweep_expired(&self) -> Result<usize, PaymentError> {
        let expired = self.repository.expire_stale(Utc::now()).await?;
        for tx in &expired {
            self.reconcile(tx).await;
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale pending transactions");
        }
        Ok(expired.len())
    }

    async fn expire_if_due(&self, tx: Transaction) -> Result<Transaction, PaymentError> {
        if !should_expire(&tx, Utc::now()) {
            return Ok(tx);
        }

        match self
            .repository
            .mark_terminal(&tx.id, TransactionStatus::Expired, None, Utc::now())
            .await?
        {
            Some(expired) => {
                tracing::info!(id = %expired.id, "transaction expired lazily");
                self.reconcile(&expired).await;
                Ok(expired)
            }
            // A concurrent resolver won in the meantime; re-read the
            // terminal state it established.
            None => self
                .repository
                .get(&tx.id)
                .await?
                .ok_or_else(|| PaymentError::NotFound(tx.id.clone())),
        }
    }

    async fn reconcile(&self, tx: &Transaction) {
        if let Some(order_id) = &tx.order_id {
            self.reconciler
                .on_transaction_resolved(order_id, tx.status)
                .await;
        }
    }

    async fn signing_secret_for(&self, tx: &Transaction) -> Result<String, PaymentError> {
        match tx.secret_version {
            Some(version) => self
                .merchant
                .secret_for_version(version)
                .await
                .map_err(|e| PaymentError::ConfigurationUnavailable(e.to_string()))?
                .ok_or_else(|| {
                    PaymentError::ConfigurationUnavailable(format!(
                        "no signing secret for version {version}"
                    ))
                }),
            // Rows predating secret versioning verify against the current
            // secret.
            None => Ok(self
                .merchant
                .current()
                .await
                .map_err(|e| PaymentError::ConfigurationUnavailable(e.to_string()))?
                .signing_secret),
        }
    }
}

/// Opaque transaction identifier: time-based prefix plus a random suffix.
fn new_transaction_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "TXN{}{}",
        Utc::now().timestamp_millis(),
        suffix.to_ascii_uppercase()
    )
}

fn fresh_note() -> String {
    payment_note(&mut rand::thread_rng())
}
