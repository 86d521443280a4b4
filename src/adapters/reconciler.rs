//! Order reconciliation adapters.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::TransactionStatus;
use crate::ports::{OrderOutcome, OrderReconciler};

/// Default reconciler for deployments where the order store is reached out
/// of band: logs the outcome that the external collaborator is expected to
/// apply. Transient collaborator failures are that side's retry problem; the
/// transaction's terminal state is already durable by the time this runs.
#[derive(Default, Clone)]
pub struct LoggingReconciler;

#[async_trait]
impl OrderReconciler for LoggingReconciler {
    async fn on_transaction_resolved(&self, order_id: &str, final_status: TransactionStatus) {
        let outcome = OrderOutcome::from_status(final_status);
        tracing::info!(
            order_id,
            status = final_status.as_str(),
            payment_status = outcome.payment_status,
            order_status = outcome.order_status,
            "order reconciliation"
        );
    }
}

/// Records every reconciliation call. Used by the integration suites to
/// assert that terminal transitions notify the order store exactly once.
#[derive(Default, Clone)]
pub struct RecordingReconciler {
    calls: Arc<Mutex<Vec<(String, TransactionStatus)>>>,
}

impl RecordingReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<(String, TransactionStatus)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl OrderReconciler for RecordingReconciler {
    async fn on_transaction_resolved(&self, order_id: &str, final_status: TransactionStatus) {
        self.calls
            .lock()
            .await
            .push((order_id.to_string(), final_status));
    }
}
