use axum::{extract::State, response::IntoResponse, Json};

use crate::error::PaymentError;
use crate::schemas::{ResolveResponse, WebhookRequest};
use crate::AppState;

/// Provider webhook. Idempotent under provider retries: a repeated delivery
/// lands on an already-terminal record and comes back `already_resolved`
/// without a second state change or reconciliation.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(body): Json<WebhookRequest>,
) -> Result<impl IntoResponse, PaymentError> {
    let outcome = state
        .payments
        .resolve(
            &body.id,
            &body.status,
            body.signature.as_deref(),
            body.provider_reference.as_deref(),
        )
        .await?;

    // The reported amount is informational; the signed payload is the source
    // of truth. A mismatch is suspicious enough to log.
    if let Some(reported) = &body.amount {
        let stored = &outcome.transaction().amount;
        if reported != stored {
            tracing::warn!(
                id = %body.id,
                reported = %reported,
                stored = %stored,
                "webhook amount differs from stored transaction amount"
            );
        }
    }

    Ok(Json(ResolveResponse::from(outcome)))
}
