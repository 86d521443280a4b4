use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::PaymentError;
use crate::schemas::{
    CreatePaymentRequest, PaymentBundleResponse, PaymentStatusResponse, ResolveResponse,
    VerifyPaymentRequest,
};
use crate::services::CreatePayment;
use crate::AppState;

pub async fn create_payment(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentError> {
    let tx = state
        .payments
        .create(CreatePayment {
            amount: body.amount,
            provider: body.provider,
            user_id: body.user_id,
            order_id: body.order_id,
            device_hint: body.device_hint,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentBundleResponse::from(tx))))
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, PaymentError> {
    let tx = state.payments.get_status(&id).await?;
    Ok(Json(PaymentStatusResponse::from(tx)))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<ResolveResponse>, PaymentError> {
    let outcome = state
        .payments
        .resolve(&id, &body.status, body.signature.as_deref(), None)
        .await?;
    Ok(Json(ResolveResponse::from(outcome)))
}

/// Test-only surface with the verify contract. Hidden outside non-production
/// environments.
pub async fn simulate_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<ResolveResponse>, PaymentError> {
    if state.environment == "production" {
        return Err(PaymentError::NotFound(id));
    }

    tracing::info!(id = %id, status = %body.status, "simulated payment outcome");
    let outcome = state
        .payments
        .resolve(&id, &body.status, body.signature.as_deref(), None)
        .await?;
    Ok(Json(ResolveResponse::from(outcome)))
}
