pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod schemas;
pub mod services;
pub mod signing;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::services::PaymentService;

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub environment: String,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payments", post(handlers::payments::create_payment))
        .route("/payments/webhook", post(handlers::webhook::payment_webhook))
        .route("/payments/:id", get(handlers::payments::payment_status))
        .route("/payments/:id/verify", post(handlers::payments::verify_payment))
        .route(
            "/payments/:id/simulate",
            post(handlers::payments::simulate_payment),
        )
        .with_state(state)
}
