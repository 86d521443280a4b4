#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};

use paylink_core::adapters::in_memory::{InMemoryMerchantConfig, InMemoryTransactionRepository};
use paylink_core::adapters::reconciler::RecordingReconciler;
use paylink_core::domain::payload::LinkRequest;
use paylink_core::domain::{build_payment_links, DeviceClass, Provider, Transaction};
use paylink_core::ports::TransactionRepository;
use paylink_core::services::{CreatePayment, PaymentService};
use paylink_core::signing;

pub const SECRET_V1: &str = "merchant-secret-v1";
pub const RECEIVE_ADDRESS: &str = "merchant@upi";

pub struct Harness {
    pub service: Arc<PaymentService>,
    pub repository: InMemoryTransactionRepository,
    pub merchant: Arc<InMemoryMerchantConfig>,
    pub reconciler: RecordingReconciler,
}

pub fn harness() -> Harness {
    let repository = InMemoryTransactionRepository::new();
    let merchant = Arc::new(InMemoryMerchantConfig::new(RECEIVE_ADDRESS, SECRET_V1));
    let reconciler = RecordingReconciler::new();
    let service = Arc::new(PaymentService::new(
        Arc::new(repository.clone()),
        merchant.clone(),
        Arc::new(reconciler.clone()),
    ));
    Harness {
        service,
        repository,
        merchant,
        reconciler,
    }
}

pub fn create_request(amount: &str, provider: &str, order_id: Option<&str>) -> CreatePayment {
    CreatePayment {
        amount: BigDecimal::from_str(amount).unwrap(),
        provider: provider.to_string(),
        user_id: Some("user-1".to_string()),
        order_id: order_id.map(str::to_string),
        device_hint: Some("Mozilla/5.0 (Linux; Android 14)".to_string()),
    }
}

/// Inserts a correctly signed pending transaction with a caller-chosen
/// expiry offset, bypassing the service so tests can control time.
pub async fn insert_pending(
    repository: &InMemoryTransactionRepository,
    id: &str,
    order_id: Option<&str>,
    expires_in_secs: i64,
    secret: &str,
    secret_version: Option<i32>,
) -> Transaction {
    let amount = BigDecimal::from_str("120").unwrap();
    let created_at = Utc::now();
    let expires_at = created_at + Duration::seconds(expires_in_secs);

    let links = build_payment_links(&LinkRequest {
        provider: Provider::Paytm,
        device: DeviceClass::Android,
        receive_address: RECEIVE_ADDRESS,
        amount: &amount,
        note: "P777",
        transaction_id: id,
        expires_at,
    })
    .unwrap();
    let signature = signing::sign(secret, &links.payload).unwrap();

    let mut tx = Transaction::new(
        id.to_string(),
        None,
        order_id.map(str::to_string),
        amount,
        Provider::Paytm,
        RECEIVE_ADDRESS.to_string(),
        links.payload,
        signature,
        links.redirect_url,
        links.alternate_url,
        "P777".to_string(),
        secret_version.unwrap_or(1),
        created_at,
    );
    tx.expires_at = expires_at;
    tx.secret_version = secret_version;

    repository.insert(&tx).await.unwrap()
}
