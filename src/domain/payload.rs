//! Deep-link payload construction.
//!
//! Pure construction of the provider-specific UPI deep links and the opaque
//! base64 payload that gets signed. Randomness (the payment note) is injected
//! by the caller so construction stays reproducible under test.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::transaction::Provider;
use crate::error::PaymentError;

const CURRENCY: &str = "INR";
const PAYTM_ANDROID_PACKAGE: &str = "net.one97.paytm";
const GPAY_CANONICAL_SCHEME: &str = "tez://";
const GPAY_APP_SCHEME: &str = "gpay://";

/// Device class inferred from a caller-supplied hint (typically a user-agent
/// string). Unknown hints degrade to `Desktop`, which gets the Android-form
/// link as the default experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Ios,
    Android,
    Desktop,
}

impl DeviceClass {
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_ascii_lowercase();
        // "ios" must stand alone as a token; a substring match would also
        // catch hints like "Kiosk".
        let ios_token = hint
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == "ios");
        if hint.contains("iphone")
            || hint.contains("ipad")
            || hint.contains("like mac os x")
            || ios_token
        {
            DeviceClass::Ios
        } else if hint.contains("android") {
            DeviceClass::Android
        } else {
            DeviceClass::Desktop
        }
    }
}

/// The signed payload, serialized to JSON and base64-encoded for transport.
/// A closed tagged union with explicit fields keeps signing deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentPayload {
    /// Paytm dialect: a nested peer-to-peer payment intent with the amount in
    /// minor units (paise).
    PeerTransfer {
        payee: Payee,
        amount_minor: i64,
        reference: String,
    },
    /// Gpay dialect: a wrapper around the canonical link plus the transaction
    /// it belongs to and when it stops being payable.
    LinkWrapper {
        link: String,
        transaction_id: String,
        expires_at: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payee {
    pub address: String,
}

/// Inputs for link construction. The transaction id and expiry already exist
/// at this point; the builder never generates identity or time itself.
#[derive(Debug)]
pub struct LinkRequest<'a> {
    pub provider: Provider,
    pub device: DeviceClass,
    pub receive_address: &'a str,
    pub amount: &'a BigDecimal,
    pub note: &'a str,
    pub transaction_id: &'a str,
    pub expires_at: DateTime<Utc>,
}

/// Output bundle: the device-preferred link, the fallback link, and the
/// opaque payload to be signed. All three are immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinks {
    pub redirect_url: String,
    pub alternate_url: String,
    pub payload: String,
}

/// Generates the human-visible payment memo: a fixed letter followed by three
/// pseudo-random digits. Collisions are acceptable; the note is not an
/// identifier.
pub fn payment_note<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("P{:03}", rng.gen_range(0..1000))
}

/// Builds the provider-correct deep links and the base64 payload for signing.
/// Pure; fails only when the amount cannot be expressed in minor units.
pub fn build_payment_links(req: &LinkRequest<'_>) -> Result<PaymentLinks, PaymentError> {
    match req.provider {
        Provider::Paytm => build_paytm(req),
        Provider::Gpay => build_gpay(req),
    }
}

fn build_paytm(req: &LinkRequest<'_>) -> Result<PaymentLinks, PaymentError> {
    let query = transfer_query(req, false);
    let intent_link = format!(
        "intent://pay?{}#Intent;scheme=upi;package={};end",
        query, PAYTM_ANDROID_PACKAGE
    );
    let generic_link = format!("upi://pay?{}", query);

    let intent = IntentPayload::PeerTransfer {
        payee: Payee {
            address: req.receive_address.to_string(),
        },
        amount_minor: amount_minor_units(req.amount)?,
        reference: req.note.to_string(),
    };

    // The generic-scheme link is always the fallback; iOS prefers it outright
    // because the Android intent wrapper is not routable there.
    let redirect_url = match req.device {
        DeviceClass::Ios => generic_link.clone(),
        DeviceClass::Android | DeviceClass::Desktop => intent_link,
    };

    Ok(PaymentLinks {
        redirect_url,
        alternate_url: generic_link,
        payload: encode_payload(&intent)?,
    })
}

fn build_gpay(req: &LinkRequest<'_>) -> Result<PaymentLinks, PaymentError> {
    let query = transfer_query(req, true);
    let canonical_link = format!("{}upi/pay?{}", GPAY_CANONICAL_SCHEME, query);
    let app_link = canonical_link.replacen(GPAY_CANONICAL_SCHEME, GPAY_APP_SCHEME, 1);

    let wrapper = IntentPayload::LinkWrapper {
        link: canonical_link.clone(),
        transaction_id: req.transaction_id.to_string(),
        expires_at: req.expires_at.timestamp(),
    };

    let (redirect_url, alternate_url) = match req.device {
        DeviceClass::Ios => (app_link, canonical_link),
        DeviceClass::Android | DeviceClass::Desktop => (canonical_link, app_link),
    };

    Ok(PaymentLinks {
        redirect_url,
        alternate_url,
        payload: encode_payload(&wrapper)?,
    })
}

/// Standard UPI P2P transfer query: payee address, rupee amount, note and
/// currency; Gpay additionally carries its transfer-mode feature flag.
fn transfer_query(req: &LinkRequest<'_>, with_mode: bool) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("pa", req.receive_address)
        .append_pair("am", &rupee_string(req.amount))
        .append_pair("tn", req.note)
        .append_pair("cu", CURRENCY);
    if with_mode {
        query.append_pair("mode", "02");
    }
    query.finish()
}

/// Rupee amount formatted for the `am` query parameter: trailing fractional
/// zeros dropped, so `250.00` renders as `250`.
fn rupee_string(amount: &BigDecimal) -> String {
    amount.normalized().to_string()
}

/// Amount in minor units (paise), rounded to the nearest integer.
fn amount_minor_units(amount: &BigDecimal) -> Result<i64, PaymentError> {
    (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidAmount(amount.to_string()))
}

fn encode_payload(payload: &IntentPayload) -> Result<String, PaymentError> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| PaymentError::Internal(format!("payload serialization: {e}")))?;
    Ok(BASE64.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::str::FromStr;

    fn request<'a>(
        provider: Provider,
        device: DeviceClass,
        amount: &'a BigDecimal,
        expires_at: DateTime<Utc>,
    ) -> LinkRequest<'a> {
        LinkRequest {
            provider,
            device,
            receive_address: "merchant@upi",
            amount,
            note: "P482",
            transaction_id: "TXN1700000000000ABC123",
            expires_at,
        }
    }

    fn decode(payload: &str) -> IntentPayload {
        let raw = BASE64.decode(payload).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    #[test]
    fn paytm_ios_uses_generic_scheme_with_rupee_amount() {
        let amount = BigDecimal::from_str("250.00").unwrap();
        let links =
            build_payment_links(&request(Provider::Paytm, DeviceClass::Ios, &amount, Utc::now()))
                .unwrap();

        assert!(links.alternate_url.starts_with("upi://pay?"));
        assert!(links.alternate_url.contains("am=250"));
        assert!(!links.alternate_url.contains("am=250.00"));
        assert!(links.alternate_url.contains("pa=merchant%40upi"));
        assert!(links.alternate_url.contains("tn=P482"));
        assert!(links.alternate_url.contains("cu=INR"));
        assert!(links.redirect_url.starts_with("upi://pay?"));
    }

    #[test]
    fn paytm_android_gets_intent_link_distinct_from_ios() {
        let amount = BigDecimal::from_str("250.00").unwrap();
        let android = build_payment_links(&request(
            Provider::Paytm,
            DeviceClass::Android,
            &amount,
            Utc::now(),
        ))
        .unwrap();
        let ios =
            build_payment_links(&request(Provider::Paytm, DeviceClass::Ios, &amount, Utc::now()))
                .unwrap();

        assert!(android.redirect_url.starts_with("intent://pay?"));
        assert!(android
            .redirect_url
            .contains("#Intent;scheme=upi;package=net.one97.paytm;end"));
        assert_ne!(ios.redirect_url, android.redirect_url);
        assert_ne!(ios.alternate_url, android.redirect_url);
    }

    #[test]
    fn desktop_degrades_to_android_form() {
        let amount = BigDecimal::from_str("10").unwrap();
        let desktop = build_payment_links(&request(
            Provider::Paytm,
            DeviceClass::Desktop,
            &amount,
            Utc::now(),
        ))
        .unwrap();
        assert!(desktop.redirect_url.starts_with("intent://pay?"));
    }

    #[test]
    fn paytm_payload_carries_minor_units_and_reference() {
        let amount = BigDecimal::from_str("250.00").unwrap();
        let links = build_payment_links(&request(
            Provider::Paytm,
            DeviceClass::Android,
            &amount,
            Utc::now(),
        ))
        .unwrap();

        match decode(&links.payload) {
            IntentPayload::PeerTransfer {
                payee,
                amount_minor,
                reference,
            } => {
                assert_eq!(payee.address, "merchant@upi");
                assert_eq!(amount_minor, 25000);
                assert_eq!(reference, "P482");
            }
            other => panic!("unexpected payload variant: {:?}", other),
        }
    }

    #[test]
    fn minor_units_round_to_nearest() {
        let amount = BigDecimal::from_str("99.999").unwrap();
        assert_eq!(amount_minor_units(&amount).unwrap(), 10000);
        let amount = BigDecimal::from_str("0.004").unwrap();
        assert_eq!(amount_minor_units(&amount).unwrap(), 0);
    }

    #[test]
    fn gpay_links_differ_only_by_scheme_token() {
        let amount = BigDecimal::from_str("99.50").unwrap();
        let expires_at = Utc::now() + Duration::seconds(600);
        let links = build_payment_links(&request(
            Provider::Gpay,
            DeviceClass::Android,
            &amount,
            expires_at,
        ))
        .unwrap();

        assert!(links.redirect_url.starts_with("tez://upi/pay?"));
        assert!(links.alternate_url.starts_with("gpay://upi/pay?"));
        assert_eq!(
            links.redirect_url.trim_start_matches("tez://"),
            links.alternate_url.trim_start_matches("gpay://")
        );
        assert!(links.redirect_url.contains("mode=02"));
        assert!(links.redirect_url.contains("am=99.5"));
    }

    #[test]
    fn gpay_ios_prefers_app_scheme() {
        let amount = BigDecimal::from_str("5").unwrap();
        let links = build_payment_links(&request(
            Provider::Gpay,
            DeviceClass::Ios,
            &amount,
            Utc::now(),
        ))
        .unwrap();
        assert!(links.redirect_url.starts_with("gpay://upi/pay?"));
        assert!(links.alternate_url.starts_with("tez://upi/pay?"));
    }

    #[test]
    fn gpay_payload_wraps_canonical_link() {
        let amount = BigDecimal::from_str("5").unwrap();
        let expires_at = Utc::now() + Duration::seconds(600);
        let links = build_payment_links(&request(
            Provider::Gpay,
            DeviceClass::Android,
            &amount,
            expires_at,
        ))
        .unwrap();

        match decode(&links.payload) {
            IntentPayload::LinkWrapper {
                link,
                transaction_id,
                expires_at: ts,
            } => {
                assert_eq!(link, links.redirect_url);
                assert_eq!(transaction_id, "TXN1700000000000ABC123");
                assert_eq!(ts, expires_at.timestamp());
            }
            other => panic!("unexpected payload variant: {:?}", other),
        }
    }

    #[test]
    fn device_class_from_hint() {
        assert_eq!(
            DeviceClass::from_hint("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"),
            DeviceClass::Ios
        );
        assert_eq!(
            DeviceClass::from_hint("Mozilla/5.0 (Linux; Android 14; Pixel 8)"),
            DeviceClass::Android
        );
        assert_eq!(DeviceClass::from_hint("curl/8.4.0"), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_hint(""), DeviceClass::Desktop);
    }

    #[test]
    fn ios_hint_requires_a_standalone_token() {
        assert_eq!(DeviceClass::from_hint("ios"), DeviceClass::Ios);
        assert_eq!(DeviceClass::from_hint("iOS 17.2"), DeviceClass::Ios);
        assert_eq!(
            DeviceClass::from_hint("Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X)"),
            DeviceClass::Ios
        );

        assert_eq!(
            DeviceClass::from_hint("KioskBrowser/3.1 (Windows NT 10.0)"),
            DeviceClass::Desktop
        );
        assert_eq!(DeviceClass::from_hint("Kiosk"), DeviceClass::Desktop);
    }

    #[test]
    fn note_is_letter_plus_three_digits_and_reproducible() {
        let mut rng = StdRng::seed_from_u64(7);
        let note = payment_note(&mut rng);
        assert_eq!(note.len(), 4);
        assert!(note.starts_with('P'));
        assert!(note[1..].chars().all(|c| c.is_ascii_digit()));

        let mut rng_again = StdRng::seed_from_u64(7);
        assert_eq!(payment_note(&mut rng_again), note);
    }

    #[test]
    fn same_inputs_same_note_same_links() {
        let amount = BigDecimal::from_str("42").unwrap();
        let expires_at = Utc::now();
        let a = build_payment_links(&request(
            Provider::Paytm,
            DeviceClass::Android,
            &amount,
            expires_at,
        ))
        .unwrap();
        let b = build_payment_links(&request(
            Provider::Paytm,
            DeviceClass::Android,
            &amount,
            expires_at,
        ))
        .unwrap();
        assert_eq!(a, b);
    }
}
