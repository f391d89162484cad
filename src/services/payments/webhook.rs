//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! Each `v1` is hex(HMAC-SHA256(secret, "<t>.<raw body>")).

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Deliveries signed longer ago than this are refused.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook secret not configured")]
    NotConfigured,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature timestamp outside tolerance")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn object_id(&self) -> Option<&str> {
        self.data.object["id"].as_str()
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.data.object["metadata"]["bookingId"]
            .as_str()
            .filter(|id| !id.is_empty())
    }
}

pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::NotConfigured);
    }

    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    let signed_at: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if now.saturating_sub(signed_at) > TOLERANCE_SECS {
        return Err(WebhookError::Expired);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::NotConfigured)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    let matched = signatures
        .iter()
        .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));
    if matched {
        Ok(())
    } else {
        Err(WebhookError::Mismatch)
    }
}

/// Builds a header value the way Stripe signs deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const NOW: i64 = 1_750_000_000;

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign_payload(payload, SECRET, NOW);
        assert_eq!(verify_webhook_signature(payload, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_modified_payload_rejected() {
        let header = sign_payload(b"{\"amount\":100}", SECRET, NOW);
        assert_eq!(
            verify_webhook_signature(b"{\"amount\":999}", &header, SECRET, NOW),
            Err(WebhookError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let header = sign_payload(payload, "whsec_other", NOW);
        assert_eq!(
            verify_webhook_signature(payload, &header, SECRET, NOW),
            Err(WebhookError::Mismatch)
        );
    }

    #[test]
    fn test_old_timestamp_rejected() {
        let payload = b"{}";
        let header = sign_payload(payload, SECRET, NOW - 600);
        assert_eq!(
            verify_webhook_signature(payload, &header, SECRET, NOW),
            Err(WebhookError::Expired)
        );

        let header = sign_payload(payload, SECRET, NOW - TOLERANCE_SECS);
        assert!(verify_webhook_signature(payload, &header, SECRET, NOW).is_ok());
    }

    #[test]
    fn test_extreme_timestamp_is_expired() {
        let header = format!("t={},v1=00", i64::MIN);
        assert_eq!(
            verify_webhook_signature(b"{}", &header, SECRET, NOW),
            Err(WebhookError::Expired)
        );
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = b"{}";
        let good = sign_payload(payload, SECRET, NOW);
        let sig = good.split_once("v1=").map(|(_, s)| s).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={sig}");
        assert!(verify_webhook_signature(payload, &header, SECRET, NOW).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["", "v1=abc", "t=abc,v1=abc", &format!("t={NOW}")] {
            assert_eq!(
                verify_webhook_signature(b"{}", header, SECRET, NOW),
                Err(WebhookError::MalformedHeader),
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_missing_secret_rejects_everything() {
        let header = sign_payload(b"{}", "", NOW);
        assert_eq!(
            verify_webhook_signature(b"{}", &header, "", NOW),
            Err(WebhookError::NotConfigured)
        );
    }

    #[test]
    fn test_event_accessors() {
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_1", "metadata": { "bookingId": "b1" } } }
        }))
        .unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.object_id(), Some("pi_1"));
        assert_eq!(event.booking_id(), Some("b1"));
    }
}
