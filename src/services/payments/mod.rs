pub mod stripe;
pub mod webhook;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.metadata
            .get("bookingId")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        intent: &NewPaymentIntent,
    ) -> anyhow::Result<PaymentIntent>;

    async fn retrieve_payment_intent(&self, id: &str) -> anyhow::Result<PaymentIntent>;
}

/// Converts a decimal price into the gateway's integer minor units.
pub fn to_minor_units(total: f64) -> i64 {
    (total * 100.0).round() as i64
}

/// Gateway object ids are interpolated into request paths, so only
/// `[A-Za-z0-9_]` is accepted.
pub fn is_valid_intent_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_id_charset() {
        assert!(is_valid_intent_id("pi_3MtwBwLkdIwHu7ix28a3tqPa"));
        for id in ["", "../customers", "pi_1/cancel", "pi_1?expand=x", "pi 1"] {
            assert!(!is_valid_intent_id(id), "{id:?}");
        }
    }

    #[test]
    fn test_minor_units_round_half_cent() {
        assert_eq!(to_minor_units(30.0), 3000);
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_minor_units(0.125), 13);
    }

    #[test]
    fn test_booking_id_from_metadata() {
        let mut intent = PaymentIntent {
            id: "pi_1".to_string(),
            amount: 3000,
            currency: "usd".to_string(),
            status: "succeeded".to_string(),
            client_secret: None,
            metadata: BTreeMap::new(),
        };
        assert_eq!(intent.booking_id(), None);

        intent.metadata.insert("bookingId".to_string(), "b1".to_string());
        assert_eq!(intent.booking_id(), Some("b1"));
        assert!(intent.succeeded());
    }
}
