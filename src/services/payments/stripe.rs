use anyhow::Context;
use async_trait::async_trait;

use super::{NewPaymentIntent, PaymentGateway, PaymentIntent};

const API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeGateway {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        intent: &NewPaymentIntent,
    ) -> anyhow::Result<PaymentIntent> {
        let mut form = vec![
            ("amount".to_string(), intent.amount.to_string()),
            ("currency".to_string(), intent.currency.clone()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        for (key, value) in &intent.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        let resp = self
            .client
            .post(format!("{API_BASE}/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("failed to create Stripe payment intent")?;

        parse_intent(resp).await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> anyhow::Result<PaymentIntent> {
        let resp = self
            .client
            .get(format!("{API_BASE}/payment_intents/{id}"))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("failed to retrieve Stripe payment intent")?;

        parse_intent(resp).await
    }
}

async fn parse_intent(resp: reqwest::Response) -> anyhow::Result<PaymentIntent> {
    let status = resp.status();
    let data: serde_json::Value = resp
        .json()
        .await
        .context("failed to parse Stripe response")?;

    if !status.is_success() {
        let message = data["error"]["message"].as_str().unwrap_or("unknown error");
        anyhow::bail!("Stripe API error ({}): {}", status, message);
    }

    serde_json::from_value(data).context("unexpected Stripe payment intent shape")
}
