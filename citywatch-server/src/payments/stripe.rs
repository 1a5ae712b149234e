//! Stripe integration via REST API (no SDK dependency)

use async_trait::async_trait;
use reqwest::Url;
use shared::models::{PaymentIntentResponse, PaymentPurpose};

use super::{
    CURRENCY, IntentOwner, IntentStatus, PaymentError, PaymentProvider, to_minor_units,
    validate_intent_id,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeProvider {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl StripeProvider {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// `{api_base}/payment_intents[/{id}]` with the id as one encoded segment
    fn intents_url(&self, intent_id: Option<&str>) -> Result<Url, PaymentError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| PaymentError::Rejected(format!("bad api base {}: {e}", self.api_base)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PaymentError::Rejected(format!("bad api base {}", self.api_base)))?;
            segments.push("payment_intents");
            if let Some(id) = intent_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

/// Intents created here carry the payer and purpose in metadata
fn owner_from_metadata(metadata: &serde_json::Value) -> Option<IntentOwner> {
    let email = metadata["email"].as_str()?.to_string();
    let purpose = serde_json::from_value::<PaymentPurpose>(metadata["purpose"].clone()).ok()?;
    Some(IntentOwner { email, purpose })
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_intent(
        &self,
        amount: f64,
        purpose: PaymentPurpose,
        email: &str,
    ) -> Result<PaymentIntentResponse, PaymentError> {
        let minor = to_minor_units(amount).to_string();
        let resp: serde_json::Value = self
            .client
            .post(self.intents_url(None)?)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", minor.as_str()),
                ("currency", CURRENCY),
                ("payment_method_types[]", "card"),
                ("receipt_email", email),
                ("metadata[purpose]", purpose.as_str()),
                ("metadata[email]", email),
            ])
            .send()
            .await?
            .json()
            .await?;

        match (resp["id"].as_str(), resp["client_secret"].as_str()) {
            (Some(id), Some(secret)) => Ok(PaymentIntentResponse {
                client_secret: secret.to_string(),
                intent_id: id.to_string(),
            }),
            _ => Err(PaymentError::Rejected(format!(
                "create payment intent failed: {}",
                resp["error"]["message"].as_str().unwrap_or("unknown error")
            ))),
        }
    }

    async fn intent_status(&self, intent_id: &str) -> Result<IntentStatus, PaymentError> {
        validate_intent_id(intent_id)?;
        let resp = self
            .client
            .get(self.intents_url(Some(intent_id))?)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::UnknownIntent(intent_id.to_string()));
        }
        let body: serde_json::Value = resp.json().await?;

        if body["object"].as_str() != Some("payment_intent") {
            return Err(PaymentError::Rejected(format!("not a payment intent: {body}")));
        }
        let (Some(id), Some(status), Some(received)) = (
            body["id"].as_str(),
            body["status"].as_str(),
            body["amount_received"].as_i64(),
        ) else {
            return Err(PaymentError::Rejected(format!("unexpected response: {body}")));
        };
        let owner = owner_from_metadata(&body["metadata"]).ok_or_else(|| {
            PaymentError::Mismatch(format!("{id} was not created by this service"))
        })?;

        Ok(IntentStatus {
            id: id.to_string(),
            succeeded: status == "succeeded",
            amount: Some(received as f64 / 100.0),
            owner: Some(owner),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn intent(Path(id): Path<String>) -> Json<Value> {
        let reported = if id == "pi_alias" { "pi_real" } else { id.as_str() };
        let metadata = if id == "pi_foreign" {
            json!({})
        } else {
            json!({ "email": "a@city.test", "purpose": "boost" })
        };
        Json(json!({
            "id": reported,
            "object": "payment_intent",
            "status": "succeeded",
            "amount_received": 10_000,
            "metadata": metadata,
        }))
    }

    async fn provider() -> StripeProvider {
        let app = Router::new().route("/v1/payment_intents/{id}", get(intent));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        StripeProvider::new("sk_test", format!("http://{addr}/v1/"))
    }

    #[tokio::test]
    async fn test_intent_status_reads_owner() {
        let status = provider().await.intent_status("pi_ok").await.unwrap();
        assert_eq!(status.id, "pi_ok");
        assert!(status.succeeded);
        assert_eq!(status.amount, Some(100.0));
        assert_eq!(
            status.owner,
            Some(IntentOwner {
                email: "a@city.test".into(),
                purpose: PaymentPurpose::Boost,
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_ids_never_reach_provider() {
        let provider = provider().await;
        for id in ["pi_ok?a=1", "../charges/ch_1", "pi_ok/../x"] {
            let err = provider.intent_status(id).await.unwrap_err();
            assert!(matches!(err, PaymentError::InvalidIntentId(_)), "{id}");
        }
    }

    #[tokio::test]
    async fn test_reported_id_and_metadata_are_surfaced() {
        let provider = provider().await;
        let status = provider.intent_status("pi_alias").await.unwrap();
        assert!(status
            .verify("pi_alias", "a@city.test", PaymentPurpose::Boost, 100.0, 0.005)
            .is_err());

        let err = provider.intent_status("pi_foreign").await.unwrap_err();
        assert!(matches!(err, PaymentError::Mismatch(_)));
    }

    #[test]
    fn test_intents_url_encodes_one_segment() {
        let provider = StripeProvider::new("sk", DEFAULT_API_BASE);
        let url = provider.intents_url(Some("pi_1")).unwrap();
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/payment_intents/pi_1");
        let url = provider.intents_url(None).unwrap();
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/payment_intents");
    }
}
