//! Development provider: every intent succeeds
//!
//! Intents created here remember their payer, purpose and amount so that
//! recording them is checked the same way as with a real provider. Ids it
//! never issued are accepted without an owner.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use shared::models::{PaymentIntentResponse, PaymentPurpose};
use shared::util::snowflake_id;

use super::{IntentOwner, IntentStatus, PaymentError, PaymentProvider, validate_intent_id};

pub const SIMULATED_PREFIX: &str = "pi_sim_";

#[derive(Debug, Default)]
pub struct SimulatedProvider {
    issued: Mutex<HashMap<String, (IntentOwner, f64)>>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn create_intent(
        &self,
        amount: f64,
        purpose: PaymentPurpose,
        email: &str,
    ) -> Result<PaymentIntentResponse, PaymentError> {
        let intent_id = format!("{SIMULATED_PREFIX}{}", snowflake_id());
        tracing::debug!(%intent_id, amount, purpose = purpose.as_str(), email, "Simulated payment intent");
        let owner = IntentOwner {
            email: email.to_string(),
            purpose,
        };
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(intent_id.clone(), (owner, amount));
        Ok(PaymentIntentResponse {
            client_secret: format!("{intent_id}_secret_sim"),
            intent_id,
        })
    }

    async fn intent_status(&self, intent_id: &str) -> Result<IntentStatus, PaymentError> {
        validate_intent_id(intent_id)?;
        let issued = self
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(intent_id)
            .cloned();
        let (owner, amount) = match issued {
            Some((owner, amount)) => (Some(owner), Some(amount)),
            None => (None, None),
        };
        Ok(IntentStatus {
            id: intent_id.to_string(),
            succeeded: true,
            amount,
            owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_intent() {
        let provider = SimulatedProvider::new();
        let intent = provider
            .create_intent(100.0, PaymentPurpose::Boost, "c@city.test")
            .await
            .unwrap();
        assert!(intent.intent_id.starts_with(SIMULATED_PREFIX));
        assert!(intent.client_secret.starts_with(&intent.intent_id));

        let status = provider.intent_status(&intent.intent_id).await.unwrap();
        assert!(status.succeeded);
        assert_eq!(status.amount, Some(100.0));
        assert_eq!(status.owner.map(|o| o.email), Some("c@city.test".to_string()));
    }

    #[tokio::test]
    async fn test_unissued_ids() {
        let provider = SimulatedProvider::new();
        let status = provider.intent_status("pi_elsewhere").await.unwrap();
        assert_eq!(status.owner, None);
        assert!(matches!(
            provider.intent_status("pi_x?again=1").await,
            Err(PaymentError::InvalidIntentId(_))
        ));
    }
}
