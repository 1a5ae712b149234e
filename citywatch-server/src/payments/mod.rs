//! Payment providers
//!
//! The hosted widget tokenises the card; the server only creates intents
//! and, before recording a payment, asks the provider whether it succeeded.

mod simulated;
mod stripe;

pub use simulated::SimulatedProvider;
pub use stripe::{DEFAULT_API_BASE, StripeProvider};

use async_trait::async_trait;
use shared::models::{PaymentIntentResponse, PaymentPurpose};
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Charges are made in Bangladeshi taka
pub const CURRENCY: &str = "bdt";

/// Every intent id starts with this prefix
pub const INTENT_PREFIX: &str = "pi_";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider rejected the request: {0}")]
    Rejected(String),

    #[error("unknown payment intent {0}")]
    UnknownIntent(String),

    #[error("invalid payment intent id: {0}")]
    InvalidIntentId(String),

    #[error("payment intent does not match the payment: {0}")]
    Mismatch(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UnknownIntent(id) => AppError::with_message(
                ErrorCode::PaymentNotFound,
                format!("Payment {id} not found at provider"),
            ),
            PaymentError::InvalidIntentId(id) => {
                AppError::validation("transactionId is not a payment intent id")
                    .with_detail("transactionId", id)
            }
            PaymentError::Mismatch(reason) => AppError::with_message(
                ErrorCode::PaymentFailed,
                format!("Payment intent does not match: {reason}"),
            ),
            other => AppError::with_message(ErrorCode::PaymentProviderError, other.to_string()),
        }
    }
}

/// Payer and purpose an intent was created for
#[derive(Debug, Clone, PartialEq)]
pub struct IntentOwner {
    pub email: String,
    pub purpose: PaymentPurpose,
}

/// Provider view of a payment intent
#[derive(Debug, Clone, PartialEq)]
pub struct IntentStatus {
    /// Id as reported by the provider
    pub id: String,
    pub succeeded: bool,
    /// Major units; `None` when the provider does not report it
    pub amount: Option<f64>,
    /// `None` when the provider holds no record of who created the intent
    pub owner: Option<IntentOwner>,
}

impl IntentStatus {
    /// The intent is exactly `intent_id`, was created for this payer and
    /// purpose, and charged `amount`
    pub fn verify(
        &self,
        intent_id: &str,
        email: &str,
        purpose: PaymentPurpose,
        amount: f64,
        tolerance: f64,
    ) -> Result<(), PaymentError> {
        if self.id != intent_id {
            return Err(PaymentError::Mismatch(format!(
                "provider returned {} for {intent_id}",
                self.id
            )));
        }
        if let Some(owner) = &self.owner {
            if owner.email != email {
                return Err(PaymentError::Mismatch(
                    "intent was created for another account".into(),
                ));
            }
            if owner.purpose != purpose {
                return Err(PaymentError::Mismatch(format!(
                    "intent was created for {}",
                    owner.purpose.as_str()
                )));
            }
        }
        if let Some(charged) = self.amount
            && (charged - amount).abs() > tolerance
        {
            return Err(PaymentError::Mismatch(format!(
                "provider charged {charged}, record claims {amount}"
            )));
        }
        Ok(())
    }
}

/// `pi_` followed by ASCII letters, digits or underscores
pub fn validate_intent_id(intent_id: &str) -> Result<(), PaymentError> {
    let valid = intent_id
        .strip_prefix(INTENT_PREFIX)
        .is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(PaymentError::InvalidIntentId(intent_id.to_string()))
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_intent(
        &self,
        amount: f64,
        purpose: PaymentPurpose,
        email: &str,
    ) -> Result<PaymentIntentResponse, PaymentError>;

    async fn intent_status(&self, intent_id: &str) -> Result<IntentStatus, PaymentError>;
}

/// Major units to the provider's minor units (poisha)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(100.0), 10_000);
        assert_eq!(to_minor_units(19.99), 1_999);
    }

    #[test]
    fn test_intent_id_shape() {
        assert!(validate_intent_id("pi_3Nq8XkLmn0").is_ok());
        assert!(validate_intent_id("pi_sim_1234").is_ok());
        for bad in ["pi_X?a=1", "../charges/ch_X", "pi_", "ch_123", "pi_a/b", "pi_a#b", "pi_a%2F"] {
            assert!(
                matches!(validate_intent_id(bad), Err(PaymentError::InvalidIntentId(_))),
                "{bad} should be rejected"
            );
        }
    }

    fn paid(id: &str, owner: Option<(&str, PaymentPurpose)>) -> IntentStatus {
        IntentStatus {
            id: id.into(),
            succeeded: true,
            amount: Some(100.0),
            owner: owner.map(|(email, purpose)| IntentOwner {
                email: email.into(),
                purpose,
            }),
        }
    }

    #[test]
    fn test_verify_intent() {
        let status = paid("pi_1", Some(("a@city.test", PaymentPurpose::Boost)));
        assert!(status
            .verify("pi_1", "a@city.test", PaymentPurpose::Boost, 100.0, 0.005)
            .is_ok());

        let checks = [
            ("pi_2", "a@city.test", PaymentPurpose::Boost, 100.0),
            ("pi_1", "b@city.test", PaymentPurpose::Boost, 100.0),
            ("pi_1", "a@city.test", PaymentPurpose::Subscription, 100.0),
            ("pi_1", "a@city.test", PaymentPurpose::Boost, 1000.0),
        ];
        for (id, email, purpose, amount) in checks {
            let err = status.verify(id, email, purpose, amount, 0.005).unwrap_err();
            assert!(matches!(err, PaymentError::Mismatch(_)), "{id} {email} {amount}");
        }

        // No owner on record: only id and amount are checked
        let anonymous = paid("pi_1", None);
        assert!(anonymous
            .verify("pi_1", "b@city.test", PaymentPurpose::Subscription, 100.0, 0.005)
            .is_ok());
    }

    #[test]
    fn test_error_mapping() {
        let err = AppError::from(PaymentError::InvalidIntentId("pi_X?a=1".into()));
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let err = AppError::from(PaymentError::Mismatch("other account".into()));
        assert_eq!(err.code, ErrorCode::PaymentFailed);
    }
}
