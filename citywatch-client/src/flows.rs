//! Paid entitlements
//!
//! Each flow records the confirmed payment, then asks for the entitlement.
//! The gate runs before any money is recorded. If the second call fails the
//! payment stays on record and the caller gets
//! [`ClientError::EntitlementNotGranted`]; nothing is retried or undone.

use shared::models::{Issue, PaymentCreate, PaymentPurpose, User};
use shared::{Action, Denial, Resource};

use crate::gateway::Gateway;
use crate::http::HttpClient;
use crate::{ClientError, ClientResult};

/// What the hosted payment widget reports after a successful charge
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub transaction_id: String,
    pub amount: f64,
}

impl PaymentConfirmation {
    pub fn new(transaction_id: impl Into<String>, amount: f64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount,
        }
    }
}

impl<C: HttpClient> Gateway<C> {
    /// Record the subscription payment, then upgrade the account
    pub async fn subscribe_with_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> ClientResult<User> {
        let account = self
            .session()
            .snapshot()
            .identity()
            .cloned()
            .ok_or(Denial::NotAuthenticated)?;
        self.authorize(Action::Subscribe, Resource::Account(&account))?;

        self.record(confirmation, PaymentPurpose::Subscription, None, &account.email)
            .await?;
        self.subscribe()
            .await
            .map_err(|e| entitlement_failed(confirmation, e))
    }

    /// Record the boost payment, then raise the issue's priority
    pub async fn boost_with_payment(
        &self,
        issue: &Issue,
        confirmation: &PaymentConfirmation,
    ) -> ClientResult<Issue> {
        let session = self.authorize(Action::Boost, Resource::Issue(issue))?;
        let email = session
            .identity()
            .map(|u| u.email.clone())
            .ok_or(Denial::NotAuthenticated)?;

        self.record(confirmation, PaymentPurpose::Boost, Some(issue.id), &email)
            .await?;
        self.boost(issue, Some(&confirmation.transaction_id))
            .await
            .map_err(|e| entitlement_failed(confirmation, e))
    }

    async fn record(
        &self,
        confirmation: &PaymentConfirmation,
        purpose: PaymentPurpose,
        issue_id: Option<i64>,
        email: &str,
    ) -> ClientResult<()> {
        let payment = self
            .record_payment(&PaymentCreate {
                transaction_id: confirmation.transaction_id.clone(),
                amount: confirmation.amount,
                purpose,
                issue_id,
                email: Some(email.to_string()),
            })
            .await?;
        tracing::info!(
            transaction_id = %payment.transaction_id,
            purpose = purpose.as_str(),
            "Payment recorded"
        );
        Ok(())
    }
}

fn entitlement_failed(confirmation: &PaymentConfirmation, cause: ClientError) -> ClientError {
    tracing::warn!(
        transaction_id = %confirmation.transaction_id,
        error = %cause,
        "Payment recorded but entitlement not granted"
    );
    ClientError::EntitlementNotGranted {
        transaction_id: confirmation.transaction_id.clone(),
        cause: Box::new(cause),
    }
}
