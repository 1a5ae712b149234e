//! Payment Model

use serde::{Deserialize, Serialize};

use crate::stats::SortOrder;
use crate::util::millis_to_utc;

/// What a payment pays for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum PaymentPurpose {
    Subscription,
    Boost,
}

impl PaymentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Boost => "boost",
        }
    }

    /// Invoice line description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Subscription => "Premium Subscription",
            Self::Boost => "Issue Boost",
        }
    }
}

/// Payment record (created once, never mutated)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    pub transaction_id: String,
    pub email: String,
    pub amount: f64,
    pub purpose: PaymentPurpose,
    pub issue_id: Option<i64>,
    pub status: String,
    pub paid_at: i64,
}

/// Record payment payload (`POST /payments`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreate {
    pub transaction_id: String,
    pub amount: f64,
    pub purpose: PaymentPurpose,
    #[serde(default)]
    pub issue_id: Option<i64>,
    /// Informational; the server records the token subject as payer
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET /payments` filters; `search` matches payer email or transaction id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub limit: Option<u32>,
    pub email: Option<String>,
    pub search: Option<String>,
    pub order: Option<SortOrder>,
}

/// `POST /create-payment-intent`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub price: f64,
    pub purpose: PaymentPurpose,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub intent_id: String,
}

/// Invoice derived from a payment record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub transaction_id: String,
    pub bill_to: String,
    pub description: String,
    pub amount: f64,
    /// YYYY-MM-DD (UTC)
    pub date: String,
    pub status: String,
}

impl Invoice {
    /// `INV-` followed by the last six characters of the transaction id, upper-cased
    pub fn number_for(transaction_id: &str) -> String {
        let chars: Vec<char> = transaction_id.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
        format!("INV-{}", tail.to_uppercase())
    }
}

impl From<&Payment> for Invoice {
    fn from(payment: &Payment) -> Self {
        Self {
            invoice_number: Self::number_for(&payment.transaction_id),
            transaction_id: payment.transaction_id.clone(),
            bill_to: payment.email.clone(),
            description: payment.purpose.description().to_string(),
            amount: payment.amount,
            date: millis_to_utc(payment.paid_at).format("%Y-%m-%d").to_string(),
            status: payment.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number() {
        assert_eq!(Invoice::number_for("pi_3abcdefXyz123"), "INV-XYZ123");
        assert_eq!(Invoice::number_for("ab"), "INV-AB");
    }

    #[test]
    fn test_invoice_from_payment() {
        let payment = Payment {
            id: 1,
            transaction_id: "pi_000111aaabbb".into(),
            email: "c@city.test".into(),
            amount: 100.0,
            purpose: PaymentPurpose::Boost,
            issue_id: Some(9),
            status: "succeeded".into(),
            // 2025-12-02T00:00:00Z
            paid_at: 1_764_633_600_000,
        };
        let invoice = Invoice::from(&payment);
        assert_eq!(invoice.invoice_number, "INV-AAABBB");
        assert_eq!(invoice.description, "Issue Boost");
        assert_eq!(invoice.date, "2025-12-02");
        assert_eq!(invoice.bill_to, "c@city.test");
    }
}
