//! Payment Repository
//!
//! The ledger is insert-only; a transaction id is recorded at most once.

use super::{RepoError, RepoResult};
use shared::models::{Payment, PaymentPurpose};
use sqlx::SqlitePool;

const PAYMENT_COLUMNS: &str = "id, transaction_id, email, amount, purpose, issue_id, status, paid_at";

pub struct NewPayment<'a> {
    pub id: i64,
    pub transaction_id: &'a str,
    pub email: &'a str,
    pub amount: f64,
    pub purpose: PaymentPurpose,
    pub issue_id: Option<i64>,
    pub paid_at: i64,
}

/// Duplicate transaction id -> [`RepoError::Duplicate`]
pub async fn create(pool: &SqlitePool, payment: NewPayment<'_>) -> RepoResult<Payment> {
    sqlx::query(
        "INSERT INTO payments (id, transaction_id, email, amount, purpose, issue_id, status, paid_at) \
         VALUES (?, ?, ?, ?, ?, ?, 'succeeded', ?)",
    )
    .bind(payment.id)
    .bind(payment.transaction_id)
    .bind(payment.email)
    .bind(payment.amount)
    .bind(payment.purpose.as_str())
    .bind(payment.issue_id)
    .bind(payment.paid_at)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate(format!(
            "Transaction {} is already recorded",
            payment.transaction_id
        )),
        other => other,
    })?;

    find_by_transaction(pool, payment.transaction_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to record payment".into()))
}

pub async fn find_by_transaction(
    pool: &SqlitePool,
    transaction_id: &str,
) -> RepoResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = ?"
    ))
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?;
    Ok(payment)
}

/// Newest first; `email` restricts to one payer
pub async fn find_all(pool: &SqlitePool, email: Option<&str>) -> RepoResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE (?1 IS NULL OR email = ?1) \
         ORDER BY paid_at DESC, id DESC"
    ))
    .bind(email)
    .fetch_all(pool)
    .await?;
    Ok(payments)
}

/// Whether `email` has a recorded payment for `purpose` (and issue, for boosts)
pub async fn has_payment(
    pool: &SqlitePool,
    email: &str,
    purpose: PaymentPurpose,
    issue_id: Option<i64>,
) -> RepoResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payments WHERE email = ?1 AND purpose = ?2 \
         AND (?3 IS NULL OR issue_id = ?3)",
    )
    .bind(email)
    .bind(purpose.as_str())
    .bind(issue_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
