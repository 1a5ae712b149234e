//! Payment API Handlers
//!
//! A payment is recorded once, after the provider confirms the intent.
//! Entitlements (premium, boost) are granted by separate calls.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::ErrorCode;
use shared::models::{
    Invoice, Payment, PaymentCreate, PaymentIntentRequest, PaymentIntentResponse,
    PaymentPurpose, PaymentQuery,
};
use shared::stats::filter_payments;
use shared::util::{now_millis, snowflake_id};

use crate::api::access::{check_claimed_identity, load_caller, load_issue, path_email};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{RepoError, payment};
use crate::payments::validate_intent_id;
use crate::utils::validation::{MAX_SHORT_TEXT_LEN, validate_amount, validate_required_text};
use crate::utils::{AppError, AppResult};

/// Tolerance for comparing prices in major units
const PRICE_EPSILON: f64 = 0.005;

fn check_price(state: &ServerState, purpose: PaymentPurpose, amount: f64) -> AppResult<()> {
    let expected = state.config.price_for(purpose);
    if (amount - expected).abs() > PRICE_EPSILON {
        return Err(AppError::validation(format!(
            "{} costs {expected}, got {amount}",
            purpose.description()
        ))
        .with_detail("expected", expected)
        .with_detail("amount", amount));
    }
    Ok(())
}

/// `POST /create-payment-intent`
pub async fn create_intent(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<PaymentIntentRequest>,
) -> AppResult<Json<PaymentIntentResponse>> {
    validate_amount(payload.price, "price")?;
    check_price(&state, payload.purpose, payload.price)?;
    let caller = load_caller(&state, &current).await?;

    let intent = state
        .payments
        .create_intent(payload.price, payload.purpose, &caller.email)
        .await?;

    tracing::info!(
        provider = state.payments.name(),
        intent_id = %intent.intent_id,
        purpose = payload.purpose.as_str(),
        "Payment intent created"
    );
    Ok(Json(intent))
}

/// `POST /payments` - the payer is always the token subject
pub async fn record(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<PaymentCreate>,
) -> AppResult<Json<Payment>> {
    validate_required_text(&payload.transaction_id, "transactionId", MAX_SHORT_TEXT_LEN)?;
    validate_amount(payload.amount, "amount")?;
    check_claimed_identity(&current, payload.email.as_deref())?;
    check_price(&state, payload.purpose, payload.amount)?;
    let caller = load_caller(&state, &current).await?;

    let issue_id = match payload.purpose {
        PaymentPurpose::Boost => {
            let id = payload
                .issue_id
                .ok_or_else(|| AppError::validation("issueId is required for a boost payment"))?;
            Some(load_issue(&state, id).await?.id)
        }
        PaymentPurpose::Subscription => None,
    };

    let transaction_id = payload.transaction_id.trim();
    validate_intent_id(transaction_id)?;
    let status = state.payments.intent_status(transaction_id).await?;
    if !status.succeeded {
        return Err(AppError::with_message(
            ErrorCode::PaymentFailed,
            "Payment has not succeeded at the provider",
        )
        .with_detail("transactionId", transaction_id));
    }
    status.verify(
        transaction_id,
        &caller.email,
        payload.purpose,
        payload.amount,
        PRICE_EPSILON,
    )?;

    let recorded = payment::create(
        &state.pool,
        payment::NewPayment {
            id: snowflake_id(),
            transaction_id,
            email: &caller.email,
            amount: payload.amount,
            purpose: payload.purpose,
            issue_id,
            paid_at: now_millis(),
        },
    )
    .await
    .map_err(|e| match e {
        RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::PaymentDuplicate, msg),
        other => other.into(),
    })?;

    audit_log!(
        "payment_recorded",
        actor = recorded.email.clone(),
        purpose = recorded.purpose.as_str(),
        amount = recorded.amount,
        transaction_id = recorded.transaction_id.clone()
    );
    Ok(Json(recorded))
}

/// `GET /payments` - admins see everything (or one payer via `email=`),
/// everyone else only their own. `search` and `order` apply before `limit`.
pub async fn list(
    State(state): State<ServerState>,
    current: CurrentUser,
    Query(query): Query<PaymentQuery>,
) -> AppResult<Json<Vec<Payment>>> {
    let requested = query.email.as_deref().map(path_email);
    let email = if current.is_admin() {
        requested
    } else {
        if let Some(email) = &requested
            && email != &current.email
        {
            return Err(AppError::permission_denied(
                "You can only list your own payments",
            ));
        }
        Some(current.email.clone())
    };

    let payments = payment::find_all(&state.pool, email.as_deref()).await?;
    let mut payments = filter_payments(
        &payments,
        query.search.as_deref().unwrap_or_default(),
        query.order.unwrap_or_default(),
    );
    if let Some(limit) = query.limit {
        payments.truncate(limit as usize);
    }
    Ok(Json(payments))
}

/// `GET /payments/{transactionId}/invoice` - payer or admin
pub async fn invoice(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(transaction_id): Path<String>,
) -> AppResult<Json<Invoice>> {
    let recorded = payment::find_by_transaction(&state.pool, &transaction_id)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::PaymentNotFound).with_detail("transactionId", transaction_id)
        })?;
    if !current.is_self_or_admin(&recorded.email) {
        return Err(AppError::permission_denied(
            "You can only view your own invoices",
        ));
    }
    Ok(Json(Invoice::from(&recorded)))
}
