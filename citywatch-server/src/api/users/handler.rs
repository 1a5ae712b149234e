//! User API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{
    BlockRequest, ListQuery, PaymentPurpose, RoleResponse, User, UserCreate, UserUpdate,
};
use shared::policy::{Action, Resource};
use shared::util::{normalize_email, now_millis, snowflake_id};
use shared::{Denial, ErrorCode};

use crate::api::access::{gate, load_actor, load_user, path_email, require_self_or_admin};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{payment, user};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_URL_LEN, validate_email, validate_optional_text, validate_required_text,
};
use crate::utils::{AppError, AppResult};
use crate::{audit_log, security_log};

/// `GET /users` (admin) - newest first, optionally one role
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<User>>> {
    let users = user::find_all(&state.pool, query.role, query.limit).await?;
    Ok(Json(users))
}

/// `POST /users` - register a citizen if the email is new; returns the stored account
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<User>> {
    validate_email(&payload.email)?;
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.photo_url, "photoURL", MAX_URL_LEN)?;

    let email = normalize_email(&payload.email);
    let (account, created) =
        user::create_if_absent(&state.pool, snowflake_id(), &email, &payload, now_millis()).await?;

    if created {
        tracing::info!(email = %account.email, "Citizen registered");
    }
    Ok(Json(account))
}

/// `GET /users/{email}` - self or admin
pub async fn get_by_email(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<User>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    Ok(Json(load_user(&state, &email).await?))
}

/// `PUT /users/{email}` - profile fields (name, photo)
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.photo_url, "photoURL", MAX_URL_LEN)?;

    let updated = user::update_profile(&state.pool, &email, &payload)
        .await
        .map_err(|e| match e {
            crate::db::repository::RepoError::NotFound(_) => AppError::user_not_found(&email),
            other => other.into(),
        })?;
    Ok(Json(updated))
}

/// `GET /users/role/{email}` - public
pub async fn role(
    State(state): State<ServerState>,
    Path(email): Path<String>,
) -> AppResult<Json<RoleResponse>> {
    let account = load_user(&state, &path_email(&email)).await?;
    Ok(Json(RoleResponse { role: account.role }))
}

/// `PATCH /users/block/{email}` (admin)
pub async fn block(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
    Json(payload): Json<BlockRequest>,
) -> AppResult<Json<User>> {
    let actor = load_actor(&state, &current).await?;
    let target = load_user(&state, &path_email(&email)).await?;
    let action = if payload.is_blocked {
        Action::BlockUser
    } else {
        Action::UnblockUser
    };
    gate(&state, action, &actor, Resource::User(&target))?;

    let updated = user::set_blocked(&state.pool, &target.email, payload.is_blocked).await?;
    security_log!(
        "INFO",
        "user_block_changed",
        admin = actor.email.clone(),
        target = updated.email.clone(),
        is_blocked = updated.is_blocked
    );
    Ok(Json(updated))
}

/// `PATCH /users/premium/{email}` - self; needs a recorded subscription payment
pub async fn premium(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<User>> {
    let email = path_email(&email);
    let actor = load_actor(&state, &current).await?;
    let account = load_user(&state, &email).await?;
    gate(&state, Action::Subscribe, &actor, Resource::Account(&account))?;

    if !payment::has_payment(&state.pool, &account.email, PaymentPurpose::Subscription, None).await?
    {
        return Err(AppError::with_message(
            ErrorCode::PaymentRequired,
            "Record the subscription payment before upgrading",
        ));
    }

    if !user::set_premium(&state.pool, &account.email, now_millis()).await? {
        return Err(Denial::AlreadyPremium.into());
    }

    audit_log!(
        "premium_granted",
        actor = actor.email.clone(),
        purpose = PaymentPurpose::Subscription.as_str()
    );
    Ok(Json(load_user(&state, &account.email).await?))
}
