//! Auth API Handlers

use axum::{Json, extract::State};
use shared::models::{LoginRequest, LoginResponse, Role, TokenRequest, TokenResponse, User};
use shared::util::normalize_email;

use crate::api::access::load_caller;
use crate::auth::{CurrentUser, verify_password};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;
use crate::utils::validation::validate_email;
use crate::utils::{AppError, AppResult};

/// `POST /jwt`
///
/// The identity provider has already verified the email. Creates nothing;
/// accounts with a password (staff / admin) must use `/auth/login`.
pub async fn issue_token(
    State(state): State<ServerState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    validate_email(&req.email)?;
    let email = normalize_email(&req.email);

    if let Some(existing) = user::find_by_email(&state.pool, &email).await?
        && existing.role != Role::Citizen
    {
        security_log!(
            "WARN",
            "jwt_privileged_account",
            email = email.clone(),
            role = existing.role.as_str()
        );
        return Err(AppError::permission_denied(
            "Staff and admin accounts must sign in with a password",
        ));
    }

    let (token, expires_at) = state
        .get_jwt_service()
        .generate_token(&email, Role::Citizen)
        .map_err(|e| AppError::internal(e.to_string()))?;

    tracing::debug!(email = %email, "Issued citizen token");
    Ok(Json(TokenResponse { token, expires_at }))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = normalize_email(&req.email);

    let credentials = user::find_credentials(&state.pool, &email).await?;
    let user = match credentials {
        Some((user, Some(hash))) if verify_password(&req.password, &hash) => user,
        _ => {
            security_log!("WARN", "login_failed", email = email.clone());
            return Err(AppError::invalid_credentials());
        }
    };

    let (token, expires_at) = state
        .get_jwt_service()
        .generate_token(&user.email, user.role)
        .map_err(|e| AppError::internal(e.to_string()))?;

    security_log!(
        "INFO",
        "login_success",
        email = user.email.clone(),
        role = user.role.as_str()
    );
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

/// `GET /auth/me`
pub async fn me(State(state): State<ServerState>, current: CurrentUser) -> AppResult<Json<User>> {
    Ok(Json(load_caller(&state, &current).await?))
}
