//! Access helpers shared by the handlers
//!
//! The token only proves who is calling. Role, block and premium flags are
//! read fresh from the database before every gate check.

use shared::models::{Issue, User};
use shared::policy::{Action, Actor, Resource};
use shared::ErrorCode;
use shared::util::normalize_email;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{issue, user};
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// Fresh account of the caller
pub async fn load_caller(state: &ServerState, current: &CurrentUser) -> AppResult<User> {
    user::find_by_email(&state.pool, &current.email)
        .await?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::UserNotFound, "Account not registered, sign up first")
                .with_detail("email", current.email.clone())
        })
}

/// Fresh actor for the gate
pub async fn load_actor(state: &ServerState, current: &CurrentUser) -> AppResult<Actor> {
    Ok(Actor::from(&load_caller(state, current).await?))
}

pub async fn load_issue(state: &ServerState, id: i64) -> AppResult<Issue> {
    issue::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::issue_not_found(id))
}

pub async fn load_user(state: &ServerState, email: &str) -> AppResult<User> {
    user::find_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| AppError::user_not_found(email))
}

/// Run the role gate; refusals are logged under `security`
pub fn gate(
    state: &ServerState,
    action: Action,
    actor: &Actor,
    resource: Resource<'_>,
) -> AppResult<()> {
    state
        .gate
        .check(action, Some(actor), resource)
        .map_err(|denial| {
            security_log!(
                "WARN",
                "gate_denied",
                email = actor.email.clone(),
                role = actor.role.as_str(),
                action = action.name(),
                reason = denial.to_string()
            );
            AppError::from(denial)
        })
}

/// Body fields naming the actor are informational; they must match the token
pub fn check_claimed_identity(current: &CurrentUser, claimed: Option<&str>) -> AppResult<()> {
    match claimed {
        Some(email) if !current.email.eq_ignore_ascii_case(email.trim()) => {
            security_log!(
                "WARN",
                "identity_mismatch",
                email = current.email.clone(),
                claimed = email.to_string()
            );
            Err(AppError::permission_denied(
                "Acting identity must match the signed-in account",
            ))
        }
        _ => Ok(()),
    }
}

/// Path targets another account: only the owner or an admin may proceed
pub fn require_self_or_admin(current: &CurrentUser, email: &str) -> AppResult<()> {
    if current.is_self_or_admin(email) {
        return Ok(());
    }
    security_log!(
        "WARN",
        "not_owner",
        email = current.email.clone(),
        target = email.to_string()
    );
    Err(AppError::permission_denied("You can only access your own account"))
}

/// Path emails are normalized the same way stored ones are
pub fn path_email(raw: &str) -> String {
    normalize_email(raw)
}
