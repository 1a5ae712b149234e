//! Statistics API Handlers
//!
//! Aggregates are computed from the raw rows with `shared::stats`, the same
//! functions the client uses for its dashboards.

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::Issue;
use shared::stats::{AdminStats, CitizenStats, PublicStats, admin_stats, citizen_stats, public_stats};

use crate::api::access::{path_email, require_self_or_admin};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{issue, payment, user};
use crate::utils::AppResult;

/// `GET /admin/stats` (admin)
pub async fn admin(State(state): State<ServerState>) -> AppResult<Json<AdminStats>> {
    let issues = issue::find_all(&state.pool, &issue::IssueFilter::default()).await?;
    let users = user::find_all(&state.pool, None, None).await?;
    let payments = payment::find_all(&state.pool, None).await?;
    Ok(Json(admin_stats(&issues, &users, &payments)))
}

/// `GET /public-stats`
pub async fn public(State(state): State<ServerState>) -> AppResult<Json<PublicStats>> {
    let issues = issue::find_all(&state.pool, &issue::IssueFilter::default()).await?;
    let users = user::find_all(&state.pool, None, None).await?;
    Ok(Json(public_stats(&issues, &users)))
}

/// `GET /citizen/stats/{email}` - self or admin
pub async fn citizen(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<CitizenStats>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    let issues = reported_by(&state, &email).await?;
    let payments = payment::find_all(&state.pool, Some(&email)).await?;
    Ok(Json(citizen_stats(&email, &issues, &payments)))
}

/// `GET /citizen/issues/{email}` - self or admin, newest first
pub async fn citizen_issues(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<Issue>>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    Ok(Json(reported_by(&state, &email).await?))
}

async fn reported_by(state: &ServerState, email: &str) -> AppResult<Vec<Issue>> {
    let filter = issue::IssueFilter {
        user_email: Some(email.to_string()),
        ..Default::default()
    };
    Ok(issue::find_all(&state.pool, &filter).await?)
}
