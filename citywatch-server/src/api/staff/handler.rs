//! Staff API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use shared::ErrorCode;
use shared::models::{Issue, StaffCreate, StaffMember, StaffUpdate};
use shared::stats::{StaffStats, staff_stats};
use shared::util::{normalize_email, now_millis, snowflake_id};

use crate::api::access::{path_email, require_self_or_admin};
use crate::auth::{CurrentUser, hash_password};
use crate::core::ServerState;
use crate::db::repository::{RepoError, issue, user};
use crate::security_log;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_URL_LEN, validate_email, validate_optional_text,
    validate_password, validate_required_text,
};
use crate::utils::{AppError, AppResult};

fn staff_not_found(key: impl Into<serde_json::Value>) -> AppError {
    AppError::new(ErrorCode::StaffNotFound).with_detail("staff", key)
}

/// `GET /staff` (admin)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<StaffMember>>> {
    Ok(Json(user::find_all_staff(&state.pool).await?))
}

/// `POST /staff` (admin)
pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<StaffCreate>,
) -> AppResult<Json<StaffMember>> {
    validate_email(&payload.email)?;
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_password(&payload.password)?;
    validate_optional_text(&payload.photo_url, "photoURL", MAX_URL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    let email = normalize_email(&payload.email);
    let password_hash = hash_password(&payload.password)?;

    let staff = user::create_staff(
        &state.pool,
        user::NewStaff {
            id: snowflake_id(),
            email: &email,
            name: &payload.name,
            photo_url: payload.photo_url.as_deref(),
            phone: payload.phone.as_deref(),
            password_hash: &password_hash,
            now: now_millis(),
        },
    )
    .await
    .map_err(|e| match e {
        RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::UserEmailExists, msg),
        other => other.into(),
    })?;

    security_log!(
        "INFO",
        "staff_created",
        admin = current.email.clone(),
        staff = staff.email.clone()
    );
    Ok(Json(staff))
}

/// `PATCH /staff/{id}` - admin, or the staff member themself
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<StaffUpdate>,
) -> AppResult<Json<StaffMember>> {
    let existing = user::find_staff_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| staff_not_found(id))?;
    require_self_or_admin(&current, &existing.email)?;

    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.photo_url, "photoURL", MAX_URL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    let password_hash = match payload.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let staff = user::update_staff(&state.pool, id, &payload, password_hash.as_deref())
        .await
        .map_err(|e| match e {
            RepoError::NotFound(_) => staff_not_found(id),
            other => other.into(),
        })?;
    Ok(Json(staff))
}

/// `DELETE /staff/{id}` (admin) - assigned issues return to the unassigned pool
pub async fn delete(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    user::delete_staff(&state.pool, id, now_millis())
        .await
        .map_err(|e| match e {
            RepoError::NotFound(_) => staff_not_found(id),
            other => other.into(),
        })?;

    security_log!(
        "INFO",
        "staff_deleted",
        admin = current.email.clone(),
        staff_id = id
    );
    Ok(Json(true))
}

/// `GET /staff/email/{email}` - self or admin
pub async fn get_by_email(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<StaffMember>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    let staff = user::find_staff_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| staff_not_found(email))?;
    Ok(Json(staff))
}

/// `GET /staff/{email}/issues` - self or admin, newest first
pub async fn assigned_issues(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<Issue>>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    Ok(Json(load_assigned(&state, email).await?))
}

/// `GET /staff/{email}/stats` - self or admin
pub async fn stats(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(email): Path<String>,
) -> AppResult<Json<StaffStats>> {
    let email = path_email(&email);
    require_self_or_admin(&current, &email)?;
    let issues = load_assigned(&state, email.clone()).await?;
    Ok(Json(staff_stats(&email, &issues, Utc::now().date_naive())))
}

async fn load_assigned(state: &ServerState, email: String) -> AppResult<Vec<Issue>> {
    let filter = issue::IssueFilter {
        assigned_staff: Some(email),
        ..Default::default()
    };
    Ok(issue::find_all(&state.pool, &filter).await?)
}
