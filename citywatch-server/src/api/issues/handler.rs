//! Issue API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::lifecycle::{assignment_message, boost_message, timeline_message};
use shared::models::{
    AssignRequest, BoostRequest, Issue, IssueCreate, IssueListResponse, IssueQuery, IssueUpdate,
    PaymentPurpose, Priority, StatusUpdateRequest, UpvoteRequest,
};
use shared::policy::{Action, Resource};
use shared::util::{normalize_email, now_millis, snowflake_id};
use shared::{Denial, ErrorCode};

use crate::api::access::{check_claimed_identity, gate, load_actor, load_issue};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{issue, payment, user};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_URL_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// `GET /issues`
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<IssueListResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let priority = match query.priority.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => Some(
            Priority::parse_filter(&raw.to_lowercase(), state.config.priority_scale).ok_or_else(
                || AppError::validation(format!("Unsupported priority filter: {raw}")),
            )?,
        ),
        None => None,
    };

    let filter = issue::IssueFilter {
        search: query.search,
        status: query.status,
        category: query.category,
        priority,
        user_email: query.user_email.as_deref().map(normalize_email),
        assigned_staff: None,
    };
    let offset = u64::from(page - 1) * u64::from(limit);
    let (issues, total_count) = issue::find_page(&state.pool, &filter, limit, offset).await?;

    Ok(Json(IssueListResponse {
        issues,
        total_count,
    }))
}

/// `GET /issues/{id}`
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Issue>> {
    Ok(Json(load_issue(&state, id).await?))
}

/// `POST /issues`
pub async fn create(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(payload): Json<IssueCreate>,
) -> AppResult<Json<Issue>> {
    validate_required_text(&payload.title, "title", MAX_NAME_LEN)?;
    validate_required_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_required_text(&payload.location, "location", MAX_ADDRESS_LEN)?;
    validate_optional_text(&payload.image, "image", MAX_URL_LEN)?;
    check_claimed_identity(&current, payload.user_email.as_deref())?;

    let actor = load_actor(&state, &current).await?;
    let existing_count = issue::count_by_reporter(&state.pool, &actor.email).await?;
    gate(
        &state,
        Action::CreateIssue,
        &actor,
        Resource::NewIssue {
            existing_count: usize::try_from(existing_count).unwrap_or(usize::MAX),
        },
    )?;

    let cap = state.gate.issue_cap(&actor);
    let created = issue::create(
        &state.pool,
        snowflake_id(),
        payload,
        &actor.email,
        cap,
        now_millis(),
    )
    .await?
    .ok_or_else(|| {
        // Concurrent reports filled the quota after the gate
        AppError::from(Denial::FreeTierLimitReached {
            limit: state.gate.free_tier_issue_limit,
        })
    })?;

    audit_log!(
        "issue_created",
        issue_id = created.id,
        actor = actor.email.clone(),
        to = created.status.as_str()
    );
    Ok(Json(created))
}

/// `PUT /issues/{id}` - content fields only, pending issues only
pub async fn update(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<IssueUpdate>,
) -> AppResult<Json<Issue>> {
    if let Some(title) = &payload.title {
        validate_required_text(title, "title", MAX_NAME_LEN)?;
    }
    if let Some(description) = &payload.description {
        validate_required_text(description, "description", MAX_NOTE_LEN)?;
    }
    if let Some(location) = &payload.location {
        validate_required_text(location, "location", MAX_ADDRESS_LEN)?;
    }
    validate_optional_text(&payload.image, "image", MAX_URL_LEN)?;

    let actor = load_actor(&state, &current).await?;
    let existing = load_issue(&state, id).await?;
    gate(&state, Action::EditIssue, &actor, Resource::Issue(&existing))?;

    if !issue::update_content(&state.pool, id, payload, now_millis()).await? {
        // Moved out of pending between the check and the write
        let fresh = load_issue(&state, id).await?;
        return Err(Denial::IssueNotEditable {
            status: fresh.status,
        }
        .into());
    }

    tracing::debug!(issue_id = id, actor = %actor.email, "Issue content updated");
    Ok(Json(load_issue(&state, id).await?))
}

/// `DELETE /issues/{id}` - reporter (any status) or admin
pub async fn delete(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let actor = load_actor(&state, &current).await?;
    let existing = load_issue(&state, id).await?;
    gate(&state, Action::DeleteIssue, &actor, Resource::Issue(&existing))?;

    issue::delete(&state.pool, id).await?;

    audit_log!(
        "issue_deleted",
        issue_id = id,
        actor = actor.email.clone(),
        from = existing.status.as_str()
    );
    Ok(Json(true))
}

/// `PATCH /issues/upvote/{id}`
pub async fn upvote(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<UpvoteRequest>>,
) -> AppResult<Json<Issue>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    check_claimed_identity(&current, payload.user_email.as_deref())?;

    let actor = load_actor(&state, &current).await?;
    let existing = load_issue(&state, id).await?;
    gate(&state, Action::Upvote, &actor, Resource::Issue(&existing))?;

    if !issue::add_upvote(&state.pool, id, &actor.email, now_millis()).await? {
        return Err(Denial::AlreadyUpvoted.into());
    }

    Ok(Json(load_issue(&state, id).await?))
}

/// `PATCH /issues/boost/{id}`
///
/// Requires a recorded boost payment by the caller for this issue. Priority
/// and the timeline entry are written in one transaction.
pub async fn boost(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<BoostRequest>>,
) -> AppResult<Json<Issue>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    check_claimed_identity(&current, payload.user_email.as_deref())?;

    let actor = load_actor(&state, &current).await?;
    let existing = load_issue(&state, id).await?;
    gate(&state, Action::Boost, &actor, Resource::Issue(&existing))?;

    let paid = match payload.transaction_id.as_deref() {
        Some(tx) => payment::find_by_transaction(&state.pool, tx)
            .await?
            .is_some_and(|p| {
                p.purpose == PaymentPurpose::Boost
                    && p.issue_id == Some(id)
                    && p.email.eq_ignore_ascii_case(&actor.email)
            }),
        None => {
            payment::has_payment(&state.pool, &actor.email, PaymentPurpose::Boost, Some(id))
                .await?
        }
    };
    if !paid {
        return Err(AppError::with_message(
            ErrorCode::PaymentRequired,
            "Record the boost payment before boosting",
        ));
    }

    let message = boost_message(&actor.email);
    if !issue::boost(&state.pool, id, &message, &actor.email, now_millis()).await? {
        return Err(Denial::AlreadyHighPriority.into());
    }

    audit_log!(
        "issue_boosted",
        issue_id = id,
        actor = actor.email.clone(),
        from = existing.priority.as_str(),
        to = Priority::High.as_str()
    );
    Ok(Json(load_issue(&state, id).await?))
}

/// `PATCH /issues/assign/{id}` (admin)
pub async fn assign(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<Json<Issue>> {
    check_claimed_identity(&current, payload.admin_email.as_deref())?;

    let actor = load_actor(&state, &current).await?;
    let existing = load_issue(&state, id).await?;
    gate(&state, Action::AssignStaff, &actor, Resource::Issue(&existing))?;

    let staff_email = normalize_email(&payload.staff_email);
    if user::find_staff_by_email(&state.pool, &staff_email)
        .await?
        .is_none()
    {
        let code = match user::find_by_email(&state.pool, &staff_email).await? {
            Some(_) => ErrorCode::NotStaffAccount,
            None => ErrorCode::StaffNotFound,
        };
        return Err(AppError::new(code).with_detail("email", staff_email));
    }

    let message = assignment_message(&staff_email, &actor.email);
    let assigned =
        issue::assign(&state.pool, id, &staff_email, &message, &actor.email, now_millis()).await?;
    if !assigned {
        let fresh = load_issue(&state, id).await?;
        return Err(Denial::IssueAlreadyAssigned {
            staff: fresh.assigned_staff.unwrap_or_default(),
        }
        .into());
    }

    audit_log!(
        "issue_assigned",
        issue_id = id,
        actor = actor.email.clone(),
        staff = staff_email
    );
    Ok(Json(load_issue(&state, id).await?))
}

/// `PATCH /issues/status/{id}` - assignee staff or admin; rejection is admin-only
pub async fn update_status(
    State(state): State<ServerState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<Issue>> {
    check_claimed_identity(&current, payload.updated_by.as_deref())?;
    validate_optional_text(&payload.message, "message", MAX_NOTE_LEN)?;

    let actor = load_actor(&state, &current).await?;
    let existing = load_issue(&state, id).await?;
    let next = payload.new_status;
    gate(&state, Action::UpdateStatus(next), &actor, Resource::Issue(&existing))?;

    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| timeline_message(next, &actor.email));

    let moved = issue::update_status(
        &state.pool,
        id,
        existing.status,
        next,
        &message,
        &actor.email,
        now_millis(),
    )
    .await?;
    if !moved {
        let fresh = load_issue(&state, id).await?;
        return Err(Denial::InvalidStatusTransition {
            from: fresh.status,
            to: next,
        }
        .into());
    }

    audit_log!(
        "issue_status_changed",
        issue_id = id,
        actor = actor.email.clone(),
        from = existing.status.as_str(),
        to = next.as_str()
    );
    Ok(Json(load_issue(&state, id).await?))
}
