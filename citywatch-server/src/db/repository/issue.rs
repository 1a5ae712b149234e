//! Issue Repository
//!
//! Issues with their upvotes and timeline. Every state-changing write is a
//! compare-and-set on the column it changes, so a concurrent writer that got
//! there first turns the second write into a no-op (`Ok(false)`).

use std::collections::HashMap;

use super::{RepoError, RepoResult};
use shared::lifecycle::timeline_message;
use shared::models::{
    Issue, IssueCategory, IssueCreate, IssueStatus, IssueUpdate, Priority, TimelineEntry,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

const ISSUE_COLUMNS: &str = "id, title, description, category, location, image, status, priority, \
     user_email, assigned_staff, created_at, updated_at";

/// Relation lookups are chunked to stay under SQLite's bind limit
const RELATION_CHUNK: usize = 500;

/// List filters (`GET /issues` and the per-user listings)
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub search: Option<String>,
    pub status: Option<IssueStatus>,
    pub category: Option<IssueCategory>,
    pub priority: Option<Priority>,
    pub user_email: Option<String>,
    pub assigned_staff: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UpvoteRow {
    issue_id: i64,
    email: String,
}

#[derive(sqlx::FromRow)]
struct TimelineRow {
    issue_id: i64,
    #[sqlx(flatten)]
    entry: TimelineEntry,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match issue {
        Some(issue) => {
            let mut issues = vec![issue];
            attach_relations(pool, &mut issues).await?;
            Ok(issues.pop())
        }
        None => Ok(None),
    }
}

/// One page, newest first, plus the total matching the filter
pub async fn find_page(
    pool: &SqlitePool,
    filter: &IssueFilter,
    limit: u32,
    offset: u64,
) -> RepoResult<(Vec<Issue>, i64)> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM issues WHERE 1 = 1");
    push_filters(&mut count_query, filter);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query =
        QueryBuilder::<Sqlite>::new(format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1 = 1"));
    push_filters(&mut query, filter);
    query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(offset as i64);

    let mut issues = query.build_query_as::<Issue>().fetch_all(pool).await?;
    attach_relations(pool, &mut issues).await?;
    Ok((issues, total))
}

/// Every issue matching the filter, newest first
pub async fn find_all(pool: &SqlitePool, filter: &IssueFilter) -> RepoResult<Vec<Issue>> {
    let mut query =
        QueryBuilder::<Sqlite>::new(format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1 = 1"));
    push_filters(&mut query, filter);
    query.push(" ORDER BY created_at DESC, id DESC");

    let mut issues = query.build_query_as::<Issue>().fetch_all(pool).await?;
    attach_relations(pool, &mut issues).await?;
    Ok(issues)
}

pub async fn count_by_reporter(pool: &SqlitePool, email: &str) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM issues WHERE user_email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert a pending / normal issue with its first timeline entry.
///
/// With a `cap`, the insert only happens while the reporter holds fewer
/// than `cap` issues; the count and the insert are one statement. `None`
/// means the cap was reached.
pub async fn create(
    pool: &SqlitePool,
    id: i64,
    data: IssueCreate,
    reporter: &str,
    cap: Option<usize>,
    now: i64,
) -> RepoResult<Option<Issue>> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO issues (id, title, description, category, location, image, status, priority, \
         user_email, assigned_staff, created_at, updated_at) \
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?10 \
         WHERE ?11 IS NULL OR (SELECT COUNT(*) FROM issues WHERE user_email = ?9) < ?11",
    )
    .bind(id)
    .bind(data.title.trim())
    .bind(data.description.trim())
    .bind(data.category.as_str())
    .bind(data.location.trim())
    .bind(data.image.as_deref().filter(|s| !s.trim().is_empty()))
    .bind(IssueStatus::INITIAL.as_str())
    .bind(Priority::Normal.as_str())
    .bind(reporter)
    .bind(now)
    .bind(cap.map(|c| i64::try_from(c).unwrap_or(i64::MAX)))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    append_timeline(
        &mut tx,
        id,
        IssueStatus::INITIAL,
        &timeline_message(IssueStatus::INITIAL, reporter),
        reporter,
        now,
    )
    .await?;

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .map(Some)
        .ok_or_else(|| RepoError::Database("Failed to create issue".into()))
}

/// Replace content fields of a still-pending issue. Timeline untouched.
pub async fn update_content(
    pool: &SqlitePool,
    id: i64,
    data: IssueUpdate,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE issues SET title = COALESCE(?1, title), description = COALESCE(?2, description), \
         category = COALESCE(?3, category), location = COALESCE(?4, location), \
         image = COALESCE(?5, image), updated_at = ?6 \
         WHERE id = ?7 AND status = 'pending'",
    )
    .bind(data.title.as_deref().map(str::trim))
    .bind(data.description.as_deref().map(str::trim))
    .bind(data.category.map(|c| c.as_str()))
    .bind(data.location.as_deref().map(str::trim))
    .bind(data.image.as_deref())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Removes the issue; upvotes and timeline cascade
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let rows = sqlx::query("DELETE FROM issues WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Issue {id} not found")));
    }
    Ok(())
}

/// `false` when the voter had already upvoted
pub async fn add_upvote(pool: &SqlitePool, id: i64, email: &str, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "INSERT OR IGNORE INTO issue_upvotes (issue_id, email, created_at) VALUES (?, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// normal -> high plus timeline entry, atomically. `false` if already high.
pub async fn boost(
    pool: &SqlitePool,
    id: i64,
    message: &str,
    actor: &str,
    now: i64,
) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    let status = sqlx::query_scalar::<_, IssueStatus>(
        "UPDATE issues SET priority = 'high', updated_at = ? \
         WHERE id = ? AND priority != 'high' RETURNING status",
    )
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(status) = status else {
        return Ok(false);
    };

    append_timeline(&mut tx, id, status, message, actor, now).await?;
    tx.commit().await?;
    Ok(true)
}

/// Set the assignee if none. `false` if someone else got there first.
pub async fn assign(
    pool: &SqlitePool,
    id: i64,
    staff_email: &str,
    message: &str,
    actor: &str,
    now: i64,
) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    let status = sqlx::query_scalar::<_, IssueStatus>(
        "UPDATE issues SET assigned_staff = ?, updated_at = ? \
         WHERE id = ? AND assigned_staff IS NULL RETURNING status",
    )
    .bind(staff_email)
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(status) = status else {
        return Ok(false);
    };

    append_timeline(&mut tx, id, status, message, actor, now).await?;
    tx.commit().await?;
    Ok(true)
}

/// Move `from -> to`. `false` if the status changed underneath.
pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    from: IssueStatus,
    to: IssueStatus,
    message: &str,
    actor: &str,
    now: i64,
) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query("UPDATE issues SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(to.as_str())
        .bind(now)
        .bind(id)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;
    if rows.rows_affected() == 0 {
        return Ok(false);
    }

    append_timeline(&mut tx, id, to, message, actor, now).await?;
    tx.commit().await?;
    Ok(true)
}

/// Hand a staff member's open issues back to the unassigned pool
pub async fn release_assignments(
    conn: &mut SqliteConnection,
    staff_email: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE issues SET assigned_staff = NULL, updated_at = ? WHERE assigned_staff = ?",
    )
    .bind(now)
    .bind(staff_email)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Timestamps on one issue's timeline are strictly increasing
async fn append_timeline(
    conn: &mut SqliteConnection,
    issue_id: i64,
    status: IssueStatus,
    message: &str,
    updated_by: &str,
    now: i64,
) -> RepoResult<()> {
    let last =
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(timestamp) FROM issue_timeline WHERE issue_id = ?")
            .bind(issue_id)
            .fetch_one(&mut *conn)
            .await?;
    let timestamp = match last {
        Some(last) if last >= now => last + 1,
        _ => now,
    };

    sqlx::query(
        "INSERT INTO issue_timeline (issue_id, status, message, updated_by, timestamp) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(issue_id)
    .bind(status.as_str())
    .bind(message)
    .bind(updated_by)
    .bind(timestamp)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &IssueFilter) {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR location LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = filter.category {
        query.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(priority) = filter.priority {
        query.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(email) = &filter.user_email {
        query.push(" AND user_email = ").push_bind(email.clone());
    }
    if let Some(email) = &filter.assigned_staff {
        query.push(" AND assigned_staff = ").push_bind(email.clone());
    }
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Load upvotes and timeline for a batch of issues
async fn attach_relations(pool: &SqlitePool, issues: &mut [Issue]) -> RepoResult<()> {
    if issues.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = issues.iter().map(|i| i.id).collect();

    let mut upvotes: HashMap<i64, Vec<String>> = HashMap::new();
    let mut timelines: HashMap<i64, Vec<TimelineEntry>> = HashMap::new();

    for chunk in ids.chunks(RELATION_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT issue_id, email FROM issue_upvotes WHERE issue_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        query.push(") ORDER BY created_at, email");
        for row in query.build_query_as::<UpvoteRow>().fetch_all(pool).await? {
            upvotes.entry(row.issue_id).or_default().push(row.email);
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT issue_id, status, message, updated_by, timestamp FROM issue_timeline WHERE issue_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        query.push(") ORDER BY issue_id, id");
        for row in query.build_query_as::<TimelineRow>().fetch_all(pool).await? {
            timelines.entry(row.issue_id).or_default().push(row.entry);
        }
    }

    for issue in issues.iter_mut() {
        issue.upvotes = upvotes.remove(&issue.id).unwrap_or_default();
        issue.timeline = timelines.remove(&issue.id).unwrap_or_default();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Main St"), "Main St");
    }
}
