//! User Repository
//!
//! Citizens, staff and admins share one table keyed by normalized email.
//! `password_hash` never leaves this module except through [`find_credentials`].

use super::{RepoError, RepoResult};
use shared::models::{Role, StaffMember, StaffUpdate, User, UserCreate, UserUpdate};
use sqlx::SqlitePool;

const USER_COLUMNS: &str =
    "id, email, name, photo_url, role, is_blocked, is_premium, premium_at, phone, created_at";

const STAFF_COLUMNS: &str = "id, name, email, photo_url, phone, created_at";

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Newest first, optionally restricted to one role
pub async fn find_all(
    pool: &SqlitePool,
    role: Option<Role>,
    limit: Option<u32>,
) -> RepoResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE (?1 IS NULL OR role = ?1) \
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(limit.map(i64::from).unwrap_or(-1))
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Register a citizen unless the email is already known. Returns `(user, created)`.
pub async fn create_if_absent(
    pool: &SqlitePool,
    id: i64,
    email: &str,
    data: &UserCreate,
    now: i64,
) -> RepoResult<(User, bool)> {
    let rows = sqlx::query(
        "INSERT OR IGNORE INTO users (id, email, name, photo_url, role, created_at) \
         VALUES (?, ?, ?, ?, 'citizen', ?)",
    )
    .bind(id)
    .bind(email)
    .bind(data.name.trim())
    .bind(data.photo_url.as_deref())
    .bind(now)
    .execute(pool)
    .await?;

    let user = find_by_email(pool, email)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))?;
    Ok((user, rows.rows_affected() > 0))
}

pub async fn update_profile(pool: &SqlitePool, email: &str, data: &UserUpdate) -> RepoResult<User> {
    let rows = sqlx::query(
        "UPDATE users SET name = COALESCE(?1, name), photo_url = COALESCE(?2, photo_url) \
         WHERE email = ?3",
    )
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.photo_url.as_deref())
    .bind(email)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {email} not found")));
    }
    require(find_by_email(pool, email).await?, email)
}

pub async fn set_blocked(pool: &SqlitePool, email: &str, is_blocked: bool) -> RepoResult<User> {
    let rows = sqlx::query("UPDATE users SET is_blocked = ? WHERE email = ? AND role != 'admin'")
        .bind(is_blocked)
        .bind(email)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {email} not found")));
    }
    require(find_by_email(pool, email).await?, email)
}

/// One-way: premium is never revoked here. `false` if already premium.
pub async fn set_premium(pool: &SqlitePool, email: &str, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE users SET is_premium = 1, premium_at = ? WHERE email = ? AND is_premium = 0",
    )
    .bind(now)
    .bind(email)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// User plus stored password hash, for password login
pub async fn find_credentials(
    pool: &SqlitePool,
    email: &str,
) -> RepoResult<Option<(User, Option<String>)>> {
    let Some(user) = find_by_email(pool, email).await? else {
        return Ok(None);
    };
    let hash = sqlx::query_scalar::<_, Option<String>>(
        "SELECT password_hash FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(Some((user, hash)))
}

/// Create or promote the bootstrap admin account
pub async fn upsert_admin(
    pool: &SqlitePool,
    id: i64,
    email: &str,
    password_hash: &str,
    now: i64,
) -> RepoResult<User> {
    sqlx::query(
        "INSERT INTO users (id, email, name, role, password_hash, created_at) \
         VALUES (?1, ?2, 'Administrator', 'admin', ?3, ?4) \
         ON CONFLICT(email) DO UPDATE SET role = 'admin', is_blocked = 0, password_hash = ?3",
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await?;
    require(find_by_email(pool, email).await?, email)
}

// ── Staff ───────────────────────────────────────────────────────────

pub async fn find_all_staff(pool: &SqlitePool) -> RepoResult<Vec<StaffMember>> {
    let staff = sqlx::query_as::<_, StaffMember>(&format!(
        "SELECT {STAFF_COLUMNS} FROM users WHERE role = 'staff' ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(staff)
}

pub async fn find_staff_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<StaffMember>> {
    let staff = sqlx::query_as::<_, StaffMember>(&format!(
        "SELECT {STAFF_COLUMNS} FROM users WHERE id = ? AND role = 'staff'"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(staff)
}

pub async fn find_staff_by_email(
    pool: &SqlitePool,
    email: &str,
) -> RepoResult<Option<StaffMember>> {
    let staff = sqlx::query_as::<_, StaffMember>(&format!(
        "SELECT {STAFF_COLUMNS} FROM users WHERE email = ? AND role = 'staff'"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(staff)
}

pub struct NewStaff<'a> {
    pub id: i64,
    pub email: &'a str,
    pub name: &'a str,
    pub photo_url: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub now: i64,
}

/// Duplicate email -> [`RepoError::Duplicate`]
pub async fn create_staff(pool: &SqlitePool, staff: NewStaff<'_>) -> RepoResult<StaffMember> {
    sqlx::query(
        "INSERT INTO users (id, email, name, photo_url, role, phone, password_hash, created_at) \
         VALUES (?, ?, ?, ?, 'staff', ?, ?, ?)",
    )
    .bind(staff.id)
    .bind(staff.email)
    .bind(staff.name.trim())
    .bind(staff.photo_url)
    .bind(staff.phone)
    .bind(staff.password_hash)
    .bind(staff.now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("Email {} is already registered", staff.email))
        }
        other => other,
    })?;

    find_staff_by_id(pool, staff.id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create staff".into()))
}

pub async fn update_staff(
    pool: &SqlitePool,
    id: i64,
    data: &StaffUpdate,
    password_hash: Option<&str>,
) -> RepoResult<StaffMember> {
    let rows = sqlx::query(
        "UPDATE users SET name = COALESCE(?1, name), photo_url = COALESCE(?2, photo_url), \
         phone = COALESCE(?3, phone), password_hash = COALESCE(?4, password_hash) \
         WHERE id = ?5 AND role = 'staff'",
    )
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.photo_url.as_deref())
    .bind(data.phone.as_deref())
    .bind(password_hash)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Staff {id} not found")));
    }
    find_staff_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Staff {id} not found")))
}

/// Delete a staff account; its assigned issues go back to unassigned
pub async fn delete_staff(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<StaffMember> {
    let staff = find_staff_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Staff {id} not found")))?;

    let mut tx = pool.begin().await?;
    let released = super::issue::release_assignments(&mut tx, &staff.email, now).await?;
    sqlx::query("DELETE FROM users WHERE id = ? AND role = 'staff'")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(staff = %staff.email, released, "Staff account deleted");
    Ok(staff)
}

fn require(user: Option<User>, email: &str) -> RepoResult<User> {
    user.ok_or_else(|| RepoError::NotFound(format!("User {email} not found")))
}
