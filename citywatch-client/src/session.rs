//! Session store
//!
//! One process-wide session. Consumers read snapshots or subscribe to
//! changes; only the store's own operations replace the state.
//!
//! A `LocallyCached` session is restored from disk without a live sign-in.
//! It can read and perform ordinary actions, but anything that moves money
//! needs a fresh `Authenticated` session. Cached sessions expire.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::User;
use shared::{Action, Actor, Denial};
use tokio::sync::watch;

use crate::ClientResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    /// Signed in during this run
    Authenticated { identity: User, token: String },
    /// Restored from the cached blob
    LocallyCached {
        identity: User,
        token: String,
        cached_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
    Anonymous,
}

impl Session {
    pub fn identity(&self) -> Option<&User> {
        match self {
            Self::Authenticated { identity, .. } | Self::LocallyCached { identity, .. } => {
                Some(identity)
            }
            Self::Anonymous => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { token, .. } | Self::LocallyCached { token, .. } => Some(token),
            Self::Anonymous => None,
        }
    }

    pub fn actor(&self) -> Option<Actor> {
        self.identity().map(Actor::from)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self, Self::LocallyCached { expires_at, .. } if *expires_at <= now)
    }

    /// Which session states may attempt `action` at all
    pub fn permits(&self, action: Action) -> Result<(), Denial> {
        match self {
            Self::Anonymous => Err(Denial::NotAuthenticated),
            Self::LocallyCached { .. } if action.moves_money() => Err(Denial::SessionNotVerified),
            _ => Ok(()),
        }
    }
}

/// On-disk form of a cached session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub identity: User,
    pub token: String,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<CachedSession> for Session {
    fn from(cached: CachedSession) -> Self {
        Session::LocallyCached {
            identity: cached.identity,
            token: cached.token,
            cached_at: cached.cached_at,
            expires_at: cached.expires_at,
        }
    }
}

/// JSON file holding the cached identity blob
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ClientResult<Option<CachedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, cached: &CachedSession) -> ClientResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(cached)?)?;
        Ok(())
    }

    pub fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Shared session state; clones observe the same session
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<watch::Sender<Session>>,
    storage: Option<SessionStorage>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration, storage: Option<SessionStorage>) -> Self {
        let (tx, _) = watch::channel(Session::Anonymous);
        Self {
            inner: Arc::new(tx),
            storage,
            ttl,
        }
    }

    /// Pick up a cached session left by a previous run
    pub fn restore(&self) -> ClientResult<Session> {
        let Some(storage) = &self.storage else {
            return Ok(self.snapshot());
        };
        match storage.load() {
            Ok(Some(cached)) if cached.expires_at > Utc::now() => {
                tracing::debug!(email = %cached.identity.email, "Restored cached session");
                self.replace(cached.into());
            }
            Ok(Some(_)) => {
                tracing::debug!("Cached session expired, purging");
                storage.clear()?;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable cached session, purging");
                storage.clear()?;
            }
        }
        Ok(self.snapshot())
    }

    /// Live sign-in; also refreshes the cached blob
    pub fn login(&self, identity: User, token: String) -> ClientResult<()> {
        if let Some(storage) = &self.storage {
            storage.save(&self.cache(identity.clone(), token.clone()))?;
        }
        self.replace(Session::Authenticated { identity, token });
        Ok(())
    }

    /// Session from an identity blob without a live sign-in
    pub fn login_cached(&self, identity: User, token: String) -> ClientResult<()> {
        let cached = self.cache(identity, token);
        if let Some(storage) = &self.storage {
            storage.save(&cached)?;
        }
        self.replace(cached.into());
        Ok(())
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.replace(Session::Anonymous);
        if let Some(storage) = &self.storage {
            storage.clear()?;
        }
        Ok(())
    }

    /// Swap in a freshly fetched identity, keeping the session kind
    pub fn refresh(&self, identity: User) {
        self.inner.send_if_modified(|session| match session {
            Session::Authenticated { identity: old, .. }
            | Session::LocallyCached { identity: old, .. } => {
                let changed = *old != identity;
                *old = identity;
                changed
            }
            Session::Anonymous => false,
        });
    }

    /// Current session; an expired cached session reads as anonymous
    pub fn snapshot(&self) -> Session {
        let session = self.inner.borrow().clone();
        if session.is_expired_at(Utc::now()) {
            tracing::debug!("Cached session expired");
            self.replace(Session::Anonymous);
            if let Some(storage) = &self.storage
                && let Err(e) = storage.clear()
            {
                tracing::warn!(error = %e, "Failed to purge expired session");
            }
            return Session::Anonymous;
        }
        session
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.subscribe()
    }

    fn cache(&self, identity: User, token: String) -> CachedSession {
        let cached_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        CachedSession {
            identity,
            token,
            cached_at,
            expires_at: cached_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    fn replace(&self, session: Session) {
        self.inner.send_replace(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    fn citizen(email: &str) -> User {
        User {
            id: 1,
            email: email.into(),
            name: "Citizen".into(),
            photo_url: None,
            role: Role::Citizen,
            is_blocked: false,
            is_premium: false,
            premium_at: None,
            phone: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_session_rules() {
        let anonymous = Session::Anonymous;
        assert_eq!(anonymous.permits(Action::Upvote), Err(Denial::NotAuthenticated));

        let cached = Session::LocallyCached {
            identity: citizen("c@city.test"),
            token: "t".into(),
            cached_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        };
        assert_eq!(cached.permits(Action::CreateIssue), Ok(()));
        assert_eq!(cached.permits(Action::Boost), Err(Denial::SessionNotVerified));
        assert_eq!(cached.permits(Action::Subscribe), Err(Denial::SessionNotVerified));

        let live = Session::Authenticated {
            identity: citizen("c@city.test"),
            token: "t".into(),
        };
        assert_eq!(live.permits(Action::Boost), Ok(()));
        assert_eq!(live.actor().map(|a| a.email), Some("c@city.test".into()));
    }

    #[test]
    fn test_expired_cached_session_reads_anonymous() {
        let store = SessionStore::new(Duration::ZERO, None);
        store
            .login_cached(citizen("c@city.test"), "t".into())
            .expect("no storage");
        assert_eq!(store.snapshot(), Session::Anonymous);
    }

    #[test]
    fn test_storage_round_trip_and_purge() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");
        let store = SessionStore::new(
            Duration::from_secs(3600),
            Some(SessionStorage::new(&path)),
        );
        store
            .login(citizen("c@city.test"), "live-token".into())
            .expect("save");
        assert!(path.exists());

        // A new process only has the blob
        let restarted = SessionStore::new(
            Duration::from_secs(3600),
            Some(SessionStorage::new(&path)),
        );
        let session = restarted.restore().expect("restore");
        assert!(matches!(session, Session::LocallyCached { .. }));
        assert_eq!(session.token(), Some("live-token"));

        restarted.logout().expect("logout");
        assert!(!path.exists());
        assert_eq!(restarted.snapshot(), Session::Anonymous);
    }

    #[test]
    fn test_restore_purges_expired_blob() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let storage = SessionStorage::new(&path);
        storage
            .save(&CachedSession {
                identity: citizen("old@city.test"),
                token: "t".into(),
                cached_at: Utc::now() - chrono::Duration::days(8),
                expires_at: Utc::now() - chrono::Duration::days(1),
            })
            .expect("save");

        let store = SessionStore::new(Duration::from_secs(60), Some(storage));
        assert_eq!(store.restore().expect("restore"), Session::Anonymous);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_observers_see_changes() {
        let store = SessionStore::new(Duration::from_secs(60), None);
        let mut rx = store.subscribe();

        store
            .login(citizen("c@city.test"), "t".into())
            .expect("login");
        rx.changed().await.expect("sender alive");
        assert!(matches!(*rx.borrow(), Session::Authenticated { .. }));

        let mut premium = citizen("c@city.test");
        premium.is_premium = true;
        store.refresh(premium);
        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().identity().map(|u| u.is_premium), Some(true));

        store.logout().expect("logout");
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow(), Session::Anonymous);
    }
}
