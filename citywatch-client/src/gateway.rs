//! Transition Gateway
//!
//! Every state-changing call runs the session rule and the role gate against
//! the current snapshot first. A refusal returns [`ClientError::Denied`]
//! without touching the network. Nothing is mutated locally: callers take
//! the record the server returns.

use std::future::Future;

use http::Method;
use shared::models::{
    AssignRequest, BoostRequest, Invoice, Issue, IssueCreate, IssueListResponse, IssueQuery,
    IssueStatus, IssueUpdate, LoginRequest, LoginResponse, Payment, PaymentCreate,
    PaymentIntentRequest, PaymentIntentResponse, PaymentPurpose, Role, RoleResponse, StaffCreate,
    StaffMember, StatusUpdateRequest, TokenRequest, TokenResponse, UpvoteRequest, User,
    UserCreate,
};
use shared::stats::{AdminStats, CitizenStats, PublicStats, StaffStats};
use shared::{Action, Actor, Denial, GatePolicy, Resource};

use crate::http::{HttpClient, NetworkHttpClient, path_segment};
use crate::session::{Session, SessionStorage, SessionStore};
use crate::{ClientConfig, ClientError, ClientResult};

pub struct Gateway<C = NetworkHttpClient> {
    http: C,
    session: SessionStore,
    policy: GatePolicy,
}

impl Gateway<NetworkHttpClient> {
    /// Build from configuration, restore any cached session, and adopt
    /// `config.token` when one is given
    pub async fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let http = NetworkHttpClient::new(&config.base_url, config.timeout)?;
        let storage = config.session_path.clone().map(SessionStorage::new);
        let session = SessionStore::new(config.session_ttl, storage);
        session.restore()?;

        let gateway = Self::new(http, session);
        if let Some(token) = &config.token {
            gateway.sign_in_with_token(token).await?;
        }
        Ok(gateway)
    }
}

impl<C: HttpClient> Gateway<C> {
    pub fn new(http: C, session: SessionStore) -> Self {
        Self {
            http,
            session,
            policy: GatePolicy::default(),
        }
    }

    /// Use the server's gate parameters (e.g. a different free-tier limit)
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    // ========== Gate ==========

    /// Session rule, then role gate. Returns the snapshot the call should use.
    pub fn authorize(&self, action: Action, resource: Resource<'_>) -> ClientResult<Session> {
        let session = self.session.snapshot();
        let actor = session.actor();
        let verdict = session
            .permits(action)
            .and_then(|()| self.policy.check(action, actor.as_ref(), resource));

        match verdict {
            Ok(()) => Ok(session),
            Err(denial) => {
                tracing::warn!(
                    action = action.name(),
                    email = actor.as_ref().map(|a| a.email.as_str()).unwrap_or("anonymous"),
                    reason = %denial,
                    "Action refused locally"
                );
                Err(denial.into())
            }
        }
    }

    /// Issue actions to offer for `issue` right now
    pub fn allowed_actions(&self, issue: &Issue) -> Vec<Action> {
        let session = self.session.snapshot();
        let actor = session.actor();
        self.policy
            .allowed_actions(actor.as_ref(), issue)
            .into_iter()
            .filter(|action| session.permits(*action).is_ok())
            .collect()
    }

    /// Current actor, for callers that render role-specific views
    pub fn actor(&self) -> Option<Actor> {
        self.session.snapshot().actor()
    }

    async fn call<T, F>(&self, name: &'static str, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        tracing::debug!(call = name, "Gateway call");
        let result = fut.await;
        if let Err(e) = &result {
            tracing::warn!(call = name, error = %e, "Gateway call failed");
        }
        result
    }

    fn token(&self) -> Option<String> {
        self.session.snapshot().token().map(str::to_string)
    }

    fn signed_in(&self) -> ClientResult<Session> {
        let session = self.session.snapshot();
        match session {
            Session::Anonymous => Err(Denial::NotAuthenticated.into()),
            _ => Ok(session),
        }
    }

    // ========== Session ==========

    /// Register (if new) and sign in a citizen whose email the identity
    /// provider has already verified
    pub async fn sign_in(&self, email: &str, name: &str) -> ClientResult<User> {
        self.call("sign_in", async {
            let user: User = self
                .http
                .post(
                    "/users",
                    None,
                    &UserCreate {
                        email: email.to_string(),
                        name: name.to_string(),
                        photo_url: None,
                    },
                )
                .await?;
            let token: TokenResponse = self
                .http
                .post(
                    "/jwt",
                    None,
                    &TokenRequest {
                        email: user.email.clone(),
                    },
                )
                .await?;
            self.session.login(user.clone(), token.token)?;
            Ok(user)
        })
        .await
    }

    /// Password sign-in for staff and admin accounts
    pub async fn password_login(&self, email: &str, password: &str) -> ClientResult<User> {
        self.call("password_login", async {
            let response: LoginResponse = self
                .http
                .post(
                    "/auth/login",
                    None,
                    &LoginRequest {
                        email: email.to_string(),
                        password: password.to_string(),
                    },
                )
                .await?;
            self.session.login(response.user.clone(), response.token)?;
            Ok(response.user)
        })
        .await
    }

    /// Adopt an existing token
    pub async fn sign_in_with_token(&self, token: &str) -> ClientResult<User> {
        self.call("sign_in_with_token", async {
            let user: User = self.http.get("/auth/me", Some(token)).await?;
            self.session.login(user.clone(), token.to_string())?;
            Ok(user)
        })
        .await
    }

    pub fn sign_out(&self) -> ClientResult<()> {
        self.session.logout()
    }

    /// Re-read the signed-in account (block / premium flags) into the session
    pub async fn refresh_identity(&self) -> ClientResult<User> {
        let session = self.signed_in()?;
        let email = session.identity().map(|u| u.email.clone()).unwrap_or_default();
        self.call("refresh_identity", async {
            let user: User = self
                .http
                .get(&format!("/users/{}", path_segment(&email)), session.token())
                .await?;
            self.session.refresh(user.clone());
            Ok(user)
        })
        .await
    }

    // ========== Reads ==========

    pub async fn list_issues(&self, query: &IssueQuery) -> ClientResult<IssueListResponse> {
        let token = self.token();
        self.call("list_issues", self.http.get_query("/issues", token.as_deref(), query))
            .await
    }

    pub async fn issue(&self, id: i64) -> ClientResult<Issue> {
        self.call("issue", self.http.get(&format!("/issues/{id}"), None))
            .await
    }

    pub async fn role_of(&self, email: &str) -> ClientResult<Role> {
        let path = format!("/users/role/{}", path_segment(email));
        let response: RoleResponse = self.call("role_of", self.http.get(&path, None)).await?;
        Ok(response.role)
    }

    pub async fn users(&self, limit: Option<u32>) -> ClientResult<Vec<User>> {
        let token = self.token();
        let path = match limit {
            Some(limit) => format!("/users?limit={limit}"),
            None => "/users".to_string(),
        };
        self.call("users", self.http.get(&path, token.as_deref())).await
    }

    /// Issues reported by the signed-in citizen
    pub async fn my_issues(&self) -> ClientResult<Vec<Issue>> {
        let session = self.signed_in()?;
        let email = session.identity().map(|u| u.email.as_str()).unwrap_or_default();
        self.call(
            "my_issues",
            self.http
                .get(&format!("/citizen/issues/{}", path_segment(email)), session.token()),
        )
        .await
    }

    pub async fn citizen_stats(&self, email: &str) -> ClientResult<CitizenStats> {
        let token = self.token();
        let path = format!("/citizen/stats/{}", path_segment(email));
        self.call("citizen_stats", self.http.get(&path, token.as_deref()))
            .await
    }

    pub async fn public_stats(&self) -> ClientResult<PublicStats> {
        self.call("public_stats", self.http.get("/public-stats", None))
            .await
    }

    pub async fn admin_stats(&self) -> ClientResult<AdminStats> {
        let token = self.token();
        self.call("admin_stats", self.http.get("/admin/stats", token.as_deref()))
            .await
    }

    pub async fn staff_members(&self) -> ClientResult<Vec<StaffMember>> {
        let token = self.token();
        self.call("staff_members", self.http.get("/staff", token.as_deref()))
            .await
    }

    pub async fn assigned_issues(&self, staff_email: &str) -> ClientResult<Vec<Issue>> {
        let token = self.token();
        let path = format!("/staff/{}/issues", path_segment(staff_email));
        self.call("assigned_issues", self.http.get(&path, token.as_deref()))
            .await
    }

    pub async fn staff_stats(&self, staff_email: &str) -> ClientResult<StaffStats> {
        let token = self.token();
        let path = format!("/staff/{}/stats", path_segment(staff_email));
        self.call("staff_stats", self.http.get(&path, token.as_deref()))
            .await
    }

    pub async fn payments(&self, limit: Option<u32>) -> ClientResult<Vec<Payment>> {
        let token = self.token();
        let path = match limit {
            Some(limit) => format!("/payments?limit={limit}"),
            None => "/payments".to_string(),
        };
        self.call("payments", self.http.get(&path, token.as_deref()))
            .await
    }

    pub async fn invoice(&self, transaction_id: &str) -> ClientResult<Invoice> {
        let token = self.token();
        let path = format!("/payments/{}/invoice", path_segment(transaction_id));
        self.call("invoice", self.http.get(&path, token.as_deref()))
            .await
    }

    // ========== Transitions ==========

    /// The reporter's current issue count is read first so the free-tier
    /// limit can be checked before anything is written
    pub async fn create_issue(&self, mut payload: IssueCreate) -> ClientResult<Issue> {
        let session = self.signed_in()?;
        let existing_count = match session.actor() {
            Some(actor) if actor.role == Role::Citizen && !actor.is_premium => {
                self.issue_count(&actor.email).await?
            }
            _ => 0,
        };
        let session = self.authorize(Action::CreateIssue, Resource::NewIssue { existing_count })?;
        payload.user_email = session.identity().map(|u| u.email.clone());

        self.call("create_issue", self.http.post("/issues", session.token(), &payload))
            .await
    }

    async fn issue_count(&self, email: &str) -> ClientResult<usize> {
        let query = IssueQuery {
            limit: Some(1),
            user_email: Some(email.to_string()),
            ..Default::default()
        };
        let page = self.list_issues(&query).await?;
        Ok(usize::try_from(page.total_count).unwrap_or(0))
    }

    pub async fn edit_issue(&self, issue: &Issue, update: &IssueUpdate) -> ClientResult<Issue> {
        let session = self.authorize(Action::EditIssue, Resource::Issue(issue))?;
        self.call(
            "edit_issue",
            self.http
                .put(&format!("/issues/{}", issue.id), session.token(), update),
        )
        .await
    }

    pub async fn delete_issue(&self, issue: &Issue) -> ClientResult<bool> {
        let session = self.authorize(Action::DeleteIssue, Resource::Issue(issue))?;
        self.call(
            "delete_issue",
            self.http
                .delete(&format!("/issues/{}", issue.id), session.token()),
        )
        .await
    }

    pub async fn upvote(&self, issue: &Issue) -> ClientResult<Issue> {
        let session = self.authorize(Action::Upvote, Resource::Issue(issue))?;
        let body = UpvoteRequest {
            user_email: session.identity().map(|u| u.email.clone()),
        };
        self.call(
            "upvote",
            self.http
                .patch(&format!("/issues/upvote/{}", issue.id), session.token(), &body),
        )
        .await
    }

    /// Needs a recorded boost payment; see [`Gateway::boost_with_payment`]
    pub async fn boost(&self, issue: &Issue, transaction_id: Option<&str>) -> ClientResult<Issue> {
        let session = self.authorize(Action::Boost, Resource::Issue(issue))?;
        let body = BoostRequest {
            user_email: session.identity().map(|u| u.email.clone()),
            transaction_id: transaction_id.map(str::to_string),
        };
        self.call(
            "boost",
            self.http
                .patch(&format!("/issues/boost/{}", issue.id), session.token(), &body),
        )
        .await
    }

    pub async fn assign_staff(&self, issue: &Issue, staff_email: &str) -> ClientResult<Issue> {
        let session = self.authorize(Action::AssignStaff, Resource::Issue(issue))?;
        let body = AssignRequest {
            staff_email: staff_email.to_string(),
            admin_email: session.identity().map(|u| u.email.clone()),
        };
        self.call(
            "assign_staff",
            self.http
                .patch(&format!("/issues/assign/{}", issue.id), session.token(), &body),
        )
        .await
    }

    pub async fn reject(&self, issue: &Issue, message: Option<String>) -> ClientResult<Issue> {
        let session = self.authorize(Action::Reject, Resource::Issue(issue))?;
        self.send_status(&session, issue, IssueStatus::Rejected, message)
            .await
    }

    pub async fn update_status(
        &self,
        issue: &Issue,
        next: IssueStatus,
        message: Option<String>,
    ) -> ClientResult<Issue> {
        let session = self.authorize(Action::UpdateStatus(next), Resource::Issue(issue))?;
        self.send_status(&session, issue, next, message).await
    }

    async fn send_status(
        &self,
        session: &Session,
        issue: &Issue,
        next: IssueStatus,
        message: Option<String>,
    ) -> ClientResult<Issue> {
        let body = StatusUpdateRequest {
            new_status: next,
            updated_by: session.identity().map(|u| u.email.clone()),
            message,
        };
        self.call(
            "update_status",
            self.http
                .patch(&format!("/issues/status/{}", issue.id), session.token(), &body),
        )
        .await
    }

    pub async fn set_blocked(&self, target: &User, is_blocked: bool) -> ClientResult<User> {
        let action = if is_blocked {
            Action::BlockUser
        } else {
            Action::UnblockUser
        };
        let session = self.authorize(action, Resource::User(target))?;
        self.call(
            "set_blocked",
            self.http.patch(
                &format!("/users/block/{}", path_segment(&target.email)),
                session.token(),
                &shared::models::BlockRequest { is_blocked },
            ),
        )
        .await
    }

    /// Needs a recorded subscription payment; see
    /// [`Gateway::subscribe_with_payment`]
    pub async fn subscribe(&self) -> ClientResult<User> {
        let session = self.signed_in()?;
        let account = session.identity().cloned().ok_or(Denial::NotAuthenticated)?;
        let session = self.authorize(Action::Subscribe, Resource::Account(&account))?;
        let user: User = self
            .call(
                "subscribe",
                self.http.request::<User, ()>(
                    Method::PATCH,
                    &format!("/users/premium/{}", path_segment(&account.email)),
                    session.token(),
                    None,
                ),
            )
            .await?;
        self.session.refresh(user.clone());
        Ok(user)
    }

    pub async fn create_staff(&self, staff: &StaffCreate) -> ClientResult<StaffMember> {
        let token = self.token();
        self.call("create_staff", self.http.post("/staff", token.as_deref(), staff))
            .await
    }

    // ========== Payments ==========

    /// Money moves only from a live session
    pub async fn create_payment_intent(
        &self,
        price: f64,
        purpose: PaymentPurpose,
    ) -> ClientResult<PaymentIntentResponse> {
        let session = self.verified_for(purpose)?;
        self.call(
            "create_payment_intent",
            self.http.post(
                "/create-payment-intent",
                session.token(),
                &PaymentIntentRequest { price, purpose },
            ),
        )
        .await
    }

    pub async fn record_payment(&self, payment: &PaymentCreate) -> ClientResult<Payment> {
        let session = self.verified_for(payment.purpose)?;
        self.call("record_payment", self.http.post("/payments", session.token(), payment))
            .await
    }

    fn verified_for(&self, purpose: PaymentPurpose) -> ClientResult<Session> {
        let action = match purpose {
            PaymentPurpose::Boost => Action::Boost,
            PaymentPurpose::Subscription => Action::Subscribe,
        };
        let session = self.session.snapshot();
        session.permits(action)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use shared::models::{IssueCategory, Priority};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every request and answers with a fixed JSON value
    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(Method, String)>>,
        reply: serde_json::Value,
    }

    impl RecordingClient {
        fn calls(&self) -> Vec<(Method, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn request<T, B>(
            &self,
            method: Method,
            path: &str,
            _token: Option<&str>,
            _body: Option<&B>,
        ) -> ClientResult<T>
        where
            T: DeserializeOwned,
            B: Serialize + Sync,
        {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((method, path.to_string()));
            }
            Ok(serde_json::from_value(self.reply.clone())?)
        }

        async fn get_query<T, Q>(&self, path: &str, token: Option<&str>, _query: &Q) -> ClientResult<T>
        where
            T: DeserializeOwned,
            Q: Serialize + Sync,
        {
            self.request::<T, ()>(Method::GET, path, token, None).await
        }
    }

    fn user(email: &str, role: Role) -> User {
        User {
            id: 1,
            email: email.into(),
            name: email.into(),
            photo_url: None,
            role,
            is_blocked: false,
            is_premium: false,
            premium_at: None,
            phone: None,
            created_at: 0,
        }
    }

    fn issue(reporter: &str) -> Issue {
        Issue {
            id: 7,
            title: "Pothole".into(),
            description: "Deep".into(),
            category: IssueCategory::Roads,
            location: "Main St".into(),
            image: None,
            status: IssueStatus::Pending,
            priority: Priority::Normal,
            user_email: reporter.into(),
            assigned_staff: None,
            created_at: 1,
            updated_at: 1,
            upvotes: vec![],
            timeline: vec![],
        }
    }

    fn gateway(reply: serde_json::Value) -> Gateway<RecordingClient> {
        let http = RecordingClient {
            reply,
            ..Default::default()
        };
        Gateway::new(http, SessionStore::new(Duration::from_secs(3600), None))
    }

    #[tokio::test]
    async fn test_self_upvote_sends_nothing() {
        let gw = gateway(serde_json::Value::Null);
        gw.session()
            .login(user("a@city.test", Role::Citizen), "t".into())
            .expect("login");

        let err = gw.upvote(&issue("a@city.test")).await.expect_err("refused");
        assert!(matches!(err, ClientError::Denied(Denial::SelfUpvote)));
        assert!(gw.http().calls().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_cannot_transition() {
        let gw = gateway(serde_json::Value::Null);
        let err = gw.delete_issue(&issue("a@city.test")).await.expect_err("refused");
        assert!(matches!(err, ClientError::Denied(Denial::NotAuthenticated)));
        assert!(gw.http().calls().is_empty());
    }

    #[tokio::test]
    async fn test_free_tier_checked_before_write() {
        let gw = gateway(serde_json::json!({ "issues": [], "totalCount": 3 }));
        gw.session()
            .login(user("a@city.test", Role::Citizen), "t".into())
            .expect("login");

        let err = gw
            .create_issue(IssueCreate {
                title: "Fourth".into(),
                description: "d".into(),
                category: IssueCategory::Water,
                location: "l".into(),
                image: None,
                user_email: None,
            })
            .await
            .expect_err("refused");
        assert!(matches!(
            err,
            ClientError::Denied(Denial::FreeTierLimitReached { limit: 3 })
        ));
        // Only the count was read
        assert_eq!(gw.http().calls(), vec![(Method::GET, "/issues".to_string())]);
    }

    #[tokio::test]
    async fn test_server_policy_and_sign_out() {
        let gw = gateway(serde_json::json!({ "issues": [], "totalCount": 1 }))
            .with_policy(GatePolicy::new(1));
        gw.session()
            .login(user("a@city.test", Role::Citizen), "t".into())
            .expect("login");
        let report = IssueCreate {
            title: "Second".into(),
            description: "d".into(),
            category: IssueCategory::Garbage,
            location: "l".into(),
            image: None,
            user_email: None,
        };
        let err = gw.create_issue(report.clone()).await.expect_err("refused");
        assert!(matches!(
            err,
            ClientError::Denied(Denial::FreeTierLimitReached { limit: 1 })
        ));

        gw.sign_out().expect("sign out");
        let err = gw.create_issue(report).await.expect_err("refused");
        assert!(matches!(err, ClientError::Denied(Denial::NotAuthenticated)));
        assert_eq!(gw.http().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_path_values_are_encoded() {
        let gw = gateway(serde_json::json!([]));
        gw.session()
            .login(user("odd#one?@city.test", Role::Citizen), "t".into())
            .expect("login");

        gw.my_issues().await.expect("issues");
        let _ = gw.invoice("pi_1/../x").await;
        assert_eq!(
            gw.http().calls(),
            vec![
                (Method::GET, "/citizen/issues/odd%23one%3F@city.test".to_string()),
                (Method::GET, "/payments/pi_1%2F..%2Fx/invoice".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cached_session_cannot_move_money() {
        let gw = gateway(serde_json::Value::Null);
        gw.session()
            .login_cached(user("a@city.test", Role::Citizen), "t".into())
            .expect("login");

        let err = gw.boost(&issue("b@city.test"), None).await.expect_err("refused");
        assert!(matches!(err, ClientError::Denied(Denial::SessionNotVerified)));
        let err = gw
            .create_payment_intent(100.0, PaymentPurpose::Boost)
            .await
            .expect_err("refused");
        assert!(matches!(err, ClientError::Denied(Denial::SessionNotVerified)));
        assert!(gw.http().calls().is_empty());

        let actions = gw.allowed_actions(&issue("b@city.test"));
        assert!(actions.contains(&Action::Upvote));
        assert!(!actions.contains(&Action::Boost));
    }

    #[tokio::test]
    async fn test_staff_sees_only_status_actions_on_assigned_issue() {
        let gw = gateway(serde_json::Value::Null);
        gw.session()
            .login(user("s@city.test", Role::Staff), "t".into())
            .expect("login");

        let mut assigned = issue("c@city.test");
        assigned.assigned_staff = Some("s@city.test".into());
        let actions = gw.allowed_actions(&assigned);
        assert!(actions.contains(&Action::UpdateStatus(IssueStatus::InProgress)));
        assert!(!actions.contains(&Action::Reject));
        assert!(!actions.contains(&Action::AssignStaff));

        let err = gw
            .update_status(&issue("c@city.test"), IssueStatus::InProgress, None)
            .await
            .expect_err("not assignee");
        assert!(matches!(err, ClientError::Denied(Denial::NotAssignee)));
    }
}
