//! Test harness: the full router over an in-memory database, driven with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use citywatch_server::{Config, ServerState, build_app};
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::ErrorCode;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@city.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const STAFF_PASSWORD: &str = "staff-password";

pub struct TestApp {
    pub app: Router,
    pub state: ServerState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with_config(Config::for_tests()).await
    }

    pub async fn with_config(mut config: Config) -> Self {
        config.admin_email = Some(ADMIN_EMAIL.into());
        config.admin_password = Some(ADMIN_PASSWORD.into());
        let state = ServerState::initialize(&config)
            .await
            .expect("server state should initialize");
        let app = build_app(state.clone());
        Self { app, state }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    /// Register a citizen and return a token for them
    pub async fn citizen(&self, email: &str) -> String {
        let (status, _) = self
            .post("/users", None, json!({ "email": email, "name": email }))
            .await;
        assert_eq!(status, StatusCode::OK, "register {email}");
        let (status, body) = self.post("/jwt", None, json!({ "email": email })).await;
        assert_eq!(status, StatusCode::OK, "token for {email}");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {email}: {body}");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Create a staff account (as admin) and return a token for it
    pub async fn staff(&self, admin_token: &str, email: &str) -> String {
        let (status, body) = self
            .post(
                "/staff",
                Some(admin_token),
                json!({ "name": "Field Crew", "email": email, "password": STAFF_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create staff {email}: {body}");
        self.login(email, STAFF_PASSWORD).await
    }

    /// File a Roads issue; returns the stored issue
    pub async fn report(&self, token: &str, title: &str) -> Value {
        let (status, body) = self
            .post(
                "/issues",
                Some(token),
                json!({
                    "title": title,
                    "description": "Deep pothole in the left lane",
                    "category": "Roads",
                    "location": "Mirpur Road 10",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "report {title}: {body}");
        body
    }

    /// Record a payment at the configured price
    pub async fn pay(
        &self,
        token: &str,
        transaction_id: &str,
        purpose: &str,
        issue_id: Option<i64>,
    ) -> (StatusCode, Value) {
        let amount = match purpose {
            "boost" => self.state.config.boost_price,
            _ => self.state.config.subscription_price,
        };
        self.post(
            "/payments",
            Some(token),
            json!({
                "transactionId": transaction_id,
                "amount": amount,
                "purpose": purpose,
                "issueId": issue_id,
            }),
        )
        .await
    }
}

pub fn issue_id(issue: &Value) -> i64 {
    issue["id"].as_i64().expect("issue id")
}

pub fn error_code(body: &Value) -> ErrorCode {
    let raw = body["code"].as_u64().expect("error body carries a code");
    ErrorCode::try_from(raw as u16).expect("known error code")
}
