//! Role gate, ownership and account flags enforced by the server

mod common;

use common::{ADMIN_EMAIL, TestApp, error_code, issue_id};
use http::StatusCode;
use serde_json::json;
use shared::ErrorCode;

#[tokio::test]
async fn test_upvote_once_and_never_own_issue() {
    let app = TestApp::spawn().await;
    let reporter = app.citizen("reporter@city.test").await;
    let voter = app.citizen("voter@city.test").await;
    let id = issue_id(&app.report(&reporter, "Open manhole").await);
    let uri = format!("/issues/upvote/{id}");

    let (status, body) = app.patch(&uri, Some(&reporter), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::SelfUpvote);

    let (status, body) = app.patch(&uri, Some(&voter), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvotes"], json!(["voter@city.test"]));

    let (status, body) = app.patch(&uri, Some(&voter), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), ErrorCode::AlreadyUpvoted);

    let (_, issue) = app.get(&format!("/issues/{id}"), None).await;
    assert_eq!(issue["upvotes"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_free_tier_limit_applies_until_premium() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen("frugal@city.test").await;
    let limit = app.state.config.free_tier_issue_limit;
    for n in 0..limit {
        app.report(&citizen, &format!("Report {n}")).await;
    }

    let body = json!({
        "title": "One too many",
        "description": "d",
        "category": "Others",
        "location": "l",
    });
    let (status, refused) = app.post("/issues", Some(&citizen), body.clone()).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(error_code(&refused), ErrorCode::FreeTierLimitReached);
    assert_eq!(refused["details"]["limit"], limit);

    let (status, _) = app.pay(&citizen, "pi_sub_frugal", "subscription", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, user) = app
        .patch("/users/premium/frugal@city.test", Some(&citizen), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(user["isPremium"], true);

    let (status, _) = app.post("/issues", Some(&citizen), body).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn test_concurrent_reports_respect_free_tier() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen("eager@city.test").await;
    let limit = app.state.config.free_tier_issue_limit;
    for n in 0..limit - 1 {
        app.report(&citizen, &format!("Report {n}")).await;
    }

    let body = |title: &str| {
        json!({
            "title": title,
            "description": "d",
            "category": "Others",
            "location": "l",
        })
    };
    let (a, b, c) = tokio::join!(
        app.post("/issues", Some(&citizen), body("Race a")),
        app.post("/issues", Some(&citizen), body("Race b")),
        app.post("/issues", Some(&citizen), body("Race c")),
    );

    let statuses = [a.0, b.0, c.0];
    let accepted = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(accepted, 1, "{statuses:?}");
    for (status, body) in [a, b, c] {
        if status != StatusCode::OK {
            assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
            assert_eq!(error_code(&body), ErrorCode::FreeTierLimitReached);
        }
    }

    let (_, page) = app.get("/issues?userEmail=eager@city.test", None).await;
    assert_eq!(page["totalCount"], limit);
}

#[tokio::test]
async fn test_blocked_citizen_cannot_report() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen("rowdy@city.test").await;
    let admin = app.admin().await;

    let (status, user) = app
        .patch(
            "/users/block/rowdy@city.test",
            Some(&admin),
            json!({ "isBlocked": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["isBlocked"], true);

    let (status, body) = app
        .post(
            "/issues",
            Some(&citizen),
            json!({ "title": "t", "description": "d", "category": "Water", "location": "l" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::UserBlocked);

    app.patch(
        "/users/block/rowdy@city.test",
        Some(&admin),
        json!({ "isBlocked": false }),
    )
    .await;
    app.report(&citizen, "Back in good standing").await;
}

#[tokio::test]
async fn test_admin_cannot_be_blocked() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let (status, body) = app
        .patch(
            &format!("/users/block/{ADMIN_EMAIL}"),
            Some(&admin),
            json!({ "isBlocked": true }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::CannotModifyAdmin);
}

#[tokio::test]
async fn test_body_identity_must_match_token() {
    let app = TestApp::spawn().await;
    let mallory = app.citizen("mallory@city.test").await;
    app.citizen("victim@city.test").await;

    let (status, body) = app
        .post(
            "/issues",
            Some(&mallory),
            json!({
                "title": "t",
                "description": "d",
                "category": "Roads",
                "location": "l",
                "userEmail": "victim@city.test",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::PermissionDenied);
}

#[tokio::test]
async fn test_token_endpoint_refuses_privileged_accounts() {
    let app = TestApp::spawn().await;
    let (status, body) = app.post("/jwt", None, json!({ "email": ADMIN_EMAIL })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::PermissionDenied);

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), ErrorCode::InvalidCredentials);
}

#[tokio::test]
async fn test_admin_routes_and_own_account_reads() {
    let app = TestApp::spawn().await;
    let alice = app.citizen("alice@city.test").await;
    app.citizen("bob@city.test").await;
    let admin = app.admin().await;

    let (status, body) = app.get("/users", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::AdminRequired);

    let (status, users) = app.get("/users?limit=2", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().map(Vec::len), Some(2));
    let (_, admins) = app.get("/users?role=admin", Some(&admin)).await;
    assert_eq!(admins.as_array().map(Vec::len), Some(1));
    assert_eq!(admins[0]["role"], "admin");

    let (status, _) = app.get("/users/bob@city.test", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, me) = app.get("/users/ALICE@city.test", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "citizen");

    let (_, role) = app.get("/users/role/bob@city.test", None).await;
    assert_eq!(role, json!({ "role": "citizen" }));
}

#[tokio::test]
async fn test_invalid_token_is_rejected_outright() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/issues", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), ErrorCode::TokenInvalid);
}
