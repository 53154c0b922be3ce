/*
    routes.rs - HTTP contract of the /api/v1 routes

    Drives the router in-process with tower's oneshot; no sockets.
*/

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chback_api::build_router;
use chback_core::testing::{TestBackend, TEST_PASSWORD};
use std::sync::Arc;
use tower::ServiceExt;

struct Harness {
    fixture: TestBackend,
    router: Router,
}

impl Harness {
    async fn new() -> Self {
        let fixture = TestBackend::new().await;
        let router = build_router(Arc::new(fixture.backend.clone()));
        Self { fixture, router }
    }

    async fn get(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn login(&self, email: &str) -> String {
        self.fixture.account_with_token(email).await.1
    }
}

#[tokio::test]
async fn test_register_then_auth() {
    let h = Harness::new().await;

    let (status, body) = h
        .get("/api/v1/register?email=a@example.com&password=Secret123&agree_to_privacy_policy=true&agree_to_terms_of_service=True")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Account created");

    let (status, token) = h.get("/api/v1/auth?email=a@example.com&password=Secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token.split('.').count(), 3);

    let (status, body) = h.get(&format!("/api/v1/verify_token?token={}", token)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["email"], "a@example.com");
    assert_eq!(json["id"], "1");
}

#[tokio::test]
async fn test_register_rejections() {
    let h = Harness::new().await;

    let (status, body) = h.get("/api/v1/register?password=Secret123").await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "No email specified"));

    let (status, body) = h
        .get("/api/v1/register?email=a@example.com&password=Secret123&agree_to_privacy_policy=true")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Privacy policy and terms of service must be confirmed");

    let (status, body) = h
        .get("/api/v1/register?email=a@example.com&password=short&agree_to_privacy_policy=true&agree_to_terms_of_service=true")
        .await;
    assert_eq!((status, body.as_str()), (StatusCode::BAD_REQUEST, "Password is not secure enough"));
}

#[tokio::test]
async fn test_auth_failures() {
    let h = Harness::new().await;
    h.login("a@example.com").await;

    let (status, body) = h.get("/api/v1/auth?email=a@example.com").await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "No password specified"));

    let (status, body) = h.get("/api/v1/auth?email=a@example.com&password=Wrong1234").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Account not found or password incorrect");
}

#[tokio::test]
async fn test_vote_routes() {
    let h = Harness::new().await;
    let token = h.login("a@example.com").await;
    h.fixture.seed_variation(42).await;

    let like = format!("/api/v1/like?token={}&variationId=42", token);
    let (status, body) = h.get(&like).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"rated":true}"#);

    let (status, body) = h.get(&like).await;
    assert_eq!((status, body.as_str()), (StatusCode::CONFLICT, "Already liked"));

    let (status, body) = h
        .get(&format!("/api/v1/unlike?token={}&variationId=42", token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"unrated":true}"#);

    let (status, body) = h
        .get(&format!("/api/v1/undislike?token={}&variationId=42", token))
        .await;
    assert_eq!((status, body.as_str()), (StatusCode::CONFLICT, "Not disliked"));
}

#[tokio::test]
async fn test_vote_parameter_errors() {
    let h = Harness::new().await;
    let token = h.login("a@example.com").await;

    let (status, body) = h.get(&format!("/api/v1/dislike?token={}", token)).await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "No variationId specified"));

    let (status, body) = h.get("/api/v1/dislike?variationId=1").await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "No token specified"));

    let (status, body) = h
        .get(&format!("/api/v1/dislike?token={}&variationId=abc", token))
        .await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "Variation not found"));

    let (status, body) = h.get("/api/v1/dislike?token=bogus&variationId=abc").await;
    assert_eq!((status, body.as_str()), (StatusCode::UNAUTHORIZED, "Invalid token"));

    let (status, body) = h
        .get(&format!("/api/v1/dislike?token={}&variationId=999", token))
        .await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "Variation not found"));
}

#[tokio::test]
async fn test_missing_token_statuses() {
    let h = Harness::new().await;

    let (status, _) = h.get("/api/v1/logout").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h.get("/api/v1/delete?password=x").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h.get("/api/v1/change_password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = h.get("/api/v1/verify_token").await;
    assert_eq!((status, body.as_str()), (StatusCode::BAD_REQUEST, "No token specified"));
}

#[tokio::test]
async fn test_logout() {
    let h = Harness::new().await;
    let token = h.login("a@example.com").await;

    let (status, body) = h.get(&format!("/api/v1/logout?token={}", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"loggedOut":true}"#);

    let (status, body) = h.get(&format!("/api/v1/verify_token?token={}", token)).await;
    assert_eq!((status, body.as_str()), (StatusCode::UNAUTHORIZED, "Invalid token"));
}

#[tokio::test]
async fn test_change_password_route() {
    let h = Harness::new().await;
    let token = h.login("a@example.com").await;

    let (status, body) = h
        .get(&format!("/api/v1/change_password?token={}&newpassword=Better456", token))
        .await;
    assert_eq!((status, body.as_str()), (StatusCode::UNAUTHORIZED, "No password specified"));

    let (status, body) = h
        .get(&format!("/api/v1/change_password?token={}&oldpassword={}", token, TEST_PASSWORD))
        .await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "No new password specified"));

    let (status, body) = h
        .get(&format!(
            "/api/v1/change_password?token={}&oldpassword={}&newpassword=Better456&endsessions=true",
            token, TEST_PASSWORD
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (status, body) = h.get(&format!("/api/v1/verify_token?token={}", token)).await;
    assert_eq!((status, body.as_str()), (StatusCode::UNAUTHORIZED, "Outdated token"));
}

#[tokio::test]
async fn test_delete_route() {
    let h = Harness::new().await;
    let token = h.login("a@example.com").await;
    h.fixture.seed_variation(1).await;
    h.get(&format!("/api/v1/like?token={}&variationId=1", token)).await;

    let (status, body) = h.get(&format!("/api/v1/delete?token={}", token)).await;
    assert_eq!((status, body.as_str()), (StatusCode::UNAUTHORIZED, "No password specified"));

    let (status, body) = h
        .get(&format!("/api/v1/delete?token={}&password={}", token, TEST_PASSWORD))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Deleted account");
    assert_eq!(h.fixture.roster(chback_core::ItemId(1)).await, (String::new(), String::new()));

    let (status, _) = h.get(&format!("/api/v1/verify_token?token={}", token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new().await;

    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "Healthy");
    assert_eq!(json["components"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_route() {
    let h = Harness::new().await;
    let (status, _) = h.get("/api/v1/subsets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
