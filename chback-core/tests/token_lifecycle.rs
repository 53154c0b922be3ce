/*
    token_lifecycle.rs - Issuance, revocation and staleness of bearer tokens
*/

use chback_core::testing::{TestBackend, TEST_PASSWORD};
use chback_core::CoreError;
use std::time::Duration;

#[tokio::test]
async fn test_login_then_verify() {
    let t = TestBackend::new().await;
    let (id, token) = t.account_with_token("a@example.com").await;

    let principal = t.backend.accounts.verify(&token).await.unwrap();
    assert_eq!(principal.account_id, id);
    assert_eq!(principal.email, "a@example.com");
    assert_eq!(principal.claims.account_id(), Some(id));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let t = TestBackend::new().await;
    t.register("a@example.com", TEST_PASSWORD).await;

    let err = t
        .backend
        .accounts
        .authenticate("a@example.com", "Wrong1234")
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Account not found or password incorrect"));

    let err = t
        .backend
        .accounts
        .authenticate("nobody@example.com", TEST_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Account not found or password incorrect"));
}

#[tokio::test]
async fn test_logout_revokes_only_that_token() {
    let t = TestBackend::new().await;
    let (_, first) = t.account_with_token("a@example.com").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = t.login("a@example.com", TEST_PASSWORD).await;

    t.backend.accounts.logout(&first).await.unwrap();

    let err = t.backend.accounts.verify(&first).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Invalid token"));
    t.backend.accounts.verify(&second).await.unwrap();

    // Logging out twice fails validation the second time
    let err = t.backend.accounts.logout(&first).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Invalid token"));
}

#[tokio::test]
async fn test_password_change_ending_sessions() {
    let t = TestBackend::new().await;
    let (_, token) = t.account_with_token("a@example.com").await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    t.backend
        .accounts
        .change_password(&token, TEST_PASSWORD, "Better456", true)
        .await
        .unwrap();

    let err = t.backend.accounts.verify(&token).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Outdated token"));

    tokio::time::sleep(Duration::from_millis(5)).await;
    let fresh = t.login("a@example.com", "Better456").await;
    t.backend.accounts.verify(&fresh).await.unwrap();
}

#[tokio::test]
async fn test_password_change_keeping_sessions() {
    let t = TestBackend::new().await;
    let (_, token) = t.account_with_token("a@example.com").await;

    t.backend
        .accounts
        .change_password(&token, TEST_PASSWORD, "Better456", false)
        .await
        .unwrap();

    t.backend.accounts.verify(&token).await.unwrap();
    let err = t
        .backend
        .accounts
        .authenticate("a@example.com", TEST_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind().status_code(), 401);
}

#[tokio::test]
async fn test_password_change_rejects_weak_password() {
    let t = TestBackend::new().await;
    let (_, token) = t.account_with_token("a@example.com").await;

    let err = t
        .backend
        .accounts
        .change_password(&token, TEST_PASSWORD, "weak", true)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::bad_request("Password is not secure enough"));
    t.backend.accounts.verify(&token).await.unwrap();
}

#[tokio::test]
async fn test_token_of_deleted_account() {
    let t = TestBackend::new().await;
    let (id, token) = t.account_with_token("a@example.com").await;

    // Remove the row behind the engine's back so the ledger has no entry
    t.backend.account_store.delete(id).await.unwrap();

    let err = t.backend.accounts.verify(&token).await.unwrap_err();
    assert_eq!(err, CoreError::not_found("Account not found"));
}

#[tokio::test]
async fn test_old_session_rejected_after_email_reregistered() {
    let t = TestBackend::new().await;
    let (old_id, first) = t.account_with_token("a@example.com").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = t.login("a@example.com", TEST_PASSWORD).await;

    t.backend.accounts.delete_account(&first, TEST_PASSWORD).await.unwrap();
    let new_id = t.register("a@example.com", TEST_PASSWORD).await;
    assert_ne!(old_id, new_id);

    // `second` was never revoked, but it belongs to the deleted account
    let err = t.backend.accounts.verify(&second).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Invalid token"));

    let fresh = t.login("a@example.com", TEST_PASSWORD).await;
    let principal = t.backend.accounts.verify(&fresh).await.unwrap();
    assert_eq!(principal.account_id, new_id);
}

#[tokio::test]
async fn test_tokens_do_not_cross_backends() {
    let a = TestBackend::new().await;
    let b = TestBackend::new().await;
    let (_, token) = a.account_with_token("a@example.com").await;
    b.register("a@example.com", TEST_PASSWORD).await;

    // Each in-memory backend generates its own signing key
    let err = b.backend.accounts.verify(&token).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Invalid token"));
}

#[tokio::test]
async fn test_registration_rules() {
    let t = TestBackend::new().await;
    let accounts = &t.backend.accounts;

    let err = accounts
        .register("a@example.com", TEST_PASSWORD, true, false)
        .await
        .unwrap_err();
    assert_eq!(err.kind().status_code(), 403);

    let err = accounts
        .register("not-an-email", TEST_PASSWORD, true, true)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::bad_request("Invalid email"));

    accounts
        .register("a@example.com", TEST_PASSWORD, true, true)
        .await
        .unwrap();
    let err = accounts
        .register("a@example.com", TEST_PASSWORD, true, true)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::conflict("Account already exists"));
}
