/*
    rating_scenarios.rs - End-to-end voting and account deletion

    Drives the backend the way the HTTP layer does: every vote goes through
    full token validation first.
*/

use chback_core::testing::TestBackend;
use chback_core::{AccountId, CoreError, ItemId, VoteOp};

/// Seed accounts until the next one gets `target` as its id
async fn account_with_id(t: &TestBackend, target: i64) -> (AccountId, String) {
    let mut last = None;
    for n in 1..=target {
        last = Some(t.account_with_token(&format!("user{}@example.com", n)).await);
    }
    let (id, token) = last.expect("target >= 1");
    assert_eq!(id, AccountId(target));
    (id, token)
}

#[tokio::test]
async fn test_like_then_dislike_scenario() {
    let t = TestBackend::new().await;
    let (account, token) = account_with_id(&t, 7).await;
    let item = t.seed_variation(42).await;

    t.backend.vote(&token, VoteOp::Like, item).await.unwrap();
    assert_eq!(t.roster(item).await, ("7".to_string(), String::new()));
    assert_eq!(t.history(account).await, ("42".to_string(), String::new()));

    let err = t.backend.vote(&token, VoteOp::Like, item).await.unwrap_err();
    assert_eq!(err, CoreError::conflict("Already liked"));
    assert_eq!(err.kind().status_code(), 409);

    t.backend.vote(&token, VoteOp::Dislike, item).await.unwrap();
    assert_eq!(t.roster(item).await, (String::new(), "7".to_string()));
    assert_eq!(t.history(account).await, (String::new(), "42".to_string()));
}

#[tokio::test]
async fn test_double_unlike_leaves_state_unchanged() {
    let t = TestBackend::new().await;
    let (account, token) = t.account_with_token("a@example.com").await;
    let item = t.seed_variation(1).await;
    let other = t.seed_variation(2).await;

    t.backend.vote(&token, VoteOp::Like, item).await.unwrap();
    t.backend.vote(&token, VoteOp::Dislike, other).await.unwrap();
    t.backend.vote(&token, VoteOp::Unlike, item).await.unwrap();

    let roster = t.roster(item).await;
    let history = t.history(account).await;

    let err = t.backend.vote(&token, VoteOp::Unlike, item).await.unwrap_err();
    assert_eq!(err, CoreError::conflict("Not liked"));
    assert_eq!(t.roster(item).await, roster);
    assert_eq!(t.history(account).await, history);
    assert_eq!(history, (String::new(), "2".to_string()));
}

#[tokio::test]
async fn test_undislike() {
    let t = TestBackend::new().await;
    let (account, token) = t.account_with_token("a@example.com").await;
    let item = t.seed_variation(3).await;

    let err = t.backend.vote(&token, VoteOp::Undislike, item).await.unwrap_err();
    assert_eq!(err, CoreError::conflict("Not disliked"));

    t.backend.vote(&token, VoteOp::Dislike, item).await.unwrap();
    let err = t.backend.vote(&token, VoteOp::Dislike, item).await.unwrap_err();
    assert_eq!(err, CoreError::conflict("Already disliked"));

    t.backend.vote(&token, VoteOp::Undislike, item).await.unwrap();
    assert_eq!(t.roster(item).await, (String::new(), String::new()));
    assert_eq!(t.history(account).await, (String::new(), String::new()));
}

#[tokio::test]
async fn test_vote_on_missing_variation() {
    let t = TestBackend::new().await;
    let (_, token) = t.account_with_token("a@example.com").await;

    let err = t.backend.vote(&token, VoteOp::Like, ItemId(404)).await.unwrap_err();
    assert_eq!(err, CoreError::not_found("Variation not found"));
}

#[tokio::test]
async fn test_vote_with_invalid_token() {
    let t = TestBackend::new().await;
    let item = t.seed_variation(1).await;

    let err = t.backend.vote("garbage", VoteOp::Like, item).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Invalid token"));
    assert_eq!(t.roster(item).await, (String::new(), String::new()));
}

#[tokio::test]
async fn test_many_voters_on_one_variation() {
    let t = TestBackend::new().await;
    let item = t.seed_variation(5).await;

    let mut voters = Vec::new();
    for n in 0..4 {
        voters.push(t.account_with_token(&format!("v{}@example.com", n)).await);
    }

    for (i, (_, token)) in voters.iter().enumerate() {
        let op = if i % 2 == 0 { VoteOp::Like } else { VoteOp::Dislike };
        t.backend.vote(token, op, item).await.unwrap();
    }

    let (likes, dislikes) = t.roster(item).await;
    assert_eq!(likes, format!("{};{}", voters[0].0, voters[2].0));
    assert_eq!(dislikes, format!("{};{}", voters[1].0, voters[3].0));
}

#[tokio::test]
async fn test_account_deletion_retracts_every_vote() {
    let t = TestBackend::new().await;
    let (bystander, bystander_token) = t.account_with_token("b@example.com").await;
    let (account, token) = t.account_with_token("a@example.com").await;
    for id in [1, 3, 5] {
        t.seed_variation(id).await;
    }

    t.backend.vote(&token, VoteOp::Like, ItemId(1)).await.unwrap();
    t.backend.vote(&token, VoteOp::Like, ItemId(3)).await.unwrap();
    t.backend.vote(&token, VoteOp::Dislike, ItemId(5)).await.unwrap();
    t.backend.vote(&bystander_token, VoteOp::Like, ItemId(1)).await.unwrap();

    t.backend
        .accounts
        .delete_account(&token, chback_core::testing::TEST_PASSWORD)
        .await
        .unwrap();

    assert_eq!(t.roster(ItemId(1)).await, (bystander.to_string(), String::new()));
    assert_eq!(t.roster(ItemId(3)).await, (String::new(), String::new()));
    assert_eq!(t.roster(ItemId(5)).await, (String::new(), String::new()));
    assert!(t.account(account).await.is_none());

    let err = t.backend.tokens.fully_validate(&token).await.unwrap_err();
    assert_eq!(err, CoreError::unauthorized("Invalid token"));
    assert!(t.backend.ledger.contains(&token).await.unwrap());
}

#[tokio::test]
async fn test_deletion_tolerates_vanished_variation() {
    let t = TestBackend::new().await;
    let (account, token) = t.account_with_token("a@example.com").await;
    t.seed_variation(1).await;
    t.backend.vote(&token, VoteOp::Like, ItemId(1)).await.unwrap();

    t.backend
        .content_store
        .executor()
        .execute_batch("DELETE FROM variations WHERE id = 1")
        .await
        .unwrap();

    t.backend
        .cleanup
        .delete_account(account, &token)
        .await
        .unwrap();
    assert!(t.account(account).await.is_none());
}
