//! Test fixtures shared by unit and integration tests

use crate::backend::Backend;
use crate::config::Config;
use crate::model::{AccountId, ItemId};
use crate::store::AccountRecord;

/// Password that satisfies the password policy
pub const TEST_PASSWORD: &str = "Secret123";

/// In-memory backend with helpers for seeding data
pub struct TestBackend {
    pub backend: Backend,
}

impl TestBackend {
    pub async fn new() -> Self {
        let backend = Backend::open(&Config::in_memory()).expect("in-memory backend");
        Self { backend }
    }

    /// Register through the account service
    pub async fn register(&self, email: &str, password: &str) -> AccountId {
        self.backend
            .accounts
            .register(email, password, true, true)
            .await
            .expect("register")
    }

    /// Authenticate and return the token
    pub async fn login(&self, email: &str, password: &str) -> String {
        self.backend
            .accounts
            .authenticate(email, password)
            .await
            .expect("authenticate")
    }

    /// Register with [`TEST_PASSWORD`] and log in
    pub async fn account_with_token(&self, email: &str) -> (AccountId, String) {
        let id = self.register(email, TEST_PASSWORD).await;
        let token = self.login(email, TEST_PASSWORD).await;
        (id, token)
    }

    /// Add a variation under a fixed id
    pub async fn seed_variation(&self, id: i64) -> ItemId {
        let item = ItemId(id);
        self.backend
            .content_store
            .create_with_id(item, &format!("variation {}", id))
            .await
            .expect("seed variation");
        item
    }

    pub async fn account(&self, id: AccountId) -> Option<AccountRecord> {
        self.backend.account_store.get_by_id(id).await.expect("fetch account")
    }

    /// (likes, dislikes) of a variation roster as stored
    pub async fn roster(&self, item: ItemId) -> (String, String) {
        let votes = self
            .backend
            .content_store
            .get(item)
            .await
            .expect("fetch variation")
            .expect("variation exists")
            .votes;
        (votes.likes.to_stored(), votes.dislikes.to_stored())
    }

    /// (likes, dislikes) of an account history as stored
    pub async fn history(&self, account: AccountId) -> (String, String) {
        let votes = self.account(account).await.expect("account exists").votes;
        (votes.likes.to_stored(), votes.dislikes.to_stored())
    }
}
