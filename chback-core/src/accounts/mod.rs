//! Account lifecycle: registration, login, password change, deletion

pub mod password;

use crate::cleanup::CleanupCoordinator;
use crate::error::{CoreError, CoreResult};
use crate::metrics;
use crate::model::{AccountId, Timestamp};
use crate::store::{AccountRecord, AccountStore};
use crate::token::{Principal, TokenEngine};
use std::sync::Arc;

const MSG_BAD_CREDENTIALS: &str = "Account not found or password incorrect";
const MSG_INSECURE_PASSWORD: &str = "Password is not secure enough";

#[derive(Clone, Debug)]
pub struct AccountService {
    accounts: AccountStore,
    tokens: Arc<TokenEngine>,
    cleanup: CleanupCoordinator,
}

impl AccountService {
    pub fn new(accounts: AccountStore, tokens: Arc<TokenEngine>, cleanup: CleanupCoordinator) -> Self {
        Self {
            accounts,
            tokens,
            cleanup,
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        agreed_privacy_policy: bool,
        agreed_terms: bool,
    ) -> CoreResult<AccountId> {
        if !(agreed_privacy_policy && agreed_terms) {
            return Err(CoreError::forbidden(
                "Privacy policy and terms of service must be confirmed",
            ));
        }
        if !password::is_valid_email(email) {
            return Err(CoreError::bad_request("Invalid email"));
        }
        if !password::is_secure_password(password) {
            return Err(CoreError::bad_request(MSG_INSECURE_PASSWORD));
        }

        let pwhash = hash_off_thread(password).await?;
        let id = self
            .accounts
            .create(email, &pwhash)
            .await
            .map_err(|e| CoreError::storage("Failed to create account", e))?
            .ok_or_else(|| CoreError::conflict("Account already exists"))?;

        metrics::record_account_registered();
        tracing::info!(account = %id, "Registered account");
        Ok(id)
    }

    /// Check credentials and issue a token
    pub async fn authenticate(&self, email: &str, password: &str) -> CoreResult<String> {
        let account = self
            .accounts
            .get_by_email(email)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch account", e))?
            .ok_or_else(|| CoreError::unauthorized(MSG_BAD_CREDENTIALS))?;

        self.check_password(&account, password).await?;
        self.tokens.issue_for(&account)
    }

    /// Replace the password; with `end_sessions` every earlier token goes stale
    pub async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
        end_sessions: bool,
    ) -> CoreResult<()> {
        let principal = self.tokens.fully_validate(token).await?;
        let account = self.load(principal.account_id).await?;

        self.check_password(&account, old_password).await?;
        if !password::is_secure_password(new_password) {
            return Err(CoreError::bad_request(MSG_INSECURE_PASSWORD));
        }

        let pwhash = hash_off_thread(new_password).await?;
        let changed_at = end_sessions.then(Timestamp::now);
        let updated = self
            .accounts
            .set_password(account.id, &pwhash, changed_at)
            .await
            .map_err(|e| CoreError::storage("Failed to update password", e))?;
        if !updated {
            return Err(CoreError::not_found("Account not found"));
        }

        tracing::info!(account = %account.id, end_sessions, "Changed password");
        Ok(())
    }

    /// Verify the password, then retract votes and delete the account
    pub async fn delete_account(&self, token: &str, password: &str) -> CoreResult<()> {
        let principal = self.tokens.fully_validate(token).await?;
        let account = self.load(principal.account_id).await?;

        self.check_password(&account, password).await?;
        self.cleanup.delete_account(account.id, token).await
    }

    pub async fn logout(&self, token: &str) -> CoreResult<()> {
        let principal = self.tokens.fully_validate(token).await?;
        self.tokens.invalidate(token).await?;

        tracing::debug!(account = %principal.account_id, "Logged out");
        Ok(())
    }

    pub async fn verify(&self, token: &str) -> CoreResult<Principal> {
        self.tokens.fully_validate(token).await
    }

    async fn load(&self, id: AccountId) -> CoreResult<AccountRecord> {
        self.accounts
            .get_by_id(id)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch account", e))?
            .ok_or_else(|| CoreError::not_found("Account not found"))
    }

    async fn check_password(&self, account: &AccountRecord, password: &str) -> CoreResult<()> {
        let stored = account.pwhash.clone();
        let password = password.to_string();

        let matches = tokio::task::spawn_blocking(move || password::verify_password(&password, &stored))
            .await
            .map_err(|e| CoreError::storage("Failed to verify password", e))??;

        if matches {
            Ok(())
        } else {
            Err(CoreError::unauthorized(MSG_BAD_CREDENTIALS))
        }
    }
}

async fn hash_off_thread(password: &str) -> CoreResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| CoreError::storage("Failed to hash password", e))?
}
