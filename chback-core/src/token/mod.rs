//! Token engine: issuance, verification and invalidation of bearer tokens
//!
//! Tokens are HS512 JWTs signed with a single key held for the lifetime of
//! the engine. Full validation runs three ordered checks and stops at the
//! first failure:
//!
//! 1. signature and expiry, with no store access
//! 2. membership in the [`InvalidationLedger`]
//! 3. freshness against the account's last credential change
//!
//! The server keeps no session table; the ledger and the per-account
//! `last_pw_change` mark are the only revocation state.

mod claims;
mod key;

pub use claims::Claims;
pub use key::{KeyError, SigningKey, GENERATED_KEY_LEN, MIN_KEY_LEN};

use crate::error::{CoreError, CoreResult};
use crate::ledger::InvalidationLedger;
use crate::metrics;
use crate::model::{AccountId, Timestamp};
use crate::store::{AccountRecord, AccountStore};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

/// Default validity window of an issued token
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(14 * 24 * 60 * 60);

const MSG_INVALID: &str = "Invalid token";
const MSG_OUTDATED: &str = "Outdated token";
const MSG_ACCOUNT_NOT_FOUND: &str = "Account not found";

/// A fully validated token holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub email: String,
    pub claims: Claims,
}

pub struct TokenEngine {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: Duration,
    accounts: AccountStore,
    ledger: InvalidationLedger,
}

impl TokenEngine {
    pub fn new(
        key: &SigningKey,
        validity: Duration,
        accounts: AccountStore,
        ledger: InvalidationLedger,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
            validation,
            validity,
            accounts,
            ledger,
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a token for the account registered under `email`
    pub async fn issue(&self, email: &str) -> CoreResult<String> {
        let account = self.lookup(email).await?;
        self.issue_for(&account)
    }

    /// Issue a token for an already loaded account
    pub fn issue_for(&self, account: &AccountRecord) -> CoreResult<String> {
        let claims = Claims::new(&account.email, account.id, Timestamp::now(), self.validity);
        let token = self.sign(&claims)?;

        metrics::record_token_issued();
        tracing::debug!(account = %account.id, "Issued token");
        Ok(token)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> CoreResult<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS512), claims, &self.encoding)
            .map_err(|e| CoreError::storage("Failed to sign token", e))
    }

    /// Check signature and expiry only
    pub fn verify_signature(&self, token: &str) -> CoreResult<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Token failed verification");
                CoreError::unauthorized(MSG_INVALID)
            })
    }

    /// Run every check a protected operation requires
    pub async fn fully_validate(&self, token: &str) -> CoreResult<Principal> {
        let claims = self.verify_signature(token).map_err(|e| {
            metrics::record_token_rejected("signature");
            e
        })?;

        let revoked = self.ledger.contains(token).await.map_err(|e| {
            CoreError::storage("Failed to verify the token's validity", e)
        })?;
        if revoked {
            metrics::record_token_rejected("revoked");
            tracing::debug!(subject = %claims.sub, "Rejected revoked token");
            return Err(CoreError::unauthorized(MSG_INVALID));
        }

        let account = match self.lookup(&claims.sub).await {
            Ok(account) => account,
            Err(e) => {
                if matches!(e, CoreError::NotFound(_)) {
                    metrics::record_token_rejected("unknown_account");
                }
                return Err(e);
            }
        };

        // The email may have been re-registered since issuance
        if claims.account_id() != Some(account.id) {
            metrics::record_token_rejected("rebound");
            tracing::debug!(account = %account.id, "Rejected token bound to another account");
            return Err(CoreError::unauthorized(MSG_INVALID));
        }

        if account.last_pw_change > claims.issued_at() {
            metrics::record_token_rejected("outdated");
            tracing::debug!(account = %account.id, "Rejected token issued before credential change");
            return Err(CoreError::unauthorized(MSG_OUTDATED));
        }

        Ok(Principal {
            account_id: account.id,
            email: account.email,
            claims,
        })
    }

    /// Void `token` permanently
    pub async fn invalidate(&self, token: &str) -> CoreResult<()> {
        self.ledger
            .append(token)
            .await
            .map_err(|e| CoreError::storage("Failed to invalidate the token", e))?;

        metrics::record_token_invalidated();
        Ok(())
    }

    async fn lookup(&self, email: &str) -> CoreResult<AccountRecord> {
        self.accounts
            .get_by_email(email)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch account", e))?
            .ok_or_else(|| CoreError::not_found(MSG_ACCOUNT_NOT_FOUND))
    }
}

impl std::fmt::Debug for TokenEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEngine")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}
