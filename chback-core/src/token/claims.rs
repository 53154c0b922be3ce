use crate::model::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account email
    pub sub: String,
    /// Account id, decimal
    pub jti: String,
    /// Issued at, epoch seconds
    pub iat: i64,
    /// Expires at, epoch seconds
    pub exp: i64,
    /// Issued at, epoch millis; used by the freshness check
    pub iat_ms: i64,
}

impl Claims {
    pub fn new(email: &str, account_id: AccountId, issued_at: Timestamp, validity: Duration) -> Self {
        let validity_ms = i64::try_from(validity.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Timestamp::from_millis(issued_at.as_millis().saturating_add(validity_ms));

        Self {
            sub: email.to_string(),
            jti: account_id.to_string(),
            iat: issued_at.as_secs(),
            exp: expires_at.as_secs(),
            iat_ms: issued_at.as_millis(),
        }
    }

    pub fn issued_at(&self) -> Timestamp {
        Timestamp::from_millis(self.iat_ms)
    }

    /// Account id bound at issuance, if the claim is well-formed
    pub fn account_id(&self) -> Option<AccountId> {
        self.jti.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_window() {
        let issued = Timestamp::from_millis(1_700_000_000_500);
        let claims = Claims::new(
            "a@example.com",
            AccountId(7),
            issued,
            Duration::from_secs(14 * 24 * 60 * 60),
        );

        assert_eq!(claims.sub, "a@example.com");
        assert_eq!(claims.account_id(), Some(AccountId(7)));
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 14 * 24 * 60 * 60);
        assert_eq!(claims.issued_at(), issued);
    }
}
