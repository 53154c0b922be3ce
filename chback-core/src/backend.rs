//! Wiring of stores and engines into one shareable backend

use crate::accounts::AccountService;
use crate::cleanup::CleanupCoordinator;
use crate::config::{Config, StoreConfig};
use crate::error::CoreResult;
use crate::health::HealthChecker;
use crate::ledger::InvalidationLedger;
use crate::model::ItemId;
use crate::rating::{RatingEngine, VoteOp};
use crate::reconcile::Reconciler;
use crate::store::{AccountStore, ContentStore, SqlExecutor, StoreError};
use crate::token::{KeyError, Principal, SigningKey, TokenEngine};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Failed to open {store} store: {source}")]
    Store {
        store: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Everything a request handler needs
#[derive(Clone, Debug)]
pub struct Backend {
    pub content_store: ContentStore,
    pub account_store: AccountStore,
    pub ledger: InvalidationLedger,
    pub tokens: Arc<TokenEngine>,
    pub rating: RatingEngine,
    pub cleanup: CleanupCoordinator,
    pub accounts: AccountService,
    pub reconciler: Reconciler,
    pub health: HealthChecker,
}

impl Backend {
    /// Open both stores, run migrations and build the engines
    pub fn open(config: &Config) -> Result<Self, OpenError> {
        let content = open_store("content", &config.content_store)?;
        let account = open_store("account", &config.account_store)?;
        let key = SigningKey::from_config(config.token.secret.as_deref())?;

        Self::from_stores(content, account, &key, config.token.validity)
    }

    /// Build over already opened stores; pending migrations are applied
    pub fn from_stores(
        content: SqlExecutor,
        account: SqlExecutor,
        key: &SigningKey,
        validity: Duration,
    ) -> Result<Self, OpenError> {
        let content_store = ContentStore::new(content.clone());
        let account_store = AccountStore::new(account.clone());

        content_store
            .migrate()
            .map_err(|source| OpenError::Store { store: "content", source })?;
        account_store
            .migrate()
            .map_err(|source| OpenError::Store { store: "account", source })?;

        let ledger = InvalidationLedger::new(account.clone());
        let tokens = Arc::new(TokenEngine::new(key, validity, account_store.clone(), ledger.clone()));
        let rating = RatingEngine::new(content_store.clone(), account_store.clone());
        let cleanup = CleanupCoordinator::new(rating.clone(), account_store.clone(), tokens.clone());
        let accounts = AccountService::new(account_store.clone(), tokens.clone(), cleanup.clone());
        let reconciler = Reconciler::new(content_store.clone(), account_store.clone(), rating.clone());
        let health = HealthChecker::new(env!("CARGO_PKG_VERSION"), vec![content, account]);

        Ok(Self {
            content_store,
            account_store,
            ledger,
            tokens,
            rating,
            cleanup,
            accounts,
            reconciler,
            health,
        })
    }

    /// Validate `token`, then apply a vote on behalf of its holder
    pub async fn vote(&self, token: &str, op: VoteOp, item: ItemId) -> CoreResult<Principal> {
        let principal = self.tokens.fully_validate(token).await?;
        self.rating.apply(op, principal.account_id, item).await?;
        Ok(principal)
    }
}

fn open_store(name: &'static str, config: &StoreConfig) -> Result<SqlExecutor, OpenError> {
    let result = if config.is_memory() {
        SqlExecutor::memory(name)
    } else {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        SqlExecutor::open(name, &config.path, config.pool_size, config.connection_timeout)
    };

    result.map_err(|source| OpenError::Store { store: name, source })
}
