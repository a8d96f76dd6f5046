//! Owner of the live token pair

use super::{CLIENT_ID, SCOPE, TOKEN_URL, TokenResponse};
use crate::error::{Result, SurplusError};
use crate::logging::{StructuredLogger, get_logger};
use crate::persistence::{TokenPair, TokenStore};
use crate::transport::{HttpRequest, Transport};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Holds the in-memory tokens and renews them through the refresh grant.
///
/// Every change is written to the [`TokenStore`] before the call returns.
pub struct TokenRefresher {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    tokens: Mutex<Option<TokenPair>>,
    logger: StructuredLogger,
}

impl TokenRefresher {
    /// Start from whatever the store holds (possibly nothing yet)
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Result<Self> {
        let tokens = store.read()?;
        Ok(Self {
            transport,
            store,
            tokens: Mutex::new(tokens),
            logger: get_logger("auth"),
        })
    }

    /// Current pair, if any
    pub async fn current(&self) -> Option<TokenPair> {
        self.tokens.lock().await.clone()
    }

    /// Current pair or an authentication error asking for a login
    pub async fn require(&self) -> Result<TokenPair> {
        self.current().await.ok_or_else(|| {
            SurplusError::authentication("No access token stored, run auth-step1 first")
        })
    }

    /// Adopt a pair obtained from the code exchange
    pub async fn install(&self, pair: TokenPair) -> Result<()> {
        *self.tokens.lock().await = Some(pair.clone());
        self.store.write(&pair)
    }

    /// Exchange `current.refresh_token` for a new pair.
    ///
    /// A response without both tokens leaves the previous pair untouched.
    pub async fn refresh(&self, current: &TokenPair) -> Result<TokenPair> {
        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "client_id": CLIENT_ID,
            "refresh_token": current.refresh_token,
            "scope": SCOPE,
        });

        let raw = self
            .transport
            .execute(&HttpRequest::post_json(TOKEN_URL, body))
            .await?;
        let response: TokenResponse = serde_json::from_str(&raw)?;

        let Some(pair) = response.into_pair() else {
            self.logger
                .error("Refresh response is missing access_token or refresh_token");
            return Err(SurplusError::auth_refresh(
                "Response is missing access_token or refresh_token",
            ));
        };

        *self.tokens.lock().await = Some(pair.clone());
        self.store.write(&pair)?;
        self.logger.info("Refreshed access token");
        Ok(pair)
    }
}
