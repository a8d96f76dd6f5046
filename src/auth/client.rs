//! Bearer-authenticated JSON client

use super::refresher::TokenRefresher;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::transport::{HttpRequest, Transport};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Sends requests with the current access token.
///
/// An authentication failure triggers exactly one refresh and one retry of
/// the same request; whatever the retry yields is final. A sleeping vehicle
/// is reported as is and never retried here.
pub struct AuthenticatedClient {
    transport: Arc<dyn Transport>,
    refresher: Arc<TokenRefresher>,
    logger: StructuredLogger,
}

impl AuthenticatedClient {
    pub fn new(transport: Arc<dyn Transport>, refresher: Arc<TokenRefresher>) -> Self {
        Self {
            transport,
            refresher,
            logger: get_logger("auth"),
        }
    }

    pub fn refresher(&self) -> &Arc<TokenRefresher> {
        &self.refresher
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.execute(HttpRequest::get(url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let body = self.execute(HttpRequest::post_json(url, body)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Run `request` with bearer injection and the single refresh+retry
    pub async fn execute(&self, request: HttpRequest) -> Result<String> {
        let tokens = self.refresher.require().await?;
        let first = request.clone().with_bearer(tokens.access_token.as_str());

        match self.transport.execute(&first).await {
            Err(err) if err.is_authentication_failure() => {
                self.logger
                    .warn(&format!("{} rejected the access token, refreshing", request.url));
                let renewed = self.refresher.refresh(&tokens).await?;
                let retry = request.with_bearer(renewed.access_token);
                self.transport.execute(&retry).await
            }
            other => other,
        }
    }
}
