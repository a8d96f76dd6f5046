//! Authorization-code-with-PKCE handshake

use super::login_form::LoginFormFetcher;
use super::{AUTHORIZE_URL, CLIENT_ID, REDIRECT_URI, SCOPE, TOKEN_URL, TokenResponse};
use crate::error::{Result, SurplusError};
use crate::logging::{StructuredLogger, get_logger};
use crate::persistence::TokenPair;
use crate::transport::{HttpRequest, RequestBody, Transport};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const VERIFIER_LEN: usize = 86;
pub const STATE_LEN: usize = 10;

/// Secrets binding one authorize request to its code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceSession {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PkceSession {
    /// Fresh verifier, its challenge and a random state token
    pub fn create_verifier() -> Self {
        Self::from_verifier(random_alphanumeric(VERIFIER_LEN))
    }

    /// Rebuild a session around a verifier handed back by the user
    pub fn from_verifier(code_verifier: impl Into<String>) -> Self {
        let code_verifier = code_verifier.into();
        Self {
            code_challenge: code_challenge(&code_verifier),
            code_verifier,
            state: random_alphanumeric(STATE_LEN),
        }
    }

    /// Authorize endpoint URL the user opens to log in
    pub fn authorize_url(&self, email: Option<&str>) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("client_id", CLIENT_ID)
            .append_pair("code_challenge", &self.code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("redirect_uri", REDIRECT_URI)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPE)
            .append_pair("state", &self.state);
        if let Some(hint) = email.filter(|e| !e.is_empty()) {
            query.append_pair("login_hint", hint);
        }
        format!("{}?{}", AUTHORIZE_URL, query.finish())
    }
}

/// base64url (unpadded) SHA-256 of the verifier
pub fn code_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Network half of the handshake
pub struct PkceAuthFlow {
    transport: Arc<dyn Transport>,
    form_fetcher: Box<dyn LoginFormFetcher>,
    logger: StructuredLogger,
}

impl PkceAuthFlow {
    pub fn new(transport: Arc<dyn Transport>, form_fetcher: Box<dyn LoginFormFetcher>) -> Self {
        Self {
            transport,
            form_fetcher,
            logger: get_logger("auth"),
        }
    }

    /// Hidden input fields of the login page
    pub async fn fetch_login_form(&self, url: &str) -> Result<BTreeMap<String, String>> {
        let fields = self.form_fetcher.fetch(url).await?;
        self.logger
            .debug(&format!("Login form carries {} hidden fields", fields.len()));
        Ok(fields)
    }

    /// Post the identity and scraped fields back to the authorize endpoint.
    ///
    /// The password is not part of the request body; the login itself is
    /// finished in the browser.
    pub async fn submit_credentials(
        &self,
        session: &PkceSession,
        email: &str,
        _password: &str,
        form_fields: &BTreeMap<String, String>,
    ) -> Result<()> {
        if form_fields.is_empty() {
            return Err(SurplusError::parse("Login form has no hidden input fields"));
        }

        let mut body = vec![("identity".to_string(), email.to_string())];
        body.extend(
            form_fields
                .iter()
                .filter(|(key, _)| key.as_str() != "identity")
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        let request = HttpRequest::post(session.authorize_url(None), RequestBody::Form(body));
        self.transport.execute(&request).await?;
        self.logger.info("Submitted login identity");
        Ok(())
    }

    /// Trade the authorization code for a token pair
    pub async fn exchange_code(&self, session: &PkceSession, code: &str) -> Result<TokenPair> {
        let body = serde_json::json!({
            "grant_type": "authorization_code",
            "client_id": CLIENT_ID,
            "code": code,
            "code_verifier": session.code_verifier,
            "redirect_uri": REDIRECT_URI,
        });

        let raw = self
            .transport
            .execute(&HttpRequest::post_json(TOKEN_URL, body))
            .await?;
        let response: TokenResponse = serde_json::from_str(&raw)?;

        let pair = response.into_pair().ok_or_else(|| {
            SurplusError::auth_exchange("Response is missing access_token or refresh_token")
        })?;
        self.logger.info("Exchanged authorization code for tokens");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_challenge() {
        // Appendix B of RFC 7636
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuEJSstw-cM"
        );
    }

    #[test]
    fn test_session_shape() {
        let session = PkceSession::create_verifier();
        assert_eq!(session.code_verifier.len(), VERIFIER_LEN);
        assert!(session.code_verifier.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(session.state.len(), STATE_LEN);
        assert_eq!(session.code_challenge, code_challenge(&session.code_verifier));
        assert!(!session.code_challenge.contains(['+', '/', '=']));
        assert_eq!(session.code_challenge.len(), 43);
    }

    #[test]
    fn test_authorize_url_carries_challenge() {
        let session = PkceSession::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        let url = url::Url::parse(&session.authorize_url(Some("me@example.com"))).unwrap();
        let query: BTreeMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/oauth2/v3/authorize");
        assert_eq!(query["client_id"], CLIENT_ID);
        assert_eq!(query["code_challenge"], "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuEJSstw-cM");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["redirect_uri"], REDIRECT_URI);
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], SCOPE);
        assert_eq!(query["state"], session.state);
        assert_eq!(query["login_hint"], "me@example.com");
    }

    #[test]
    fn test_authorize_url_without_hint() {
        let session = PkceSession::create_verifier();
        assert!(!session.authorize_url(None).contains("login_hint"));
        assert!(!session.authorize_url(Some("")).contains("login_hint"));
    }
}
