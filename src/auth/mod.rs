//! OAuth2 login and token handling for the vehicle API
//!
//! Split into the PKCE handshake, login-page scraping, the token refresher
//! that owns the live token pair, and the authenticated request client.

pub mod client;
pub mod login_form;
pub mod pkce;
pub mod refresher;

pub use client::AuthenticatedClient;
pub use login_form::{HtmlLoginFormFetcher, LoginFormFetcher, parse_hidden_inputs};
pub use pkce::{PkceAuthFlow, PkceSession};
pub use refresher::TokenRefresher;

use crate::persistence::TokenPair;
use serde::Deserialize;

pub const AUTHORIZE_URL: &str = "https://auth.tesla.com/oauth2/v3/authorize";
pub const TOKEN_URL: &str = "https://auth.tesla.com/oauth2/v3/token";
pub const CLIENT_ID: &str = "ownerapi";
pub const REDIRECT_URI: &str = "https://auth.tesla.com/void/callback";
pub const SCOPE: &str = "openid email offline_access";

/// Token endpoint answer for both grant types
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    pub state: Option<String>,
}

impl TokenResponse {
    /// Both tokens, or `None` when either is missing or empty
    pub fn into_pair(self) -> Option<TokenPair> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(TokenPair::new(access, refresh))
            }
            _ => None,
        }
    }
}
