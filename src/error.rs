//! Error types and handling for Surplus Charge
//!
//! Every fallible operation in the crate returns [`SurplusError`]. The auth
//! related variants double as the classification the authenticated client
//! inspects to decide whether a single token refresh is warranted.

use thiserror::Error;

/// Result type alias for Surplus Charge operations
pub type Result<T> = std::result::Result<T, SurplusError>;

/// Main error type for Surplus Charge
#[derive(Debug, Error)]
pub enum SurplusError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Request did not complete within the configured timeout
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Vehicle or auth API returned an unexpected answer
    #[error("API error: {message}")]
    Api { message: String },

    /// Login page markup could not be scraped
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Authorization code exchange did not yield both tokens
    #[error("Token exchange failed: {message}")]
    AuthExchange { message: String },

    /// Refresh grant did not yield both tokens
    #[error("Token refresh failed: {message}")]
    AuthRefresh { message: String },

    /// The API rejected the bearer token (HTTP 401)
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// The vehicle is asleep and must be woken first (HTTP 408)
    #[error("Vehicle asleep: {message}")]
    VehicleAsleep { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl SurplusError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new code exchange error
    pub fn auth_exchange<S: Into<String>>(message: S) -> Self {
        Self::AuthExchange {
            message: message.into(),
        }
    }

    /// Create a new token refresh error
    pub fn auth_refresh<S: Into<String>>(message: S) -> Self {
        Self::AuthRefresh {
            message: message.into(),
        }
    }

    /// Create a new authentication failure
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new vehicle asleep error
    pub fn vehicle_asleep<S: Into<String>>(message: S) -> Self {
        Self::VehicleAsleep {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for the 401-equivalent failure that permits one refresh and retry
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// True when the vehicle must be woken before it answers
    pub fn is_vehicle_asleep(&self) -> bool {
        matches!(self, Self::VehicleAsleep { .. })
    }
}

impl From<std::io::Error> for SurplusError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SurplusError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SurplusError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SurplusError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}
