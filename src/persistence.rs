//! Durable state: tokens, vehicle identity and home location
//!
//! Everything lives in one JSON document. Each update re-reads the file,
//! changes its own fields and writes the whole document back, so writers of
//! different sections do not clobber each other.

use crate::error::Result;
use crate::geo::GeoPoint;
use crate::logging::{StructuredLogger, get_logger};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Bearer access token and the refresh token that renews it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Which vehicle on the account is being driven
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleIdentity {
    pub vin: Option<String>,
    pub vehicle_id: Option<String>,
    pub display_name: Option<String>,
}

impl VehicleIdentity {
    /// True when the vehicle id needed for API paths is known
    pub fn is_resolved(&self) -> bool {
        self.vehicle_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// On-disk document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    pub tokens: Option<TokenPair>,
    pub vehicle: VehicleIdentity,
    pub home: Option<GeoPoint>,
}

/// Durable key/value persistence used by the auth and vehicle layers
pub trait TokenStore: Send + Sync {
    fn read(&self) -> Result<Option<TokenPair>>;

    fn write(&self, tokens: &TokenPair) -> Result<()>;

    fn read_identity(&self) -> Result<VehicleIdentity> {
        Ok(VehicleIdentity::default())
    }

    fn write_identity(&self, _identity: &VehicleIdentity) -> Result<()> {
        Ok(())
    }

    fn read_home(&self) -> Result<Option<GeoPoint>> {
        Ok(None)
    }

    fn write_home(&self, _home: GeoPoint) -> Result<()> {
        Ok(())
    }
}

/// JSON file backed [`TokenStore`]
pub struct FileTokenStore {
    path: PathBuf,
    logger: StructuredLogger,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            logger: get_logger("persistence"),
        }
    }

    /// Load the document, empty when the file does not exist yet
    pub fn load(&self) -> Result<PersistentState> {
        if !self.path.exists() {
            self.logger
                .debug("No persistent state file found, using defaults");
            return Ok(PersistentState::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(PersistentState::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, state: &PersistentState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, contents)?;
        self.logger.debug("Saved persistent state to disk");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut PersistentState)) -> Result<()> {
        let mut state = self.load()?;
        apply(&mut state);
        self.save(&state)
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<Option<TokenPair>> {
        Ok(self.load()?.tokens)
    }

    fn write(&self, tokens: &TokenPair) -> Result<()> {
        self.update(|state| state.tokens = Some(tokens.clone()))
    }

    fn read_identity(&self) -> Result<VehicleIdentity> {
        Ok(self.load()?.vehicle)
    }

    fn write_identity(&self, identity: &VehicleIdentity) -> Result<()> {
        self.update(|state| state.vehicle = identity.clone())
    }

    fn read_home(&self) -> Result<Option<GeoPoint>> {
        Ok(self.load()?.home)
    }

    fn write_home(&self, home: GeoPoint) -> Result<()> {
        self.update(|state| state.home = Some(home))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_identity_resolution() {
        let mut identity = VehicleIdentity::default();
        assert!(!identity.is_resolved());
        identity.vehicle_id = Some(String::new());
        assert!(!identity.is_resolved());
        identity.vehicle_id = Some("123".to_string());
        assert!(identity.is_resolved());
    }
}
