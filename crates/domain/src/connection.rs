use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored credential record owned by the connection gateway.
///
/// Runners borrow a connection for the duration of one invocation and
/// never persist it themselves; refreshed tokens flow back through the
/// gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Stable connection identifier.
    pub id: String,
    /// Connection type key, e.g. the owning app's OAuth flavor.
    pub connection_type: String,
    /// Current access token.
    pub access_token: String,
    /// Refresh token when the connection type issues one.
    pub refresh_token: Option<String>,
    /// Opaque provider-specific metadata.
    pub metadata: Value,
}

impl Connection {
    /// Returns a copy of this connection with rotated tokens.
    #[must_use]
    pub fn with_tokens(mut self, access_token: String, refresh_token: Option<String>) -> Self {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        self
    }

    /// Returns whether the record carries a refresh token at all.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}
