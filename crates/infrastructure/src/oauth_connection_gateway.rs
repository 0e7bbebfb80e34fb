use std::collections::HashMap;

use async_trait::async_trait;
use flowgate_application::ConnectionGateway;
use flowgate_core::{AppError, AppResult, WorkspaceId};
use flowgate_domain::Connection;
use serde::Deserialize;
use tokio::sync::RwLock;

/// OAuth token endpoint configuration for one connection type.
#[derive(Debug, Clone)]
pub struct OAuthEndpoint {
    /// Token endpoint URL.
    pub token_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

/// Connection gateway refreshing tokens through the OAuth
/// refresh-token grant.
///
/// A connection type supports refresh when a token endpoint is
/// registered for it. Refreshed tokens are persisted before the
/// refreshed record is returned; the provider may rotate the refresh
/// token, in which case the rotated one replaces the stored one.
pub struct OAuthConnectionGateway {
    http_client: reqwest::Client,
    endpoints: HashMap<String, OAuthEndpoint>,
    connections: RwLock<HashMap<String, Connection>>,
}

impl OAuthConnectionGateway {
    /// Creates a gateway with no registered endpoints.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            endpoints: HashMap::new(),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Registers the token endpoint for a connection type.
    #[must_use]
    pub fn with_endpoint(
        mut self,
        connection_type: impl Into<String>,
        endpoint: OAuthEndpoint,
    ) -> Self {
        self.endpoints.insert(connection_type.into(), endpoint);
        self
    }

    /// Inserts or replaces a stored connection.
    pub async fn upsert(&self, connection: Connection) {
        self.connections
            .write()
            .await
            .insert(connection.id.clone(), connection);
    }

    async fn request_refreshed_tokens(
        &self,
        endpoint: &OAuthEndpoint,
        refresh_token: &str,
    ) -> AppResult<TokenResponse> {
        let response = self
            .http_client
            .post(&endpoint.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", endpoint.client_id.as_str()),
                ("client_secret", endpoint.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("token refresh request failed: {error}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(AppError::Reauthenticate(
                "refresh token was rejected by the provider".to_owned(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "token endpoint returned status {status}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|error| AppError::Internal(format!("invalid token response: {error}")))
    }
}

#[async_trait]
impl ConnectionGateway for OAuthConnectionGateway {
    async fn find_connection(&self, connection_id: &str) -> AppResult<Connection> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("connection '{connection_id}' not found")))
    }

    async fn refresh_connection(
        &self,
        connection: &Connection,
        workspace_id: WorkspaceId,
    ) -> AppResult<Connection> {
        let endpoint = self.endpoints.get(&connection.connection_type).ok_or_else(|| {
            AppError::Internal(format!(
                "connection type '{}' has no token endpoint",
                connection.connection_type
            ))
        })?;

        let refresh_token = connection.refresh_token.clone().ok_or_else(|| {
            AppError::Reauthenticate(format!(
                "connection '{}' has no refresh token",
                connection.id
            ))
        })?;

        let tokens = self
            .request_refreshed_tokens(endpoint, refresh_token.as_str())
            .await
            .inspect_err(|error| {
                tracing::warn!(
                    connection_id = %connection.id,
                    workspace_id = %workspace_id,
                    %error,
                    "connection token refresh failed"
                );
            })?;

        let refreshed = connection.clone().with_tokens(
            tokens.access_token,
            tokens.refresh_token.or(Some(refresh_token)),
        );

        self.upsert(refreshed.clone()).await;
        tracing::info!(
            connection_id = %refreshed.id,
            workspace_id = %workspace_id,
            "refreshed connection tokens"
        );

        Ok(refreshed)
    }

    fn supports_refresh(&self, connection: &Connection) -> bool {
        self.endpoints.contains_key(&connection.connection_type)
    }
}
