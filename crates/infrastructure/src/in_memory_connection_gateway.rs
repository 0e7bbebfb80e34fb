use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use flowgate_application::ConnectionGateway;
use flowgate_core::{AppError, AppResult, WorkspaceId};
use flowgate_domain::Connection;
use tokio::sync::RwLock;

/// In-memory connection storage with simulated token rotation.
#[derive(Default)]
pub struct InMemoryConnectionGateway {
    connections: RwLock<HashMap<String, Connection>>,
    refreshable_types: HashSet<String>,
    rotations: AtomicU64,
}

impl InMemoryConnectionGateway {
    /// Creates an empty gateway where no connection type supports
    /// refresh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a connection type as refresh-capable.
    #[must_use]
    pub fn with_refreshable_type(mut self, connection_type: impl Into<String>) -> Self {
        self.refreshable_types.insert(connection_type.into());
        self
    }

    /// Inserts or replaces a stored connection.
    pub async fn upsert(&self, connection: Connection) {
        self.connections
            .write()
            .await
            .insert(connection.id.clone(), connection);
    }
}

#[async_trait]
impl ConnectionGateway for InMemoryConnectionGateway {
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
        _workspace_id: WorkspaceId,
    ) -> AppResult<Connection> {
        let refresh_token = connection.refresh_token.clone().ok_or_else(|| {
            AppError::Reauthenticate(format!(
                "connection '{}' has no refresh token",
                connection.id
            ))
        })?;

        let rotation = self.rotations.fetch_add(1, Ordering::SeqCst) + 1;
        let refreshed = connection.clone().with_tokens(
            format!("access-{rotation}"),
            Some(refresh_token),
        );

        self.upsert(refreshed.clone()).await;
        Ok(refreshed)
    }

    fn supports_refresh(&self, connection: &Connection) -> bool {
        self.refreshable_types.contains(&connection.connection_type)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use flowgate_application::ConnectionGateway;
    use flowgate_core::WorkspaceId;
    use flowgate_domain::Connection;

    use super::InMemoryConnectionGateway;

    fn connection(id: &str, connection_type: &str) -> Connection {
        Connection {
            id: id.to_owned(),
            connection_type: connection_type.to_owned(),
            access_token: "access-0".to_owned(),
            refresh_token: Some("refresh-0".to_owned()),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn refresh_rotates_and_persists_the_access_token() {
        let gateway = InMemoryConnectionGateway::new().with_refreshable_type("oauth2");
        gateway.upsert(connection("conn-1", "oauth2")).await;

        let stale = gateway
            .find_connection("conn-1")
            .await
            .unwrap_or_else(|_| unreachable!());
        let refreshed = gateway
            .refresh_connection(&stale, WorkspaceId::new())
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_ne!(refreshed.access_token, stale.access_token);

        let stored = gateway
            .find_connection("conn-1")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(stored.access_token, refreshed.access_token);
    }

    #[tokio::test]
    async fn refresh_capability_is_per_connection_type() {
        let gateway = InMemoryConnectionGateway::new().with_refreshable_type("oauth2");

        assert!(gateway.supports_refresh(&connection("a", "oauth2")));
        assert!(!gateway.supports_refresh(&connection("b", "api_key")));
    }
}
