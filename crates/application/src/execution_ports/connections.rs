use async_trait::async_trait;
use flowgate_core::{AppResult, WorkspaceId};
use flowgate_domain::Connection;

/// Credential storage and refresh port.
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    /// Resolves a connection record by id.
    ///
    /// Missing connections are a hard error; an invocation cannot
    /// proceed against a dangling connection id.
    async fn find_connection(&self, connection_id: &str) -> AppResult<Connection>;

    /// Refreshes the connection's tokens and persists them.
    ///
    /// Returns the refreshed record for the immediate retry; the
    /// stored copy is updated as a side effect.
    async fn refresh_connection(
        &self,
        connection: &Connection,
        workspace_id: WorkspaceId,
    ) -> AppResult<Connection>;

    /// Returns whether the connection's type supports token refresh.
    ///
    /// Absence of this capability means a 401 is terminal for the
    /// invocation.
    fn supports_refresh(&self, connection: &Connection) -> bool;
}
