use std::future::Future;
use std::sync::Arc;

use flowgate_core::{AppError, AppResult, UpstreamResult, WorkspaceId};
use flowgate_domain::Connection;
use serde_json::Value;

use crate::execution_ports::ConnectionGateway;

/// Classification of one attempt against an underlying operation.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Attempt succeeded.
    Ok(T),
    /// Attempt failed with an unauthorized (401) response.
    Unauthorized(flowgate_core::UpstreamError),
    /// Attempt failed for any other reason.
    Error(flowgate_core::UpstreamError),
}

impl<T> AttemptOutcome<T> {
    /// Classifies a raw attempt result by its status code.
    #[must_use]
    pub fn classify(result: UpstreamResult<T>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(error) if error.is_unauthorized() => Self::Unauthorized(error),
            Err(error) => Self::Error(error),
        }
    }
}

/// Runs an operation with the refresh-once-retry-once policy.
///
/// The operation is invoked at most twice: once up front, and once
/// more only when the first attempt was unauthorized and `refresh`
/// produced a refreshed connection. Non-401 failures and failed
/// refreshes return the original error unchanged. There is no backoff
/// and no further retry.
pub async fn with_auth_retry<T, Op, OpFut, Refresh, RefreshFut>(
    connection: Option<Connection>,
    op: Op,
    refresh: Refresh,
) -> UpstreamResult<T>
where
    Op: Fn(Option<Connection>) -> OpFut,
    OpFut: Future<Output = UpstreamResult<T>>,
    Refresh: FnOnce(Connection) -> RefreshFut,
    RefreshFut: Future<Output = Option<Connection>>,
{
    match AttemptOutcome::classify(op(connection.clone()).await) {
        AttemptOutcome::Ok(value) => Ok(value),
        AttemptOutcome::Error(error) => Err(error),
        AttemptOutcome::Unauthorized(error) => {
            let Some(connection) = connection else {
                return Err(error);
            };

            match refresh(connection).await {
                Some(refreshed) => op(Some(refreshed)).await,
                None => Err(error),
            }
        }
    }
}

/// Resolves the connection a definition requires, when it requires one.
///
/// The connection id is read from the `connectionId` configuration key.
pub(crate) async fn resolve_definition_connection(
    connections: &Arc<dyn ConnectionGateway>,
    needs_connection: bool,
    config_value: &Value,
) -> AppResult<Option<Connection>> {
    if !needs_connection {
        return Ok(None);
    }

    let connection_id = config_value
        .get("connectionId")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Connection ID is required".to_owned()))?;

    let connection = connections.find_connection(connection_id).await?;
    Ok(Some(connection))
}

/// Invokes an operation, refreshing an eligible connection on a 401.
///
/// Refresh is attempted only when the connection carries a refresh
/// token and its type supports refresh; otherwise the single attempt's
/// error stands.
pub(crate) async fn invoke_with_refresh<T, Op, OpFut>(
    connections: &Arc<dyn ConnectionGateway>,
    workspace_id: WorkspaceId,
    connection: Option<Connection>,
    op: Op,
) -> UpstreamResult<T>
where
    Op: Fn(Option<Connection>) -> OpFut,
    OpFut: Future<Output = UpstreamResult<T>>,
{
    let refreshable = connection
        .as_ref()
        .is_some_and(|record| record.has_refresh_token() && connections.supports_refresh(record));

    let gateway = Arc::clone(connections);
    with_auth_retry(connection, op, move |stale| async move {
        if !refreshable {
            return None;
        }

        gateway.refresh_connection(&stale, workspace_id).await.ok()
    })
    .await
}
