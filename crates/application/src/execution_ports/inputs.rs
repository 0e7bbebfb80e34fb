use async_trait::async_trait;
use flowgate_core::AppResult;
use serde_json::Value;

use super::ExecutionRequest;

/// Variable and reference substitution port.
#[async_trait]
pub trait InputResolver: Send + Sync {
    /// Substitutes placeholders inside the request's configuration.
    ///
    /// Failures are validation errors; a request with unresolvable
    /// placeholders never reaches the underlying operation.
    async fn resolve_inputs(&self, request: &ExecutionRequest) -> AppResult<Value>;
}

/// Trigger output condition filtering port.
#[async_trait]
pub trait ConditionFilter: Send + Sync {
    /// Applies the conditions configured on the node to raw items.
    async fn apply(&self, config_value: &Value, items: Vec<Value>) -> AppResult<Vec<Value>>;
}
