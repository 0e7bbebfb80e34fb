use std::sync::Arc;

use flowgate_core::{AppError, AppResult, ProjectId, WorkspaceId};
use flowgate_domain::{DefinitionDescriptor, DynamicOptionsContext, FieldOption};
use serde_json::Value;

use crate::auth_retry::{invoke_with_refresh, resolve_definition_connection};
use crate::execution_ports::ConnectionGateway;

/// One request to resolve the option list of a dynamic field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicOptionsRequest {
    /// Dotted path of the field on the owning definition.
    pub field_path: String,
    /// Current configuration of the owning node, including the
    /// `connectionId` when the definition requires one.
    pub config_value: Value,
    /// Caller-supplied extra options, e.g. values of sibling fields.
    pub extra_options: Value,
    /// Workspace scope of the resolution.
    pub workspace_id: WorkspaceId,
    /// Project scope of the resolution.
    pub project_id: ProjectId,
    /// Workflow the field belongs to, when resolved from a workflow.
    pub workflow_id: Option<String>,
    /// Agent the resolution originates from, when any.
    pub agent_id: Option<String>,
}

impl DynamicOptionsRequest {
    /// Creates a request with the required scope fields.
    #[must_use]
    pub fn new(
        field_path: impl Into<String>,
        config_value: Value,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            config_value,
            extra_options: Value::Null,
            workspace_id,
            project_id,
            workflow_id: None,
            agent_id: None,
        }
    }

    /// Attaches caller-supplied extra options.
    #[must_use]
    pub fn with_extra_options(mut self, extra_options: Value) -> Self {
        self.extra_options = extra_options;
        self
    }

    /// Scopes the request to a workflow.
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Scopes the request to an agent.
    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

/// Resolves dynamic option lists for configuration fields.
///
/// Field lookup failures and missing providers are validation errors.
/// Upstream failures are classified: a 401 that survives the refresh
/// policy asks the user to reauthenticate, anything else is internal.
#[derive(Clone)]
pub struct DynamicFieldResolver {
    connections: Arc<dyn ConnectionGateway>,
}

impl DynamicFieldResolver {
    /// Creates a dynamic field resolver.
    #[must_use]
    pub fn new(connections: Arc<dyn ConnectionGateway>) -> Self {
        Self { connections }
    }

    /// Resolves the current option list of one field.
    pub async fn resolve_options(
        &self,
        descriptor: &DefinitionDescriptor,
        request: &DynamicOptionsRequest,
    ) -> AppResult<Vec<FieldOption>> {
        let field = descriptor.field_at_path(&request.field_path)?;
        let provider = field.dynamic_options().ok_or_else(|| {
            AppError::Validation(format!(
                "field '{}' does not have a function to get dynamic values",
                request.field_path
            ))
        })?;

        let connection = resolve_definition_connection(
            &self.connections,
            descriptor.needs_connection(),
            &request.config_value,
        )
        .await?;

        let options = invoke_with_refresh(
            &self.connections,
            request.workspace_id,
            connection,
            |connection| {
                let provider = Arc::clone(provider);
                async move {
                    let context = DynamicOptionsContext {
                        connection: connection.as_ref(),
                        extra_options: &request.extra_options,
                        workspace_id: request.workspace_id,
                        project_id: request.project_id,
                        workflow_id: request.workflow_id.as_deref(),
                        agent_id: request.agent_id.as_deref(),
                    };
                    provider.get_dynamic_values(context).await
                }
            },
        )
        .await;

        match options {
            Ok(options) => Ok(options),
            Err(error) if error.is_unauthorized() => Err(AppError::Reauthenticate(format!(
                "connection for field '{}' is no longer authorized",
                request.field_path
            ))),
            Err(error) => {
                let fallback = format!("resolving options for field '{}' failed", request.field_path);
                Err(AppError::Internal(error.failure_message(fallback.as_str())))
            }
        }
    }
}
