use async_trait::async_trait;
use flowgate_core::{AppResult, ProjectId, WorkspaceId};
use serde_json::Value;

/// One invocation of an action, trigger or field resolution.
///
/// Created per invocation and discarded afterwards; only the poll
/// cursor outlives a request, and that lives in the workflow store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Raw configuration object for the node.
    pub config_value: Value,
    /// Node being executed.
    pub node_id: String,
    /// Workflow the node belongs to, when invoked from a workflow.
    pub workflow_id: Option<String>,
    /// Agent the call originates from, when invoked as a tool.
    pub agent_id: Option<String>,
    /// Workspace owning the invocation.
    pub workspace_id: WorkspaceId,
    /// Project owning the workflow or agent.
    pub project_id: ProjectId,
    /// Execution record driving this invocation, when one exists.
    pub execution_id: Option<String>,
    /// Whether to run the mock operation instead of the real one.
    pub should_mock: bool,
    /// Whether variable/reference substitution is skipped.
    ///
    /// Tool invocations set this; agent callers do not use the
    /// workflow templating system.
    pub skip_input_resolution: bool,
}

impl ExecutionRequest {
    /// Creates a request with the required scope fields.
    #[must_use]
    pub fn new(
        config_value: Value,
        node_id: impl Into<String>,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
    ) -> Self {
        Self {
            config_value,
            node_id: node_id.into(),
            workflow_id: None,
            agent_id: None,
            workspace_id,
            project_id,
            execution_id: None,
            should_mock: false,
            skip_input_resolution: false,
        }
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

    /// Attaches the driving execution record id.
    #[must_use]
    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    /// Switches the invocation to the mock operation.
    #[must_use]
    pub fn with_mock(mut self) -> Self {
        self.should_mock = true;
        self
    }

    /// Skips variable/reference substitution.
    #[must_use]
    pub fn with_skip_input_resolution(mut self) -> Self {
        self.skip_input_resolution = true;
        self
    }
}

/// Reference to one created workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedExecution {
    /// Stable execution identifier.
    pub id: String,
}

/// Boundary to the workflow graph execution engine.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Creates one workflow execution seeded with trigger data.
    async fn create_execution(
        &self,
        workflow_id: &str,
        trigger_node_snapshot: Value,
        skip_queue: bool,
        input_data: Value,
    ) -> AppResult<CreatedExecution>;
}
