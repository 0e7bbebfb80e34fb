use flowgate_core::{AppError, AppResult, ProjectId, WorkspaceId};
use flowgate_domain::{
    ActionDefinition, ActionOutcome, DefinitionDescriptor, RunResult, TriggerDefinition,
};
use serde_json::{Map, Value};

use crate::action_runner::ActionRunner;
use crate::execution_ports::ExecutionRequest;
use crate::trigger_runner::TriggerRunner;

/// Adjustments applied when describing a definition as an agent tool.
#[derive(Debug, Clone, Default)]
pub struct ToolOptions {
    /// Replacement parameter schema; the descriptor's schema otherwise.
    pub schema_override: Option<Value>,
    /// Note appended to the description for connection-requiring tools.
    pub connection_description: Option<String>,
}

/// Agent-facing description of one callable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTool {
    /// Tool name, the definition key.
    pub name: String,
    /// Tool description shown to the model.
    pub description: String,
    /// JSON schema of the tool's parameters.
    pub parameter_schema: Value,
}

/// Scope and configuration carried into one agent tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallContext {
    /// Workspace the agent operates in.
    pub workspace_id: WorkspaceId,
    /// Project the agent operates in.
    pub project_id: ProjectId,
    /// Workflow hosting the agent, when any.
    pub workflow_id: Option<String>,
    /// Calling agent id.
    pub agent_id: Option<String>,
    /// Connection pre-selected for the tool, when the definition needs
    /// one. The model never chooses credentials itself.
    pub connection_id: Option<String>,
    /// Operator-pinned configuration keys; these stomp whatever the
    /// model supplied.
    pub config_overrides: Value,
}

impl ToolCallContext {
    /// Creates a context with the required scope fields.
    #[must_use]
    pub fn new(workspace_id: WorkspaceId, project_id: ProjectId) -> Self {
        Self {
            workspace_id,
            project_id,
            workflow_id: None,
            agent_id: None,
            connection_id: None,
            config_overrides: Value::Null,
        }
    }

    /// Scopes the context to a workflow.
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Attaches the calling agent id.
    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Pre-selects the connection used by the tool.
    #[must_use]
    pub fn with_connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    /// Pins configuration keys over model-supplied arguments.
    #[must_use]
    pub fn with_config_overrides(mut self, config_overrides: Value) -> Self {
        self.config_overrides = config_overrides;
        self
    }
}

/// Exposes actions and triggers as agent tools.
///
/// Tool calls bypass workflow input resolution: the model supplies
/// literal arguments, so there are no placeholders to substitute.
#[derive(Clone)]
pub struct ToolAdapter {
    actions: ActionRunner,
    triggers: TriggerRunner,
}

impl ToolAdapter {
    /// Creates a tool adapter over the two runners.
    #[must_use]
    pub fn new(actions: ActionRunner, triggers: TriggerRunner) -> Self {
        Self { actions, triggers }
    }

    /// Describes a definition as an agent tool.
    #[must_use]
    pub fn describe(descriptor: &DefinitionDescriptor, options: &ToolOptions) -> AgentTool {
        let mut description = descriptor
            .description()
            .unwrap_or_else(|| descriptor.name())
            .to_owned();

        if descriptor.needs_connection()
            && let Some(note) = options.connection_description.as_deref()
        {
            description.push_str("\n\n");
            description.push_str(note);
        }

        let parameter_schema = options
            .schema_override
            .clone()
            .unwrap_or_else(|| descriptor.ai_schema().clone());

        AgentTool {
            name: descriptor.key().to_owned(),
            description,
            parameter_schema,
        }
    }

    /// Calls an action as a tool.
    pub async fn call_action(
        &self,
        definition: &ActionDefinition,
        context: &ToolCallContext,
        arguments: Value,
    ) -> AppResult<ActionOutcome> {
        let request = build_request(definition.descriptor(), context, arguments)?;
        self.actions.run(definition, &request).await
    }

    /// Calls a trigger as a tool, returning the filtered result.
    pub async fn call_trigger(
        &self,
        definition: &TriggerDefinition,
        context: &ToolCallContext,
        arguments: Value,
    ) -> AppResult<RunResult> {
        let request = build_request(definition.descriptor(), context, arguments)?;
        self.triggers.invoke(definition, &request).await
    }
}

/// Builds the execution request for one tool call.
fn build_request(
    descriptor: &DefinitionDescriptor,
    context: &ToolCallContext,
    arguments: Value,
) -> AppResult<ExecutionRequest> {
    if !descriptor.available_to_agents() {
        return Err(AppError::Validation(format!(
            "definition '{}' is not available to agents",
            descriptor.key()
        )));
    }

    let mut config = match arguments {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(AppError::Validation(format!(
                "tool arguments for '{}' must be an object, got {other}",
                descriptor.key()
            )));
        }
    };

    if let Some(connection_id) = context.connection_id.as_deref() {
        config.insert(
            "connectionId".to_owned(),
            Value::String(connection_id.to_owned()),
        );
    }

    if let Value::Object(overrides) = &context.config_overrides {
        for (key, value) in overrides {
            config.insert(key.clone(), value.clone());
        }
    }

    let mut request = ExecutionRequest::new(
        Value::Object(config),
        format!("tool:{}", descriptor.key()),
        context.workspace_id,
        context.project_id,
    )
    .with_skip_input_resolution();

    if let Some(workflow_id) = context.workflow_id.as_deref() {
        request = request.with_workflow_id(workflow_id);
    }
    if let Some(agent_id) = context.agent_id.as_deref() {
        request = request.with_agent_id(agent_id);
    }

    Ok(request)
}
