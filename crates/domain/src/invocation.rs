use flowgate_core::{ProjectId, WorkspaceId};
use serde_json::Value;

use crate::Connection;

/// Borrowed context handed to action and trigger handlers for one run.
///
/// Built fresh per invocation and discarded afterwards; the connection
/// reference is only valid for the duration of that one call.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Resolved configuration object for this node.
    pub config_value: &'a Value,
    /// Connection resolved for this invocation, when the definition
    /// requires one.
    pub connection: Option<&'a Connection>,
    /// Workspace owning the invocation.
    pub workspace_id: WorkspaceId,
    /// Project owning the workflow or agent.
    pub project_id: ProjectId,
    /// Workflow the node belongs to, when invoked from a workflow.
    pub workflow_id: Option<&'a str>,
    /// Agent the call originates from, when invoked as a tool.
    pub agent_id: Option<&'a str>,
    /// Node being executed.
    pub node_id: &'a str,
    /// Execution record driving this invocation, when one exists.
    pub execution_id: Option<&'a str>,
}
