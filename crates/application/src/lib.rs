//! Execution core services and ports.
//!
//! Everything an action or trigger invocation needs flows through this
//! crate: credential-aware invocation with a single refresh-and-retry,
//! poll dedup strategies, execution creation, dynamic field resolution
//! and the agent tool surface. External collaborators (credential
//! storage, execution queue, workflow store, notifications) are
//! reached exclusively through the ports in [`execution_ports`].

#![forbid(unsafe_code)]

mod action_runner;
mod auth_retry;
mod dynamic_fields;
mod execution_ports;
mod tool_adapter;
mod trigger_runner;

pub use action_runner::ActionRunner;
pub use auth_retry::{AttemptOutcome, with_auth_retry};
pub use dynamic_fields::{DynamicFieldResolver, DynamicOptionsRequest};
pub use execution_ports::{
    ConditionFilter, ConnectionGateway, CreatedExecution, ExecutionGateway, ExecutionRequest,
    InputResolver, NotificationGateway, NotificationInput, StoredWorkflow, WorkflowPatch,
    WorkflowStore,
};
pub use tool_adapter::{AgentTool, ToolAdapter, ToolCallContext, ToolOptions};
pub use trigger_runner::{
    DedupOutcome, TriggerCheckReport, TriggerRunner, dedup_by_item, dedup_by_length, dedup_by_time,
};
