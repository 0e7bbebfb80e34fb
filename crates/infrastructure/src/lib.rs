//! Infrastructure adapters for the execution core ports.

#![forbid(unsafe_code)]

mod in_memory_connection_gateway;
mod in_memory_execution_gateway;
mod in_memory_notification_gateway;
mod in_memory_workflow_store;
mod json_condition_filter;
mod oauth_connection_gateway;
mod template_input_resolver;

pub use in_memory_connection_gateway::InMemoryConnectionGateway;
pub use in_memory_execution_gateway::{ExecutionRecord, InMemoryExecutionGateway};
pub use in_memory_notification_gateway::InMemoryNotificationGateway;
pub use in_memory_workflow_store::InMemoryWorkflowStore;
pub use json_condition_filter::JsonConditionFilter;
pub use oauth_connection_gateway::{OAuthConnectionGateway, OAuthEndpoint};
pub use template_input_resolver::TemplateInputResolver;
