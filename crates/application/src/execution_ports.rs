mod connections;
mod executions;
mod inputs;
mod notifications;
mod workflows;

pub use connections::ConnectionGateway;
pub use executions::{CreatedExecution, ExecutionGateway, ExecutionRequest};
pub use inputs::{ConditionFilter, InputResolver};
pub use notifications::{NotificationGateway, NotificationInput};
pub use workflows::{StoredWorkflow, WorkflowPatch, WorkflowStore};
