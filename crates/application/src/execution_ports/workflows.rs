use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::AppResult;
use flowgate_domain::PollCursor;

/// Workflow fields the execution core reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredWorkflow {
    /// Whether the workflow is active for automatic triggers.
    pub is_active: bool,
    /// Persisted poll dedup cursor, when one has been seeded.
    pub poll_storage: Option<PollCursor>,
    /// Next fire time persisted for schedule triggers.
    pub next_scheduled_execution: Option<DateTime<Utc>>,
}

/// Partial update applied to a stored workflow.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowPatch {
    /// Activation flag update.
    pub is_active: Option<bool>,
    /// Poll cursor update.
    pub poll_storage: Option<PollCursor>,
    /// Next schedule update.
    pub next_scheduled_execution: Option<DateTime<Utc>>,
}

/// Persistence port for the workflow fields owned by external storage.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Reads the execution-relevant fields of one workflow.
    async fn get_workflow(&self, workflow_id: &str) -> AppResult<StoredWorkflow>;

    /// Applies a partial update to one workflow.
    async fn update_workflow(&self, workflow_id: &str, patch: WorkflowPatch) -> AppResult<()>;
}
