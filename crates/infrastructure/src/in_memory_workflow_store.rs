use std::collections::HashMap;

use async_trait::async_trait;
use flowgate_application::{StoredWorkflow, WorkflowPatch, WorkflowStore};
use flowgate_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// In-memory workflow store.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<String, StoredWorkflow>>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a workflow.
    pub async fn upsert(&self, workflow_id: impl Into<String>, workflow: StoredWorkflow) {
        self.workflows
            .write()
            .await
            .insert(workflow_id.into(), workflow);
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get_workflow(&self, workflow_id: &str) -> AppResult<StoredWorkflow> {
        self.workflows
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("workflow '{workflow_id}' not found")))
    }

    async fn update_workflow(&self, workflow_id: &str, patch: WorkflowPatch) -> AppResult<()> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| AppError::NotFound(format!("workflow '{workflow_id}' not found")))?;

        if let Some(is_active) = patch.is_active {
            workflow.is_active = is_active;
        }
        if let Some(cursor) = patch.poll_storage {
            workflow.poll_storage = Some(cursor);
        }
        if let Some(next) = patch.next_scheduled_execution {
            workflow.next_scheduled_execution = Some(next);
        }

        Ok(())
    }
}
