use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use flowgate_application::{CreatedExecution, ExecutionGateway};
use flowgate_core::AppResult;
use serde_json::Value;
use tokio::sync::RwLock;

/// One execution captured by the in-memory gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    /// Assigned execution id.
    pub id: String,
    /// Workflow the execution belongs to.
    pub workflow_id: String,
    /// Trigger node snapshot captured at creation.
    pub trigger_node_snapshot: Value,
    /// Whether queueing was skipped.
    pub skip_queue: bool,
    /// Seed input data.
    pub input_data: Value,
}

/// In-memory execution gateway assigning monotonic ids.
#[derive(Default)]
pub struct InMemoryExecutionGateway {
    records: RwLock<Vec<ExecutionRecord>>,
    next_id: AtomicU64,
}

impl InMemoryExecutionGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured executions in creation order.
    pub async fn executions(&self) -> Vec<ExecutionRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl ExecutionGateway for InMemoryExecutionGateway {
    async fn create_execution(
        &self,
        workflow_id: &str,
        trigger_node_snapshot: Value,
        skip_queue: bool,
        input_data: Value,
    ) -> AppResult<CreatedExecution> {
        let id = format!("exec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        self.records.write().await.push(ExecutionRecord {
            id: id.clone(),
            workflow_id: workflow_id.to_owned(),
            trigger_node_snapshot,
            skip_queue,
            input_data,
        });

        Ok(CreatedExecution { id })
    }
}
