use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use flowgate_core::{
    AppError, AppResult, ProjectId, UpstreamError, UpstreamResult, WorkspaceId,
};
use flowgate_domain::{
    Connection, DefinitionDescriptor, DescriptorInput, Invocation, PollCursor, TriggerDefinition,
    TriggerHandler, TriggerStrategy,
};

use crate::execution_ports::{
    ConditionFilter, ConnectionGateway, CreatedExecution, ExecutionGateway, ExecutionRequest,
    InputResolver, NotificationGateway, NotificationInput, StoredWorkflow, WorkflowPatch,
    WorkflowStore,
};

use super::TriggerRunner;

struct NoConnectionGateway;

#[async_trait]
impl ConnectionGateway for NoConnectionGateway {
    async fn find_connection(&self, connection_id: &str) -> AppResult<Connection> {
        Err(AppError::NotFound(format!(
            "connection '{connection_id}' not found"
        )))
    }

    async fn refresh_connection(
        &self,
        connection: &Connection,
        _workspace_id: WorkspaceId,
    ) -> AppResult<Connection> {
        Ok(connection.clone())
    }

    fn supports_refresh(&self, _connection: &Connection) -> bool {
        false
    }
}

struct PassthroughInputResolver;

#[async_trait]
impl InputResolver for PassthroughInputResolver {
    async fn resolve_inputs(&self, request: &ExecutionRequest) -> AppResult<Value> {
        Ok(request.config_value.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedExecution {
    workflow_id: String,
    snapshot: Value,
    input_data: Value,
}

#[derive(Default)]
struct FakeExecutionGateway {
    created: Mutex<Vec<RecordedExecution>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl ExecutionGateway for FakeExecutionGateway {
    async fn create_execution(
        &self,
        workflow_id: &str,
        trigger_node_snapshot: Value,
        _skip_queue: bool,
        input_data: Value,
    ) -> AppResult<CreatedExecution> {
        self.created.lock().await.push(RecordedExecution {
            workflow_id: workflow_id.to_owned(),
            snapshot: trigger_node_snapshot,
            input_data,
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreatedExecution {
            id: format!("exec-{id}"),
        })
    }
}

struct FakeWorkflowStore {
    workflow: Mutex<StoredWorkflow>,
    patches: Mutex<Vec<WorkflowPatch>>,
}

impl FakeWorkflowStore {
    fn with_cursor(cursor: Option<PollCursor>) -> Self {
        Self {
            workflow: Mutex::new(StoredWorkflow {
                is_active: true,
                poll_storage: cursor,
                next_scheduled_execution: None,
            }),
            patches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WorkflowStore for FakeWorkflowStore {
    async fn get_workflow(&self, _workflow_id: &str) -> AppResult<StoredWorkflow> {
        Ok(self.workflow.lock().await.clone())
    }

    async fn update_workflow(&self, _workflow_id: &str, patch: WorkflowPatch) -> AppResult<()> {
        let mut workflow = self.workflow.lock().await;
        if let Some(is_active) = patch.is_active {
            workflow.is_active = is_active;
        }
        if let Some(cursor) = patch.poll_storage.clone() {
            workflow.poll_storage = Some(cursor);
        }
        if let Some(next) = patch.next_scheduled_execution {
            workflow.next_scheduled_execution = Some(next);
        }
        self.patches.lock().await.push(patch);
        Ok(())
    }
}

struct FakeNotificationGateway {
    member_ids: Vec<String>,
    notifications: Mutex<Vec<NotificationInput>>,
}

impl FakeNotificationGateway {
    fn with_members(member_ids: &[&str]) -> Self {
        Self {
            member_ids: member_ids.iter().map(|id| (*id).to_owned()).collect(),
            notifications: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotificationGateway for FakeNotificationGateway {
    async fn create_notification(&self, input: NotificationInput) -> AppResult<()> {
        self.notifications.lock().await.push(input);
        Ok(())
    }

    async fn list_project_member_ids(&self, _project_id: ProjectId) -> AppResult<Vec<String>> {
        Ok(self.member_ids.clone())
    }
}

struct PassthroughConditionFilter;

#[async_trait]
impl ConditionFilter for PassthroughConditionFilter {
    async fn apply(&self, _config_value: &Value, items: Vec<Value>) -> AppResult<Vec<Value>> {
        Ok(items)
    }
}

struct DroppingConditionFilter;

#[async_trait]
impl ConditionFilter for DroppingConditionFilter {
    async fn apply(&self, _config_value: &Value, _items: Vec<Value>) -> AppResult<Vec<Value>> {
        Ok(Vec::new())
    }
}

struct ScriptedTriggerHandler {
    output: UpstreamResult<Value>,
    next_schedule: Option<UpstreamResult<DateTime<Utc>>>,
}

impl ScriptedTriggerHandler {
    fn returning(output: Value) -> Self {
        Self {
            output: Ok(output),
            next_schedule: None,
        }
    }

    fn failing(error: UpstreamError) -> Self {
        Self {
            output: Err(error),
            next_schedule: None,
        }
    }

    fn scheduled(output: Value, next_schedule: UpstreamResult<DateTime<Utc>>) -> Self {
        Self {
            output: Ok(output),
            next_schedule: Some(next_schedule),
        }
    }
}

#[async_trait]
impl TriggerHandler for ScriptedTriggerHandler {
    async fn run(&self, _invocation: Invocation<'_>) -> UpstreamResult<Value> {
        self.output.clone()
    }

    async fn next_schedule(&self, _invocation: Invocation<'_>) -> UpstreamResult<DateTime<Utc>> {
        match &self.next_schedule {
            Some(result) => result.clone(),
            None => Err(UpstreamError::new("no schedule scripted")),
        }
    }
}

fn descriptor(key: &str) -> DefinitionDescriptor {
    DefinitionDescriptor::new(DescriptorInput {
        key: key.to_owned(),
        name: "New Row".to_owned(),
        description: None,
        input_fields: Vec::new(),
        ai_schema: json!({"type": "object"}),
        needs_connection: false,
        available_to_agents: false,
        view_hints: None,
    })
    .unwrap_or_else(|_| unreachable!())
}

fn definition(strategy: TriggerStrategy, handler: ScriptedTriggerHandler) -> TriggerDefinition {
    TriggerDefinition::new(descriptor("new_row"), strategy, Arc::new(handler))
}

fn request() -> ExecutionRequest {
    ExecutionRequest::new(json!({}), "node-1", WorkspaceId::new(), ProjectId::new())
        .with_workflow_id("wf-1")
}

struct Harness {
    runner: TriggerRunner,
    executions: Arc<FakeExecutionGateway>,
    workflows: Arc<FakeWorkflowStore>,
    notifications: Arc<FakeNotificationGateway>,
}

fn harness(cursor: Option<PollCursor>, filter: Arc<dyn ConditionFilter>) -> Harness {
    let executions = Arc::new(FakeExecutionGateway::default());
    let workflows = Arc::new(FakeWorkflowStore::with_cursor(cursor));
    let notifications = Arc::new(FakeNotificationGateway::with_members(&["user-1", "user-2"]));
    let runner = TriggerRunner::new(
        Arc::new(NoConnectionGateway),
        Arc::new(PassthroughInputResolver),
        executions.clone(),
        workflows.clone(),
        notifications.clone(),
        filter,
    );
    Harness {
        runner,
        executions,
        workflows,
        notifications,
    }
}

#[tokio::test]
async fn manual_failure_is_reported_inline() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::Manual,
        ScriptedTriggerHandler::failing(UpstreamError::new("rate limited")),
    );

    let report = harness
        .runner
        .run_check(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(report.result.failure(), Some("rate limited"));
    assert!(report.executions.is_empty());
    assert!(harness.workflows.patches.lock().await.is_empty());
    assert!(harness.notifications.notifications.lock().await.is_empty());
}

#[tokio::test]
async fn automatic_failure_deactivates_and_notifies() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::PollTime,
        ScriptedTriggerHandler::failing(UpstreamError::new("token revoked")),
    );

    let result = harness.runner.run_check(&definition, &request()).await;

    assert!(matches!(
        result,
        Err(AppError::Internal(message)) if message == "token revoked"
    ));

    let workflow = harness.workflows.workflow.lock().await;
    assert!(!workflow.is_active);

    let notifications = harness.notifications.notifications.lock().await;
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].recipient_id, "user-1");
    assert_eq!(notifications[0].title, "Workflow deactivated");
    assert!(notifications[0].message.contains("token revoked"));
}

#[tokio::test]
async fn time_poll_delivers_new_items_and_persists_cursor() {
    let harness = harness(
        Some(PollCursor::new("100")),
        Arc::new(PassthroughConditionFilter),
    );
    let definition = definition(
        TriggerStrategy::PollTime,
        ScriptedTriggerHandler::returning(json!([
            {"timestamp": 100, "row": "old"},
            {"timestamp": 150, "row": "a"},
            {"timestamp": 200, "row": "b"},
        ])),
    );

    let report = harness
        .runner
        .run_check(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(report.executions.len(), 2);

    let created = harness.executions.created.lock().await;
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].input_data, json!({"timestamp": 150, "row": "a"}));
    assert_eq!(created[1].input_data, json!({"timestamp": 200, "row": "b"}));
    assert_eq!(created[0].workflow_id, "wf-1");
    assert_eq!(created[0].snapshot["triggerKey"], json!("new_row"));
    assert_eq!(created[0].snapshot["strategy"], json!("poll.time"));

    let workflow = harness.workflows.workflow.lock().await;
    assert_eq!(workflow.poll_storage, Some(PollCursor::new("200")));
}

#[tokio::test]
async fn item_poll_first_check_seeds_cursor_and_delivers_batch() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::PollItem,
        ScriptedTriggerHandler::returning(json!([{"id": "9"}, {"id": "8"}])),
    );

    let report = harness
        .runner
        .run_check(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(report.executions.len(), 2);
    let workflow = harness.workflows.workflow.lock().await;
    assert_eq!(workflow.poll_storage, Some(PollCursor::new("9")));
}

#[tokio::test]
async fn poll_without_workflow_id_is_a_validation_error() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::PollLength,
        ScriptedTriggerHandler::returning(json!([])),
    );
    let request = ExecutionRequest::new(json!({}), "node-1", WorkspaceId::new(), ProjectId::new());

    let result = harness.runner.run_check(&definition, &request).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn webhook_with_one_item_creates_one_execution() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::WebhookApp,
        ScriptedTriggerHandler::returning(json!([{"event": "created"}])),
    );

    let report = harness
        .runner
        .run_check(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(report.executions.len(), 1);
    let created = harness.executions.created.lock().await;
    assert_eq!(created[0].input_data, json!({"event": "created"}));
}

#[tokio::test]
async fn webhook_with_filtered_out_delivery_creates_nothing() {
    let harness = harness(None, Arc::new(DroppingConditionFilter));
    let definition = definition(
        TriggerStrategy::WebhookCustom,
        ScriptedTriggerHandler::returning(json!([{"event": "ignored"}])),
    );

    let report = harness
        .runner
        .run_check(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(report.executions.is_empty());
    assert!(!report.result.conditions_met());
    assert!(harness.executions.created.lock().await.is_empty());
}

#[tokio::test]
async fn webhook_with_multiple_items_is_rejected() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::WebhookApp,
        ScriptedTriggerHandler::returning(json!([{"n": 1}, {"n": 2}])),
    );

    let result = harness.runner.run_check(&definition, &request()).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn schedule_tick_fires_then_persists_next_run() {
    let next = Utc
        .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!());
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = TriggerDefinition::new(
        descriptor("every_morning"),
        TriggerStrategy::Schedule,
        Arc::new(ScriptedTriggerHandler::scheduled(
            json!({"tick": true}),
            Ok(next),
        )),
    )
    .with_skip_condition_filter();

    let report = harness
        .runner
        .run_check(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(report.executions.len(), 1);
    let workflow = harness.workflows.workflow.lock().await;
    assert_eq!(workflow.next_scheduled_execution, Some(next));
}

#[tokio::test]
async fn schedule_computation_failure_is_fatal_after_the_tick() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = TriggerDefinition::new(
        descriptor("every_morning"),
        TriggerStrategy::Schedule,
        Arc::new(ScriptedTriggerHandler::scheduled(
            json!({"tick": true}),
            Err(UpstreamError::new("invalid cron expression")),
        )),
    )
    .with_skip_condition_filter();

    let result = harness.runner.run_check(&definition, &request()).await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    // The tick itself already fired before the failure.
    assert_eq!(harness.executions.created.lock().await.len(), 1);
}

#[tokio::test]
async fn invoke_normalizes_scalar_output_into_one_item() {
    let harness = harness(None, Arc::new(PassthroughConditionFilter));
    let definition = definition(
        TriggerStrategy::Manual,
        ScriptedTriggerHandler::returning(json!({"single": true})),
    );

    let result = harness
        .runner
        .invoke(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(result.success(), Some(&json!([{"single": true}])));
    assert!(result.conditions_met());
}

#[tokio::test]
async fn skip_condition_filter_bypasses_filtering() {
    let harness = harness(None, Arc::new(DroppingConditionFilter));
    let definition = definition(
        TriggerStrategy::Manual,
        ScriptedTriggerHandler::returning(json!([{"kept": true}])),
    )
    .with_skip_condition_filter();

    let result = harness
        .runner
        .invoke(&definition, &request())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(result.success(), Some(&json!([{"kept": true}])));
    assert!(result.conditions_met());
}
