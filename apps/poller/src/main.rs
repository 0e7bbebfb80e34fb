//! Flowgate poll-trigger runtime.
//!
//! Drives trigger checks for active workflows on a fixed interval. The
//! binary wires the in-memory adapters around a demo feed trigger so
//! the dedup and delivery pipeline can be observed end to end.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use flowgate_application::{ExecutionRequest, TriggerRunner, WorkflowStore};
use flowgate_core::{AppError, AppResult, ProjectId, UpstreamResult, WorkspaceId};
use flowgate_domain::{
    DefinitionDescriptor, DescriptorInput, Invocation, TriggerDefinition, TriggerHandler,
    TriggerStrategy,
};
use flowgate_infrastructure::{
    InMemoryConnectionGateway, InMemoryExecutionGateway, InMemoryNotificationGateway,
    InMemoryWorkflowStore, JsonConditionFilter, TemplateInputResolver,
};
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct PollerConfig {
    workflow_id: String,
    poll_interval_ms: u64,
    feed_batch_size: usize,
}

impl PollerConfig {
    fn load() -> AppResult<Self> {
        let workflow_id = env::var("POLLER_WORKFLOW_ID")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "wf-demo".to_owned());
        let poll_interval_ms = parse_env_u64("POLLER_INTERVAL_MS", 5000)?;
        let feed_batch_size = parse_env_usize("POLLER_FEED_BATCH_SIZE", 5)?;

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "POLLER_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        if feed_batch_size == 0 {
            return Err(AppError::Validation(
                "POLLER_FEED_BATCH_SIZE must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            workflow_id,
            poll_interval_ms,
            feed_batch_size,
        })
    }
}

/// Demo feed emitting a newest-first window over an ever-growing
/// sequence, one new item per check.
struct CounterFeedTrigger {
    head: AtomicU64,
    window: usize,
}

#[async_trait]
impl TriggerHandler for CounterFeedTrigger {
    async fn run(&self, _invocation: Invocation<'_>) -> UpstreamResult<Value> {
        let head = self.head.fetch_add(1, Ordering::SeqCst) + 1;
        let window = u64::try_from(self.window).unwrap_or(u64::MAX);

        let items: Vec<Value> = (0..window)
            .map_while(|offset| head.checked_sub(offset))
            .filter(|id| *id > 0)
            .map(|id| json!({"id": id.to_string(), "body": format!("item #{id}")}))
            .collect();

        Ok(Value::Array(items))
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = PollerConfig::load()?;
    let workspace_id = WorkspaceId::new();
    let project_id = ProjectId::new();

    let workflows = Arc::new(InMemoryWorkflowStore::new());
    workflows
        .upsert(
            config.workflow_id.clone(),
            flowgate_application::StoredWorkflow {
                is_active: true,
                poll_storage: None,
                next_scheduled_execution: None,
            },
        )
        .await;

    let executions = Arc::new(InMemoryExecutionGateway::new());
    let notifications = Arc::new(InMemoryNotificationGateway::new());
    notifications.add_member(project_id, "demo-user").await;

    let runner = TriggerRunner::new(
        Arc::new(InMemoryConnectionGateway::new()),
        Arc::new(TemplateInputResolver::new()),
        executions.clone(),
        workflows.clone(),
        notifications,
        Arc::new(JsonConditionFilter::new()),
    );

    let definition = TriggerDefinition::new(
        feed_descriptor()?,
        TriggerStrategy::PollItem,
        Arc::new(CounterFeedTrigger {
            head: AtomicU64::new(0),
            window: config.feed_batch_size,
        }),
    );

    info!(
        workflow_id = %config.workflow_id,
        poll_interval_ms = config.poll_interval_ms,
        feed_batch_size = config.feed_batch_size,
        "flowgate-poller started"
    );

    loop {
        let workflow = workflows.get_workflow(config.workflow_id.as_str()).await?;
        if !workflow.is_active {
            warn!(
                workflow_id = %config.workflow_id,
                "workflow was deactivated; stopping poller"
            );
            return Ok(());
        }

        let request = ExecutionRequest::new(json!({}), "node-feed", workspace_id, project_id)
            .with_workflow_id(config.workflow_id.clone());

        match runner.run_check(&definition, &request).await {
            Ok(report) => {
                info!(
                    workflow_id = %config.workflow_id,
                    new_executions = report.executions.len(),
                    conditions_met = report.result.conditions_met(),
                    total_executions = executions.executions().await.len(),
                    "trigger check completed"
                );
            }
            Err(error) => {
                warn!(
                    workflow_id = %config.workflow_id,
                    error = %error,
                    "trigger check failed"
                );
            }
        }

        tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
    }
}

fn feed_descriptor() -> AppResult<DefinitionDescriptor> {
    DefinitionDescriptor::new(DescriptorInput {
        key: "counter_feed".to_owned(),
        name: "Counter Feed".to_owned(),
        description: Some("Emits one new feed item per check".to_owned()),
        input_fields: Vec::new(),
        ai_schema: json!({"type": "object", "properties": {}}),
        needs_connection: false,
        available_to_agents: false,
        view_hints: None,
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
