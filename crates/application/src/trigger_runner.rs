use std::sync::Arc;

use flowgate_core::{AppError, AppResult};
use flowgate_domain::{Invocation, RunResult, TriggerDefinition, TriggerStrategy};
use serde_json::{Value, json};

use crate::auth_retry::{invoke_with_refresh, resolve_definition_connection};
use crate::execution_ports::{
    ConditionFilter, ConnectionGateway, CreatedExecution, ExecutionGateway, ExecutionRequest,
    InputResolver, NotificationGateway, NotificationInput, WorkflowPatch, WorkflowStore,
};

mod dedup;
mod deliveries;

pub use dedup::{DedupOutcome, dedup_by_item, dedup_by_length, dedup_by_time};

/// Outcome of one trigger check.
#[derive(Debug, Clone)]
pub struct TriggerCheckReport {
    /// Invocation result after condition filtering.
    pub result: RunResult,
    /// Executions spawned by this check, in creation order.
    pub executions: Vec<CreatedExecution>,
}

/// Executes trigger invocations and converts their output into
/// workflow executions.
///
/// Poll strategies deduplicate against the persisted cursor, webhook
/// strategies enforce the single-item rule, and schedule strategies
/// fire the tick before recomputing the next timestamp. A failing
/// automatic trigger deactivates its workflow and notifies the
/// project's members before the failure is re-thrown.
#[derive(Clone)]
pub struct TriggerRunner {
    connections: Arc<dyn ConnectionGateway>,
    input_resolver: Arc<dyn InputResolver>,
    executions: Arc<dyn ExecutionGateway>,
    workflows: Arc<dyn WorkflowStore>,
    notifications: Arc<dyn NotificationGateway>,
    condition_filter: Arc<dyn ConditionFilter>,
}

impl TriggerRunner {
    /// Creates a trigger runner.
    #[must_use]
    pub fn new(
        connections: Arc<dyn ConnectionGateway>,
        input_resolver: Arc<dyn InputResolver>,
        executions: Arc<dyn ExecutionGateway>,
        workflows: Arc<dyn WorkflowStore>,
        notifications: Arc<dyn NotificationGateway>,
        condition_filter: Arc<dyn ConditionFilter>,
    ) -> Self {
        Self {
            connections,
            input_resolver,
            executions,
            workflows,
            notifications,
            condition_filter,
        }
    }

    /// Runs one trigger invocation, returning the filtered result.
    ///
    /// Upstream failures come back as [`RunResult::failed`] rather than
    /// errors; validation failures still abort.
    pub async fn invoke(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
    ) -> AppResult<RunResult> {
        let (_config_value, result) = self.invoke_resolved(definition, request).await?;
        Ok(result)
    }

    /// Runs one full trigger check, spawning executions from surviving
    /// items.
    pub async fn run_check(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
    ) -> AppResult<TriggerCheckReport> {
        let (config_value, result) = self.invoke_resolved(definition, request).await?;

        if let Some(message) = result.failure() {
            if definition.strategy().is_automatic() {
                self.deactivate_and_notify(definition, request, message)
                    .await?;
                return Err(AppError::Internal(message.to_owned()));
            }

            return Ok(TriggerCheckReport {
                result,
                executions: Vec::new(),
            });
        }

        let items = result
            .success()
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let executions = match definition.strategy() {
            strategy if strategy.is_poll() => {
                self.deliver_poll_items(definition, request, &config_value, items)
                    .await?
            }
            strategy if strategy.is_webhook() => {
                self.deliver_webhook_item(definition, request, &config_value, items)
                    .await?
            }
            TriggerStrategy::Schedule => {
                self.deliver_schedule_tick(definition, request, &config_value, &result)
                    .await?
            }
            _ => Vec::new(),
        };

        Ok(TriggerCheckReport { result, executions })
    }

    /// Resolves inputs and connection, invokes the handler with the
    /// refresh-retry policy, and applies condition filtering.
    async fn invoke_resolved(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
    ) -> AppResult<(Value, RunResult)> {
        let config_value = if request.skip_input_resolution {
            request.config_value.clone()
        } else {
            self.input_resolver.resolve_inputs(request).await?
        };

        let connection = resolve_definition_connection(
            &self.connections,
            definition.descriptor().needs_connection(),
            &config_value,
        )
        .await?;

        let handler = definition.handler();
        let raw_output = invoke_with_refresh(
            &self.connections,
            request.workspace_id,
            connection,
            |connection| {
                let handler = Arc::clone(handler);
                let config_value = &config_value;
                async move {
                    let invocation = Invocation {
                        config_value,
                        connection: connection.as_ref(),
                        workspace_id: request.workspace_id,
                        project_id: request.project_id,
                        workflow_id: request.workflow_id.as_deref(),
                        agent_id: request.agent_id.as_deref(),
                        node_id: request.node_id.as_str(),
                        execution_id: request.execution_id.as_deref(),
                    };

                    if request.should_mock {
                        handler.mock_run(invocation).await
                    } else {
                        handler.run(invocation).await
                    }
                }
            },
        )
        .await;

        let output = match raw_output {
            Ok(output) => output,
            Err(error) => {
                let fallback = format!("trigger '{}' failed", definition.descriptor().name());
                return Ok((
                    config_value,
                    RunResult::failed(error.failure_message(fallback.as_str())),
                ));
            }
        };

        let items = normalize_items(output);
        let result = if definition.skips_condition_filter() {
            RunResult::succeeded(Value::Array(items))
        } else {
            let filtered = self.condition_filter.apply(&config_value, items).await?;
            let conditions_met = !filtered.is_empty();
            RunResult::succeeded(Value::Array(filtered)).with_conditions_met(conditions_met)
        };

        Ok((config_value, result))
    }

    /// Deactivates the owning workflow and notifies project members.
    ///
    /// Notification delivery is best-effort; failures there never mask
    /// the trigger failure itself.
    async fn deactivate_and_notify(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
        message: &str,
    ) -> AppResult<()> {
        let Some(workflow_id) = request.workflow_id.as_deref() else {
            return Ok(());
        };

        self.workflows
            .update_workflow(
                workflow_id,
                WorkflowPatch {
                    is_active: Some(false),
                    ..WorkflowPatch::default()
                },
            )
            .await?;

        let member_ids = self
            .notifications
            .list_project_member_ids(request.project_id)
            .await
            .unwrap_or_default();

        for recipient_id in member_ids {
            self.notifications
                .create_notification(NotificationInput {
                    link: format!(
                        "/projects/{}/workflows/{workflow_id}",
                        request.project_id
                    ),
                    title: "Workflow deactivated".to_owned(),
                    message: format!(
                        "trigger '{}' failed and its workflow was deactivated: {message}",
                        definition.descriptor().name()
                    ),
                    recipient_id,
                })
                .await
                .ok();
        }

        Ok(())
    }
}

/// Coerces raw trigger output into a batch of items.
fn normalize_items(output: Value) -> Vec<Value> {
    match output {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Builds the trigger node snapshot captured on created executions.
fn trigger_node_snapshot(
    definition: &TriggerDefinition,
    request: &ExecutionRequest,
    config_value: &Value,
) -> Value {
    json!({
        "nodeId": request.node_id,
        "triggerKey": definition.descriptor().key(),
        "strategy": definition.strategy().as_str(),
        "configValue": config_value,
    })
}

#[cfg(test)]
mod tests;
