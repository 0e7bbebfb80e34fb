use super::*;

use flowgate_core::UpstreamError;

impl TriggerRunner {
    /// Delivers deduplicated poll items as workflow executions.
    ///
    /// Executions are created sequentially to preserve ordering; the
    /// cursor is persisted before delivery so a partial failure never
    /// re-delivers the same items.
    pub(super) async fn deliver_poll_items(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
        config_value: &Value,
        items: Vec<Value>,
    ) -> AppResult<Vec<CreatedExecution>> {
        let workflow_id = required_workflow_id(request, definition)?;
        let stored = self.workflows.get_workflow(workflow_id).await?;

        let outcome = dedup::apply_strategy(definition, items, stored.poll_storage.as_ref())?;

        if let Some(cursor) = outcome.cursor_update {
            self.workflows
                .update_workflow(
                    workflow_id,
                    WorkflowPatch {
                        poll_storage: Some(cursor),
                        ..WorkflowPatch::default()
                    },
                )
                .await?;
        }

        let snapshot = trigger_node_snapshot(definition, request, config_value);
        let mut created = Vec::with_capacity(outcome.new_items.len());
        for item in outcome.new_items {
            let execution = self
                .executions
                .create_execution(workflow_id, snapshot.clone(), false, item)
                .await?;
            created.push(execution);
        }

        Ok(created)
    }

    /// Delivers a webhook result, enforcing the single-item rule.
    pub(super) async fn deliver_webhook_item(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
        config_value: &Value,
        mut items: Vec<Value>,
    ) -> AppResult<Vec<CreatedExecution>> {
        if items.is_empty() {
            // Filtered-out deliveries are not an error.
            return Ok(Vec::new());
        }

        if items.len() > 1 {
            return Err(AppError::Validation(format!(
                "webhook trigger '{}' produced {} items after filtering; only one is supported",
                definition.descriptor().key(),
                items.len()
            )));
        }

        let workflow_id = required_workflow_id(request, definition)?;
        let snapshot = trigger_node_snapshot(definition, request, config_value);
        let item = items.remove(0);
        let execution = self
            .executions
            .create_execution(workflow_id, snapshot, false, item)
            .await?;

        Ok(vec![execution])
    }

    /// Fires the scheduled tick, then recomputes the next fire time.
    ///
    /// The tick execution is created unconditionally first; failing to
    /// compute or persist the next timestamp afterwards is fatal for
    /// this check because the tick has already fired.
    pub(super) async fn deliver_schedule_tick(
        &self,
        definition: &TriggerDefinition,
        request: &ExecutionRequest,
        config_value: &Value,
        result: &RunResult,
    ) -> AppResult<Vec<CreatedExecution>> {
        let workflow_id = required_workflow_id(request, definition)?;
        let snapshot = trigger_node_snapshot(definition, request, config_value);
        let input_data = result.success().cloned().unwrap_or(Value::Null);

        let execution = self
            .executions
            .create_execution(workflow_id, snapshot, false, input_data)
            .await?;

        let connection = resolve_definition_connection(
            &self.connections,
            definition.descriptor().needs_connection(),
            config_value,
        )
        .await?;

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

        let next = definition
            .handler()
            .next_schedule(invocation)
            .await
            .map_err(|error: UpstreamError| {
                AppError::Internal(format!(
                    "schedule trigger '{}' fired but computing the next run failed: {}",
                    definition.descriptor().key(),
                    error.failure_message("no details")
                ))
            })?;

        self.workflows
            .update_workflow(
                workflow_id,
                WorkflowPatch {
                    next_scheduled_execution: Some(next),
                    ..WorkflowPatch::default()
                },
            )
            .await?;

        Ok(vec![execution])
    }
}

fn required_workflow_id<'a>(
    request: &'a ExecutionRequest,
    definition: &TriggerDefinition,
) -> AppResult<&'a str> {
    request.workflow_id.as_deref().ok_or_else(|| {
        AppError::Validation(format!(
            "trigger '{}' with strategy '{}' requires a workflow id",
            definition.descriptor().key(),
            definition.strategy().as_str()
        ))
    })
}
