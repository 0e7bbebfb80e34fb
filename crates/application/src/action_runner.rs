use std::sync::Arc;

use flowgate_core::{AppError, AppResult};
use flowgate_domain::{ActionDefinition, ActionOutcome, Invocation};
use serde_json::Value;

use crate::auth_retry::{invoke_with_refresh, resolve_definition_connection};
use crate::execution_ports::{ConnectionGateway, ExecutionRequest, InputResolver};

/// Executes single action invocations.
///
/// Input resolution and connection lookup failures abort with a
/// validation error; upstream failures never escape as errors — they
/// come back as [`ActionOutcome::Failure`] so workflow logic can
/// branch on them without exception handling.
#[derive(Clone)]
pub struct ActionRunner {
    connections: Arc<dyn ConnectionGateway>,
    input_resolver: Arc<dyn InputResolver>,
}

impl ActionRunner {
    /// Creates an action runner.
    #[must_use]
    pub fn new(
        connections: Arc<dyn ConnectionGateway>,
        input_resolver: Arc<dyn InputResolver>,
    ) -> Self {
        Self {
            connections,
            input_resolver,
        }
    }

    /// Runs one action invocation to its outcome.
    pub async fn run(
        &self,
        definition: &ActionDefinition,
        request: &ExecutionRequest,
    ) -> AppResult<ActionOutcome> {
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

        match raw_output {
            Ok(output) => Self::interpret_output(definition, output),
            Err(error) => {
                let fallback = format!("action '{}' failed", definition.descriptor().name());
                Ok(ActionOutcome::Failure {
                    message: error.failure_message(fallback.as_str()),
                })
            }
        }
    }

    /// Applies the interrupt check to successful raw output.
    fn interpret_output(definition: &ActionDefinition, output: Value) -> AppResult<ActionOutcome> {
        if !definition.is_interrupting() {
            return Ok(ActionOutcome::Success { output });
        }

        let handler = definition.interrupt_handler().ok_or_else(|| {
            AppError::Internal(format!(
                "interrupting action '{}' has no interrupt outcome handler",
                definition.descriptor().key()
            ))
        })?;

        handler.transform(output)
    }
}
