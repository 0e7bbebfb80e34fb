use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::{AppError, AppResult, NonEmptyString, UpstreamError, UpstreamResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionOutcome, InputField, Invocation};

/// Maximum depth of a dotted field path.
const MAX_FIELD_PATH_SEGMENTS: usize = 3;

/// Declared dedup and delivery strategy of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerStrategy {
    /// Invoked on demand by a user; never deduplicated.
    #[serde(rename = "manual")]
    Manual,
    /// Polling trigger deduplicated by item timestamps.
    #[serde(rename = "poll.time")]
    PollTime,
    /// Polling trigger deduplicated by item identifiers, newest first.
    #[serde(rename = "poll.item")]
    PollItem,
    /// Polling trigger deduplicated by batch length.
    #[serde(rename = "poll.length")]
    PollLength,
    /// Webhook registered with the upstream app.
    #[serde(rename = "webhook.app")]
    WebhookApp,
    /// Webhook on a caller-managed custom endpoint.
    #[serde(rename = "webhook.custom")]
    WebhookCustom,
    /// Fires on a computed schedule.
    #[serde(rename = "schedule")]
    Schedule,
}

impl TriggerStrategy {
    /// Returns the stable strategy tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::PollTime => "poll.time",
            Self::PollItem => "poll.item",
            Self::PollLength => "poll.length",
            Self::WebhookApp => "webhook.app",
            Self::WebhookCustom => "webhook.custom",
            Self::Schedule => "schedule",
        }
    }

    /// Parses a stored strategy tag.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "manual" => Ok(Self::Manual),
            "poll.time" => Ok(Self::PollTime),
            "poll.item" => Ok(Self::PollItem),
            "poll.length" => Ok(Self::PollLength),
            "webhook.app" => Ok(Self::WebhookApp),
            "webhook.custom" => Ok(Self::WebhookCustom),
            "schedule" => Ok(Self::Schedule),
            _ => Err(AppError::Validation(format!(
                "unknown trigger strategy '{value}'"
            ))),
        }
    }

    /// Returns whether the trigger fires without a user action.
    ///
    /// A failing automatic trigger deactivates its workflow; manual
    /// runs surface the failure inline instead.
    #[must_use]
    pub fn is_automatic(&self) -> bool {
        !matches!(self, Self::Manual)
    }

    /// Returns whether the trigger is polling-based.
    #[must_use]
    pub fn is_poll(&self) -> bool {
        matches!(self, Self::PollTime | Self::PollItem | Self::PollLength)
    }

    /// Returns whether the trigger is webhook-based.
    #[must_use]
    pub fn is_webhook(&self) -> bool {
        matches!(self, Self::WebhookApp | Self::WebhookCustom)
    }
}

/// Shared identity and configuration surface of one action or trigger.
#[derive(Clone)]
pub struct DefinitionDescriptor {
    key: NonEmptyString,
    name: NonEmptyString,
    description: Option<String>,
    input_fields: Vec<InputField>,
    ai_schema: Value,
    needs_connection: bool,
    available_to_agents: bool,
    view_hints: Option<Value>,
}

/// Input payload used to construct a validated descriptor.
#[derive(Debug)]
pub struct DescriptorInput {
    /// Stable definition key, unique within the owning app.
    pub key: String,
    /// User-facing definition name.
    pub name: String,
    /// Optional definition description.
    pub description: Option<String>,
    /// Declared configuration fields.
    pub input_fields: Vec<InputField>,
    /// JSON schema used when the definition is invoked by an agent.
    pub ai_schema: Value,
    /// Whether invocations require a resolved connection.
    pub needs_connection: bool,
    /// Whether agents may call the definition as a tool.
    pub available_to_agents: bool,
    /// Optional UI rendering hints.
    pub view_hints: Option<Value>,
}

impl DefinitionDescriptor {
    /// Creates a validated descriptor.
    pub fn new(input: DescriptorInput) -> AppResult<Self> {
        let DescriptorInput {
            key,
            name,
            description,
            input_fields,
            ai_schema,
            needs_connection,
            available_to_agents,
            view_hints,
        } = input;

        let description = description.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        Ok(Self {
            key: NonEmptyString::new(key)?,
            name: NonEmptyString::new(name)?,
            description,
            input_fields,
            ai_schema,
            needs_connection,
            available_to_agents,
            view_hints,
        })
    }

    /// Returns the definition key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the definition description when one is set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared configuration fields.
    #[must_use]
    pub fn input_fields(&self) -> &[InputField] {
        self.input_fields.as_slice()
    }

    /// Returns the agent-facing parameter schema.
    #[must_use]
    pub fn ai_schema(&self) -> &Value {
        &self.ai_schema
    }

    /// Returns whether invocations require a resolved connection.
    #[must_use]
    pub fn needs_connection(&self) -> bool {
        self.needs_connection
    }

    /// Returns whether agents may call the definition as a tool.
    #[must_use]
    pub fn available_to_agents(&self) -> bool {
        self.available_to_agents
    }

    /// Returns optional UI rendering hints.
    #[must_use]
    pub fn view_hints(&self) -> Option<&Value> {
        self.view_hints.as_ref()
    }

    /// Resolves a field by dotted path.
    ///
    /// Paths have one to three segments; every non-final segment must
    /// address a nested-map or nested-list container.
    pub fn field_at_path(&self, path: &str) -> AppResult<&InputField> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.is_empty() || segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "invalid field path '{path}'"
            )));
        }

        if segments.len() > MAX_FIELD_PATH_SEGMENTS {
            return Err(AppError::Validation(format!(
                "invalid field path '{path}': at most {MAX_FIELD_PATH_SEGMENTS} segments are supported"
            )));
        }

        let mut fields = self.input_fields.as_slice();
        let mut resolved: Option<&InputField> = None;

        for (position, segment) in segments.iter().enumerate() {
            let field = fields
                .iter()
                .find(|field| field.name() == *segment)
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "field '{path}' was not found on definition '{}'",
                        self.key.as_str()
                    ))
                })?;

            if position + 1 < segments.len() {
                fields = field.kind().nested_fields().ok_or_else(|| {
                    AppError::Validation(format!(
                        "field '{segment}' in path '{path}' is not a nested container"
                    ))
                })?;
            }

            resolved = Some(field);
        }

        resolved.ok_or_else(|| AppError::Validation(format!("invalid field path '{path}'")))
    }
}

impl Debug for DefinitionDescriptor {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DefinitionDescriptor")
            .field("key", &self.key.as_str())
            .field("needs_connection", &self.needs_connection)
            .field("available_to_agents", &self.available_to_agents)
            .finish_non_exhaustive()
    }
}

/// Executable body of one action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Performs the real operation.
    async fn run(&self, invocation: Invocation<'_>) -> UpstreamResult<Value>;

    /// Performs a side-effect-free mock run.
    async fn mock_run(&self, invocation: Invocation<'_>) -> UpstreamResult<Value> {
        let _ = invocation;
        Ok(Value::Null)
    }
}

/// Transform applied to an interrupting action's raw output.
pub trait InterruptOutcomeHandler: Send + Sync {
    /// Converts raw run output into a recognized outcome shape.
    fn transform(&self, raw_output: Value) -> AppResult<ActionOutcome>;
}

/// Executable body of one trigger.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Performs the real check or delivery read.
    async fn run(&self, invocation: Invocation<'_>) -> UpstreamResult<Value>;

    /// Performs a side-effect-free mock run.
    async fn mock_run(&self, invocation: Invocation<'_>) -> UpstreamResult<Value> {
        let _ = invocation;
        Ok(Value::Array(Vec::new()))
    }

    /// Extracts the millisecond timestamp used by time-based dedup.
    fn item_timestamp_millis(&self, item: &Value) -> Option<i64> {
        item.get("timestamp").and_then(Value::as_i64)
    }

    /// Extracts the identifier used by item-based dedup.
    fn item_id(&self, item: &Value) -> Option<String> {
        match item.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Computes the next fire time for schedule triggers.
    async fn next_schedule(&self, invocation: Invocation<'_>) -> UpstreamResult<DateTime<Utc>> {
        let _ = invocation;
        Err(UpstreamError::new(
            "trigger does not support schedule computation",
        ))
    }
}

/// One reusable action exposed by an app.
#[derive(Clone)]
pub struct ActionDefinition {
    descriptor: DefinitionDescriptor,
    interrupting: bool,
    handler: Arc<dyn ActionHandler>,
    interrupt_handler: Option<Arc<dyn InterruptOutcomeHandler>>,
}

impl ActionDefinition {
    /// Creates a regular, non-interrupting action.
    #[must_use]
    pub fn new(descriptor: DefinitionDescriptor, handler: Arc<dyn ActionHandler>) -> Self {
        Self {
            descriptor,
            interrupting: false,
            handler,
            interrupt_handler: None,
        }
    }

    /// Creates an interrupting action.
    ///
    /// The outcome handler is part of the definition contract; a
    /// definition flagged interrupting without one is a bug surfaced as
    /// an internal error when the runner reaches the interrupt check.
    #[must_use]
    pub fn interrupting(
        descriptor: DefinitionDescriptor,
        handler: Arc<dyn ActionHandler>,
        interrupt_handler: Option<Arc<dyn InterruptOutcomeHandler>>,
    ) -> Self {
        Self {
            descriptor,
            interrupting: true,
            handler,
            interrupt_handler,
        }
    }

    /// Returns the shared descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &DefinitionDescriptor {
        &self.descriptor
    }

    /// Returns whether the action pauses execution pending external
    /// input.
    #[must_use]
    pub fn is_interrupting(&self) -> bool {
        self.interrupting
    }

    /// Returns the executable handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn ActionHandler> {
        &self.handler
    }

    /// Returns the interrupt outcome handler when one is attached.
    #[must_use]
    pub fn interrupt_handler(&self) -> Option<&Arc<dyn InterruptOutcomeHandler>> {
        self.interrupt_handler.as_ref()
    }
}

impl Debug for ActionDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ActionDefinition")
            .field("key", &self.descriptor.key())
            .field("interrupting", &self.interrupting)
            .finish_non_exhaustive()
    }
}

/// One reusable trigger exposed by an app.
#[derive(Clone)]
pub struct TriggerDefinition {
    descriptor: DefinitionDescriptor,
    strategy: TriggerStrategy,
    skip_condition_filter: bool,
    handler: Arc<dyn TriggerHandler>,
}

impl TriggerDefinition {
    /// Creates a trigger with the declared strategy.
    #[must_use]
    pub fn new(
        descriptor: DefinitionDescriptor,
        strategy: TriggerStrategy,
        handler: Arc<dyn TriggerHandler>,
    ) -> Self {
        Self {
            descriptor,
            strategy,
            skip_condition_filter: false,
            handler,
        }
    }

    /// Declares that the trigger pre-filters its own output.
    #[must_use]
    pub fn with_skip_condition_filter(mut self) -> Self {
        self.skip_condition_filter = true;
        self
    }

    /// Returns the shared descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &DefinitionDescriptor {
        &self.descriptor
    }

    /// Returns the declared strategy.
    #[must_use]
    pub fn strategy(&self) -> TriggerStrategy {
        self.strategy
    }

    /// Returns whether condition filtering is skipped for this trigger.
    #[must_use]
    pub fn skips_condition_filter(&self) -> bool {
        self.skip_condition_filter
    }

    /// Returns the executable handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn TriggerHandler> {
        &self.handler
    }
}

impl Debug for TriggerDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TriggerDefinition")
            .field("key", &self.descriptor.key())
            .field("strategy", &self.strategy.as_str())
            .finish_non_exhaustive()
    }
}
