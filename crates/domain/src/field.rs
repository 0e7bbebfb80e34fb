use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use flowgate_core::{AppResult, NonEmptyString, ProjectId, UpstreamResult, WorkspaceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Connection;

/// One resolved option for a dynamically-populated configuration field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// User-facing option label.
    pub label: String,
    /// Value written into the configuration when selected.
    pub value: Value,
}

/// Context handed to a dynamic options provider for one resolution.
#[derive(Debug, Clone, Copy)]
pub struct DynamicOptionsContext<'a> {
    /// Connection resolved for the owning definition, when required.
    pub connection: Option<&'a Connection>,
    /// Caller-supplied extra options, e.g. values of sibling fields.
    pub extra_options: &'a Value,
    /// Workspace scope of the resolution.
    pub workspace_id: WorkspaceId,
    /// Project scope of the resolution.
    pub project_id: ProjectId,
    /// Workflow the field belongs to, when resolved from a workflow.
    pub workflow_id: Option<&'a str>,
    /// Agent the resolution originates from, when any.
    pub agent_id: Option<&'a str>,
}

/// Remote option-list source attached to a configuration field.
#[async_trait]
pub trait DynamicOptionsProvider: Send + Sync {
    /// Fetches the current option list from the upstream service.
    async fn get_dynamic_values(
        &self,
        context: DynamicOptionsContext<'_>,
    ) -> UpstreamResult<Vec<FieldOption>>;
}

/// Structural kind of one configuration field.
#[derive(Clone, Default)]
pub enum FieldKind {
    /// Scalar field with no children.
    #[default]
    Plain,
    /// Container whose children form a keyed map.
    NestedMap {
        /// Child field definitions.
        fields: Vec<InputField>,
    },
    /// Container whose children repeat per list entry.
    NestedList {
        /// Child field definitions.
        fields: Vec<InputField>,
    },
}

impl FieldKind {
    /// Returns the child fields for nested containers.
    #[must_use]
    pub fn nested_fields(&self) -> Option<&[InputField]> {
        match self {
            Self::Plain => None,
            Self::NestedMap { fields } | Self::NestedList { fields } => Some(fields.as_slice()),
        }
    }
}

impl Debug for FieldKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => formatter.write_str("Plain"),
            Self::NestedMap { fields } => formatter
                .debug_struct("NestedMap")
                .field("fields", &fields.len())
                .finish(),
            Self::NestedList { fields } => formatter
                .debug_struct("NestedList")
                .field("fields", &fields.len())
                .finish(),
        }
    }
}

/// One configuration field declared by an action or trigger.
#[derive(Clone)]
pub struct InputField {
    name: NonEmptyString,
    label: String,
    description: Option<String>,
    kind: FieldKind,
    dynamic_options: Option<Arc<dyn DynamicOptionsProvider>>,
}

impl InputField {
    /// Creates a plain field with the given name and label.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            label: label.into(),
            description: None,
            kind: FieldKind::Plain,
            dynamic_options: None,
        })
    }

    /// Sets the field description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the structural kind.
    #[must_use]
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attaches a dynamic options provider.
    #[must_use]
    pub fn with_dynamic_options(mut self, provider: Arc<dyn DynamicOptionsProvider>) -> Self {
        self.dynamic_options = Some(provider);
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the field label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the field description when one is set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the structural kind.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Returns the dynamic options provider when one is attached.
    #[must_use]
    pub fn dynamic_options(&self) -> Option<&Arc<dyn DynamicOptionsProvider>> {
        self.dynamic_options.as_ref()
    }
}

impl Debug for InputField {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("InputField")
            .field("name", &self.name.as_str())
            .field("kind", &self.kind)
            .field("dynamic_options", &self.dynamic_options.is_some())
            .finish_non_exhaustive()
    }
}
