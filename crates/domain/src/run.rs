use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one action or trigger invocation.
///
/// Exactly one of the success payload or the failure message is
/// populated. Trigger results additionally carry `conditions_met`,
/// which stays `true` unless condition filtering emptied the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    success: Option<Value>,
    failure: Option<String>,
    conditions_met: bool,
}

impl RunResult {
    /// Creates a successful result carrying the raw output.
    #[must_use]
    pub fn succeeded(output: Value) -> Self {
        Self {
            success: Some(output),
            failure: None,
            conditions_met: true,
        }
    }

    /// Creates a failed result carrying the normalized message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: None,
            failure: Some(message.into()),
            conditions_met: true,
        }
    }

    /// Marks whether condition filtering left any output.
    #[must_use]
    pub fn with_conditions_met(mut self, conditions_met: bool) -> Self {
        self.conditions_met = conditions_met;
        self
    }

    /// Returns whether the invocation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.is_some()
    }

    /// Returns the success payload when the invocation succeeded.
    #[must_use]
    pub fn success(&self) -> Option<&Value> {
        self.success.as_ref()
    }

    /// Returns the failure message when the invocation failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Returns whether condition filtering kept any output.
    #[must_use]
    pub fn conditions_met(&self) -> bool {
        self.conditions_met
    }
}

/// Final outcome of one action invocation.
///
/// `NeedsInput` and `Scheduled` are only produced by interrupting
/// actions whose outcome handler recognized the raw output shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Action completed and produced output.
    Success {
        /// Raw action output.
        output: Value,
    },
    /// Action failed; the message is normalized for workflow branching.
    Failure {
        /// Human-readable failure message.
        message: String,
    },
    /// Action paused pending human input.
    NeedsInput {
        /// Payload describing the requested input.
        request: Value,
    },
    /// Action paused pending a scheduled wake-up or webhook callback.
    Scheduled {
        /// Payload describing the resume condition.
        resume: Value,
    },
}

impl ActionOutcome {
    /// Returns whether the outcome pauses execution pending external
    /// continuation.
    #[must_use]
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::NeedsInput { .. } | Self::Scheduled { .. })
    }
}

/// Opaque dedup marker persisted per workflow between poll checks.
///
/// Its interpretation is strategy-specific: max timestamp seen, last
/// delivered item identifier, or last observed batch length. Only one
/// interpretation is ever active per workflow, matching the workflow's
/// current trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollCursor(String);

impl PollCursor {
    /// Creates a cursor from its stored representation.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for PollCursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}
