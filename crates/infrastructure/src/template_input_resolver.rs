use std::collections::HashMap;

use async_trait::async_trait;
use flowgate_application::{ExecutionRequest, InputResolver};
use flowgate_core::{AppError, AppResult};
use serde_json::Value;
use tokio::sync::RwLock;

/// Input resolver substituting `{{variables.*}}` and `{{references.*}}`
/// placeholders.
///
/// Variables are operator-defined values; references point at prior
/// node outputs. A string that is exactly one placeholder is replaced
/// by the raw value, preserving its type; placeholders embedded in
/// longer strings are interpolated as text. An unknown placeholder
/// aborts resolution.
#[derive(Default)]
pub struct TemplateInputResolver {
    variables: RwLock<HashMap<String, Value>>,
    references: RwLock<HashMap<String, Value>>,
}

impl TemplateInputResolver {
    /// Creates a resolver with no variables or references defined.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or replaces a variable.
    pub async fn set_variable(&self, name: impl Into<String>, value: Value) {
        self.variables.write().await.insert(name.into(), value);
    }

    /// Defines or replaces a node output reference.
    pub async fn set_reference(&self, name: impl Into<String>, value: Value) {
        self.references.write().await.insert(name.into(), value);
    }
}

#[async_trait]
impl InputResolver for TemplateInputResolver {
    async fn resolve_inputs(&self, request: &ExecutionRequest) -> AppResult<Value> {
        let variables = self.variables.read().await;
        let references = self.references.read().await;
        let scope = Scope {
            variables: &variables,
            references: &references,
        };
        resolve_value(&request.config_value, &scope)
    }
}

struct Scope<'a> {
    variables: &'a HashMap<String, Value>,
    references: &'a HashMap<String, Value>,
}

impl Scope<'_> {
    fn lookup(&self, placeholder: &str) -> AppResult<&Value> {
        let resolved = if let Some(name) = placeholder.strip_prefix("variables.") {
            self.variables.get(name.trim())
        } else if let Some(name) = placeholder.strip_prefix("references.") {
            self.references.get(name.trim())
        } else {
            None
        };

        resolved.ok_or_else(|| {
            AppError::Validation(format!("unresolvable placeholder '{{{{{placeholder}}}}}'"))
        })
    }
}

fn resolve_value(value: &Value, scope: &Scope<'_>) -> AppResult<Value> {
    match value {
        Value::String(text) => resolve_text(text, scope),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| resolve_value(entry, scope))
            .collect::<AppResult<Vec<Value>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, entry) in map {
                resolved.insert(key.clone(), resolve_value(entry, scope)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_text(text: &str, scope: &Scope<'_>) -> AppResult<Value> {
    const OPEN: &str = "{{";
    const CLOSE: &str = "}}";

    // Whole-string placeholders keep the value's JSON type.
    if let Some(name) = text
        .strip_prefix(OPEN)
        .and_then(|rest| rest.strip_suffix(CLOSE))
        && !name.contains(OPEN)
        && !name.contains(CLOSE)
    {
        return scope.lookup(name.trim()).cloned();
    }

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(AppError::Validation(format!(
                "unterminated placeholder in '{text}'"
            )));
        };

        let value = scope.lookup(after_open[..end].trim())?;
        match value {
            Value::String(substituted) => output.push_str(substituted),
            other => output.push_str(&other.to_string()),
        }

        rest = &after_open[end + CLOSE.len()..];
    }
    output.push_str(rest);

    Ok(Value::String(output))
}
