use async_trait::async_trait;
use flowgate_application::ConditionFilter;
use flowgate_core::{AppError, AppResult};
use serde_json::Value;

/// Condition filter driven by the node's `conditions` configuration.
///
/// Conditions are an array of `{path, operator, value}` objects; an
/// item survives only when every condition holds. A node without
/// conditions passes items through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConditionFilter;

impl JsonConditionFilter {
    /// Creates the filter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConditionFilter for JsonConditionFilter {
    async fn apply(&self, config_value: &Value, items: Vec<Value>) -> AppResult<Vec<Value>> {
        let Some(conditions) = config_value.get("conditions").and_then(Value::as_array) else {
            return Ok(items);
        };

        if conditions.is_empty() {
            return Ok(items);
        }

        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if matches_all(&item, conditions)? {
                kept.push(item);
            }
        }

        Ok(kept)
    }
}

fn matches_all(item: &Value, conditions: &[Value]) -> AppResult<bool> {
    for condition in conditions {
        let path = condition.get("path").and_then(Value::as_str).ok_or_else(|| {
            AppError::Validation("condition requires string field 'path'".to_owned())
        })?;
        let operator = condition
            .get("operator")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::Validation("condition requires string field 'operator'".to_owned())
            })?;
        let expected = condition.get("value").unwrap_or(&Value::Null);

        let actual = value_at_path(item, path);
        if !evaluate(operator, actual, expected)? {
            return Ok(false);
        }
    }

    Ok(true)
}

fn evaluate(operator: &str, actual: Option<&Value>, expected: &Value) -> AppResult<bool> {
    match operator {
        "equals" => Ok(actual == Some(expected)),
        "not_equals" => Ok(actual != Some(expected)),
        "exists" => Ok(actual.is_some_and(|value| !value.is_null())),
        "contains" => Ok(match actual {
            Some(Value::String(text)) => expected
                .as_str()
                .is_some_and(|needle| text.contains(needle)),
            Some(Value::Array(entries)) => entries.contains(expected),
            _ => false,
        }),
        _ => Err(AppError::Validation(format!(
            "unknown condition operator '{operator}'"
        ))),
    }
}

fn value_at_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(item, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use flowgate_application::ConditionFilter;
    use serde_json::json;

    use super::JsonConditionFilter;

    #[tokio::test]
    async fn missing_conditions_pass_everything_through() {
        let filter = JsonConditionFilter::new();
        let items = vec![json!({"a": 1}), json!({"a": 2})];

        let kept = filter
            .apply(&json!({}), items.clone())
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(kept, items);
    }

    #[tokio::test]
    async fn equals_filters_on_nested_paths() {
        let filter = JsonConditionFilter::new();
        let config = json!({
            "conditions": [{"path": "issue.status", "operator": "equals", "value": "open"}]
        });
        let items = vec![
            json!({"issue": {"status": "open"}}),
            json!({"issue": {"status": "closed"}}),
        ];

        let kept = filter
            .apply(&config, items)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(kept, vec![json!({"issue": {"status": "open"}})]);
    }

    #[tokio::test]
    async fn all_conditions_must_hold() {
        let filter = JsonConditionFilter::new();
        let config = json!({
            "conditions": [
                {"path": "status", "operator": "equals", "value": "open"},
                {"path": "labels", "operator": "contains", "value": "bug"},
            ]
        });
        let items = vec![
            json!({"status": "open", "labels": ["bug", "p1"]}),
            json!({"status": "open", "labels": ["docs"]}),
        ];

        let kept = filter
            .apply(&config, items)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["labels"][0], json!("bug"));
    }

    #[tokio::test]
    async fn exists_requires_a_non_null_value() {
        let filter = JsonConditionFilter::new();
        let config = json!({
            "conditions": [{"path": "assignee", "operator": "exists"}]
        });
        let items = vec![
            json!({"assignee": "sam"}),
            json!({"assignee": null}),
            json!({}),
        ];

        let kept = filter
            .apply(&config, items)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(kept, vec![json!({"assignee": "sam"})]);
    }

    #[tokio::test]
    async fn unknown_operators_are_rejected() {
        let filter = JsonConditionFilter::new();
        let config = json!({
            "conditions": [{"path": "a", "operator": "matches_regex", "value": ".*"}]
        });

        let result = filter.apply(&config, vec![json!({"a": 1})]).await;

        assert!(result.is_err());
    }
}
