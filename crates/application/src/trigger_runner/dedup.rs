//! Poll dedup strategies.
//!
//! Each strategy is a pure function from `(batch, stored cursor)` to
//! `(new items, cursor update)`, dispatched by the trigger's declared
//! strategy tag. The cursor is opaque to everything but the strategy
//! that wrote it.

use flowgate_core::{AppError, AppResult};
use flowgate_domain::{PollCursor, TriggerDefinition, TriggerStrategy};
use serde_json::Value;

/// Result of applying one dedup strategy to a polled batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Items considered new relative to the stored cursor, in batch
    /// order.
    pub new_items: Vec<Value>,
    /// Cursor to persist, when it changed.
    pub cursor_update: Option<PollCursor>,
}

/// Dispatches the batch through the strategy declared by the trigger.
pub(super) fn apply_strategy(
    definition: &TriggerDefinition,
    batch: Vec<Value>,
    cursor: Option<&PollCursor>,
) -> AppResult<DedupOutcome> {
    let handler = definition.handler();
    match definition.strategy() {
        TriggerStrategy::PollTime => Ok(dedup_by_time(batch, cursor, |item| {
            handler.item_timestamp_millis(item)
        })),
        TriggerStrategy::PollItem => Ok(dedup_by_item(batch, cursor, |item| handler.item_id(item))),
        TriggerStrategy::PollLength => Ok(dedup_by_length(batch, cursor)),
        other => Err(AppError::Internal(format!(
            "trigger strategy '{}' has no poll dedup",
            other.as_str()
        ))),
    }
}

/// Time-based dedup: keep items strictly newer than the stored
/// millisecond cursor.
///
/// Items without a timestamp are dropped. A stored cursor that does
/// not parse as milliseconds is treated as absent. The new cursor is
/// the maximum timestamp among kept items and is only reported when it
/// differs from the stored one.
pub fn dedup_by_time(
    batch: Vec<Value>,
    cursor: Option<&PollCursor>,
    timestamp_of: impl Fn(&Value) -> Option<i64>,
) -> DedupOutcome {
    let threshold = cursor.and_then(|cursor| cursor.as_str().parse::<i64>().ok());

    let mut new_items = Vec::new();
    let mut max_timestamp: Option<i64> = None;

    for item in batch {
        let Some(timestamp) = timestamp_of(&item) else {
            continue;
        };

        if threshold.is_some_and(|threshold| timestamp <= threshold) {
            continue;
        }

        max_timestamp = Some(max_timestamp.map_or(timestamp, |current| current.max(timestamp)));
        new_items.push(item);
    }

    let cursor_update = max_timestamp
        .filter(|max| threshold != Some(*max))
        .map(|max| PollCursor::new(max.to_string()));

    DedupOutcome {
        new_items,
        cursor_update,
    }
}

/// Item-based dedup over a newest-first batch.
///
/// With no stored cursor (first poll) the whole batch is delivered and
/// the cursor is seeded with the first item's id. A cursor that no
/// longer appears in the batch also delivers the whole batch and
/// reseeds. Otherwise everything strictly before the cursor's position
/// is new, and the cursor moves to the newest delivered item.
pub fn dedup_by_item(
    batch: Vec<Value>,
    cursor: Option<&PollCursor>,
    id_of: impl Fn(&Value) -> Option<String>,
) -> DedupOutcome {
    let first_id = batch.first().and_then(&id_of);

    let Some(cursor) = cursor else {
        return DedupOutcome {
            cursor_update: first_id.map(PollCursor::new),
            new_items: batch,
        };
    };

    let cursor_position = batch
        .iter()
        .position(|item| id_of(item).as_deref() == Some(cursor.as_str()));

    match cursor_position {
        None => DedupOutcome {
            cursor_update: first_id.map(PollCursor::new),
            new_items: batch,
        },
        Some(position) => {
            let new_items: Vec<Value> = batch.into_iter().take(position).collect();
            let cursor_update = new_items.first().and_then(&id_of).map(PollCursor::new);
            DedupOutcome {
                new_items,
                cursor_update,
            }
        }
    }
}

/// Length-based dedup comparing batch sizes.
///
/// A shrinking batch delivers nothing but records the new length; an
/// unchanged batch delivers nothing and persists nothing; a grown
/// batch delivers the trailing `new - previous` items.
pub fn dedup_by_length(mut batch: Vec<Value>, cursor: Option<&PollCursor>) -> DedupOutcome {
    let current = batch.len();
    let previous = cursor
        .and_then(|cursor| cursor.as_str().parse::<usize>().ok())
        .unwrap_or(current);

    if current < previous {
        return DedupOutcome {
            new_items: Vec::new(),
            cursor_update: Some(PollCursor::new(current.to_string())),
        };
    }

    if current == previous {
        return DedupOutcome {
            new_items: Vec::new(),
            cursor_update: None,
        };
    }

    let new_items = batch.split_off(previous);
    DedupOutcome {
        new_items,
        cursor_update: Some(PollCursor::new(current.to_string())),
    }
}
