//! Core types for the task tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A task row as stored and returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub text: String,
    pub completed: bool,
    /// Sort key among active tasks. Not required to be unique or contiguous.
    pub order: i64,
    pub duration_days: Option<i64>,
    /// One-way flag; see [`crate::lock`].
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Required; kept optional so a missing key is reported by name.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub duration_days: Option<i64>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_duration_days(mut self, days: i64) -> Self {
        self.duration_days = Some(days);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// Sparse update payload.
///
/// Every field is optional and only present fields are written. The outer
/// `Option` records whether the key was sent at all, the inner one whether
/// it was `null`. Only `duration_days` may be cleared; a `null` for any other
/// field is rejected when the patch is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<Option<bool>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_days: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub locked: Option<Option<bool>>,
}

impl TaskPatch {
    /// True when the payload carries no recognised field.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.completed.is_none()
            && self.order.is_none()
            && self.duration_days.is_none()
            && self.locked.is_none()
    }

    /// Name of the first non-nullable field sent as `null`, if any.
    pub fn null_field(&self) -> Option<&'static str> {
        if matches!(self.text, Some(None)) {
            Some("text")
        } else if matches!(self.completed, Some(None)) {
            Some("completed")
        } else if matches!(self.order, Some(None)) {
            Some("order")
        } else if matches!(self.locked, Some(None)) {
            Some("locked")
        } else {
            None
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(Some(text.into()));
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(Some(completed));
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(Some(order));
        self
    }

    /// Set or clear (`None`) the duration.
    pub fn duration_days(mut self, days: Option<i64>) -> Self {
        self.duration_days = Some(days);
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(Some(locked));
        self
    }
}

/// Maps a present key (even `null`) to `Some`, leaving absent keys to `default`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One entry of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: i64,
    pub order: i64,
}

/// Reorder request body: `{"tasks": [{"id": 1, "order": 0}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub tasks: Vec<OrderAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub message: String,
    /// Rows actually changed; assignments for unknown ids are not counted.
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub task: Task,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_null_from_absent_duration() {
        let absent: TaskPatch = serde_json::from_str(r#"{"order": 3}"#).unwrap();
        assert_eq!(absent.duration_days, None);

        let null: TaskPatch = serde_json::from_str(r#"{"duration_days": null}"#).unwrap();
        assert_eq!(null.duration_days, Some(None));

        let set: TaskPatch = serde_json::from_str(r#"{"duration_days": 4}"#).unwrap();
        assert_eq!(set.duration_days, Some(Some(4)));
    }

    #[test]
    fn patch_records_nulls_on_non_nullable_fields() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"text": null, "completed": null, "order": 4}"#).unwrap();
        assert_eq!(patch.text, Some(None));
        assert_eq!(patch.completed, Some(None));
        assert_eq!(patch.order, Some(Some(4)));
        assert!(!patch.is_empty());
        assert_eq!(patch.null_field(), Some("text"));

        let locked: TaskPatch = serde_json::from_str(r#"{"locked": null}"#).unwrap();
        assert_eq!(locked.null_field(), Some("locked"));

        let cleared: TaskPatch = serde_json::from_str(r#"{"duration_days": null}"#).unwrap();
        assert_eq!(cleared.null_field(), None);
    }

    #[test]
    fn patch_with_only_unknown_fields_is_empty() {
        let patch: TaskPatch = serde_json::from_str(r#"{"colour": "red"}"#).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn new_task_defaults() {
        let task: NewTask = serde_json::from_str(r#"{"text": "water plants"}"#).unwrap();
        assert_eq!(task.text.as_deref(), Some("water plants"));
        assert!(!task.completed);
        assert_eq!(task.order, 0);
        assert_eq!(task.duration_days, None);
    }

    #[test]
    fn new_task_without_text_still_parses() {
        let task: NewTask = serde_json::from_str(r#"{"order": 1}"#).unwrap();
        assert_eq!(task.text, None);
        assert_eq!(task.order, 1);
    }

    #[test]
    fn reorder_request_requires_task_array() {
        assert!(serde_json::from_str::<ReorderRequest>(r#"{"tasks": 5}"#).is_err());
        assert!(serde_json::from_str::<ReorderRequest>(r#"{}"#).is_err());
        let ok: ReorderRequest =
            serde_json::from_str(r#"{"tasks": [{"id": 1, "order": 2}]}"#).unwrap();
        assert_eq!(ok.tasks, vec![OrderAssignment { id: 1, order: 2 }]);
    }
}
