//! Sparse `UPDATE tasks` statement construction.
//!
//! Assignments are kept in a fixed column order regardless of the order they
//! were set in, and every value is bound through a named parameter, so the
//! generated SQL for a given set of fields is always the same string.

use rusqlite::ToSql;
use rusqlite::types::Value;

use crate::db::to_millis;
use crate::lock::LockTransition;
use crate::types::TaskPatch;

/// Writable columns, in canonical statement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Text,
    Completed,
    Order,
    DurationDays,
    Locked,
    LockedAt,
    Deadline,
    UpdatedAt,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Text,
        Column::Completed,
        Column::Order,
        Column::DurationDays,
        Column::Locked,
        Column::LockedAt,
        Column::Deadline,
        Column::UpdatedAt,
    ];

    /// Quoted where the name is an SQL keyword.
    pub fn sql_name(self) -> &'static str {
        match self {
            Column::Text => "text",
            Column::Completed => "completed",
            Column::Order => "\"order\"",
            Column::DurationDays => "duration_days",
            Column::Locked => "locked",
            Column::LockedAt => "locked_at",
            Column::Deadline => "deadline",
            Column::UpdatedAt => "updated_at",
        }
    }

    pub fn param_name(self) -> &'static str {
        match self {
            Column::Text => ":text",
            Column::Completed => ":completed",
            Column::Order => ":order",
            Column::DurationDays => ":duration_days",
            Column::Locked => ":locked",
            Column::LockedAt => ":locked_at",
            Column::Deadline => ":deadline",
            Column::UpdatedAt => ":updated_at",
        }
    }
}

const ID_PARAM: &str = ":id";

/// Builder for a single-row `UPDATE ... RETURNING *`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    assignments: Vec<(Column, Value)>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `column`, replacing any earlier assignment to it.
    pub fn set(&mut self, column: Column, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.assignments.binary_search_by_key(&column, |(c, _)| *c) {
            Ok(pos) => self.assignments[pos].1 = value,
            Err(pos) => self.assignments.insert(pos, (column, value)),
        }
        self
    }

    pub fn set_null(&mut self, column: Column) -> &mut Self {
        self.set(column, Value::Null)
    }

    /// Build the assignments for a validated patch. `text` must already be
    /// normalised and only `duration_days` may be null. `updated_at` is
    /// always stamped.
    pub fn from_patch(patch: &TaskPatch, transition: LockTransition, now_ms: i64) -> Self {
        let mut update = Self::new();
        if let Some(Some(text)) = &patch.text {
            update.set(Column::Text, text.clone());
        }
        if let Some(Some(completed)) = patch.completed {
            update.set(Column::Completed, completed);
        }
        if let Some(Some(order)) = patch.order {
            update.set(Column::Order, order);
        }
        if let Some(days) = patch.duration_days {
            update.set(Column::DurationDays, days);
        }
        if let Some(Some(locked)) = patch.locked {
            update.set(Column::Locked, locked);
        }
        match transition {
            LockTransition::Unchanged => {}
            LockTransition::Lock {
                locked_at,
                deadline,
            } => {
                update.set(Column::LockedAt, to_millis(&locked_at));
                update.set(Column::Deadline, to_millis(&deadline));
            }
            LockTransition::Unlock => {
                update.set_null(Column::LockedAt);
                update.set_null(Column::Deadline);
            }
        }
        update.set(Column::UpdatedAt, now_ms);
        update
    }

    pub fn columns(&self) -> Vec<Column> {
        self.assignments.iter().map(|(c, _)| *c).collect()
    }

    pub fn value(&self, column: Column) -> Option<&Value> {
        self.assignments
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    /// The statement text.
    pub fn to_sql(&self) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|(c, _)| format!("{} = {}", c.sql_name(), c.param_name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE tasks SET {} WHERE id = {} RETURNING *",
            set_clause, ID_PARAM
        )
    }

    /// Named parameters matching [`Self::to_sql`], with the row id last.
    pub fn named_params<'a>(&'a self, id: &'a i64) -> Vec<(&'static str, &'a dyn ToSql)> {
        let mut params: Vec<(&'static str, &'a dyn ToSql)> = self
            .assignments
            .iter()
            .map(|(c, v)| (c.param_name(), v as &dyn ToSql))
            .collect();
        params.push((ID_PARAM, id as &dyn ToSql));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// Build a patch from a bitmask over (text, completed, order, duration_days, locked).
    fn patch_for(mask: u8) -> TaskPatch {
        let mut patch = TaskPatch::default();
        if mask & 0b00001 != 0 {
            patch = patch.text("write report");
        }
        if mask & 0b00010 != 0 {
            patch = patch.completed(true);
        }
        if mask & 0b00100 != 0 {
            patch = patch.order(4);
        }
        if mask & 0b01000 != 0 {
            patch = patch.duration_days(Some(3));
        }
        if mask & 0b10000 != 0 {
            patch = patch.locked(false);
        }
        patch
    }

    fn expected_columns(mask: u8) -> Vec<Column> {
        let optional = [
            Column::Text,
            Column::Completed,
            Column::Order,
            Column::DurationDays,
            Column::Locked,
        ];
        let mut cols: Vec<Column> = optional
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, c)| *c)
            .collect();
        cols.push(Column::UpdatedAt);
        cols
    }

    #[test]
    fn every_field_subset_produces_canonical_statement() {
        for mask in 0u8..32 {
            let update = TaskUpdate::from_patch(&patch_for(mask), LockTransition::Unchanged, 1_000);
            let cols = expected_columns(mask);
            assert_eq!(update.columns(), cols, "mask {:05b}", mask);

            let set_clause = cols
                .iter()
                .map(|c| format!("{} = {}", c.sql_name(), c.param_name()))
                .collect::<Vec<_>>()
                .join(", ");
            assert_eq!(
                update.to_sql(),
                format!("UPDATE tasks SET {} WHERE id = :id RETURNING *", set_clause),
                "mask {:05b}",
                mask
            );

            let id = 9;
            let names: Vec<&str> = update.named_params(&id).iter().map(|(n, _)| *n).collect();
            let mut expected_names: Vec<&str> = cols.iter().map(|c| c.param_name()).collect();
            expected_names.push(":id");
            assert_eq!(names, expected_names, "mask {:05b}", mask);
        }
    }

    #[test]
    fn lock_transition_appends_companion_columns_before_updated_at() {
        let locked_at = Utc.with_ymd_and_hms(2026, 9, 28, 10, 0, 0).unwrap();
        let deadline = Utc.with_ymd_and_hms(2026, 10, 3, 10, 0, 0).unwrap();
        let patch = TaskPatch::default().order(2).locked(true);
        let update = TaskUpdate::from_patch(
            &patch,
            LockTransition::Lock {
                locked_at,
                deadline,
            },
            5,
        );
        assert_eq!(
            update.columns(),
            vec![
                Column::Order,
                Column::Locked,
                Column::LockedAt,
                Column::Deadline,
                Column::UpdatedAt
            ]
        );
        assert_eq!(
            update.value(Column::Deadline),
            Some(&Value::Integer(deadline.timestamp_millis()))
        );
    }

    #[test]
    fn unlock_nulls_companion_columns() {
        let patch = TaskPatch::default().locked(false);
        let update = TaskUpdate::from_patch(&patch, LockTransition::Unlock, 5);
        assert_eq!(update.value(Column::LockedAt), Some(&Value::Null));
        assert_eq!(update.value(Column::Deadline), Some(&Value::Null));
    }

    #[test]
    fn null_duration_is_bound_as_null() {
        let patch = TaskPatch::default().duration_days(None);
        let update = TaskUpdate::from_patch(&patch, LockTransition::Unchanged, 5);
        assert_eq!(update.value(Column::DurationDays), Some(&Value::Null));
    }

    #[test]
    fn set_order_does_not_matter() {
        let mut a = TaskUpdate::new();
        a.set(Column::UpdatedAt, 1i64).set(Column::Text, "x".to_string()).set(Column::Order, 2i64);
        let mut b = TaskUpdate::new();
        b.set(Column::Order, 2i64).set(Column::Text, "x".to_string()).set(Column::UpdatedAt, 1i64);
        assert_eq!(a.to_sql(), b.to_sql());
        assert_eq!(a, b);
    }

    #[test]
    fn setting_a_column_twice_keeps_last_value() {
        let mut update = TaskUpdate::new();
        update.set(Column::Order, 1i64).set(Column::Order, 7i64);
        assert_eq!(update.columns(), vec![Column::Order]);
        assert_eq!(update.value(Column::Order), Some(&Value::Integer(7)));
    }

    #[test]
    fn column_list_is_complete() {
        let mut sorted = Column::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Column::ALL.to_vec());
    }
}
