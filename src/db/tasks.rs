//! Task CRUD and ordering operations.

use super::update::TaskUpdate;
use super::{Database, get_opt_timestamp, get_timestamp, to_millis};
use crate::config::TasksConfig;
use crate::error::{TaskError, TaskResult};
use crate::lock::{LockSnapshot, LockTransition, apply_lock_transition};
use crate::types::{NewTask, OrderAssignment, Task, TaskPatch};
use crate::validate::{ensure_task_id, normalize_text, validate_duration};
use chrono::{DateTime, Local, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        text: row.get("text")?,
        completed: row.get("completed")?,
        order: row.get("order")?,
        duration_days: row.get("duration_days")?,
        locked: row.get("locked")?,
        locked_at: get_opt_timestamp(row, "locked_at")?,
        deadline: get_opt_timestamp(row, "deadline")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: i64) -> TaskResult<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1",
            params![task_id],
            parse_task_row,
        )
        .optional()?;
    Ok(task)
}

fn query_tasks(conn: &Connection, sql: &str) -> TaskResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map([], parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Validate the parts of a patch that need no stored state.
fn check_patch(patch: &TaskPatch) -> TaskResult<TaskPatch> {
    if patch.is_empty() {
        return Err(TaskError::no_fields());
    }
    if let Some(field) = patch.null_field() {
        return Err(TaskError::invalid_value(field, format!("{} must not be null", field)));
    }
    let mut checked = patch.clone();
    if let Some(Some(text)) = &patch.text {
        checked.text = Some(Some(normalize_text(text)?));
    }
    if let Some(days) = patch.duration_days {
        validate_duration(days)?;
    }
    Ok(checked)
}

impl Database {
    /// Create a new task stamped with the current time.
    pub fn create_task(&self, input: NewTask) -> TaskResult<Task> {
        self.create_task_at(input, Utc::now())
    }

    /// Create a new task with an explicit creation time.
    pub fn create_task_at(&self, input: NewTask, now: DateTime<Utc>) -> TaskResult<Task> {
        let text = match input.text.as_deref() {
            Some(raw) => normalize_text(raw)?,
            None => return Err(TaskError::missing_field("text")),
        };
        validate_duration(input.duration_days)?;
        let now_ms = to_millis(&now);

        let task = self.with_conn(|conn| {
            let task = conn.query_row(
                "INSERT INTO tasks (text, completed, \"order\", duration_days, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING *",
                params![
                    text,
                    input.completed,
                    input.order,
                    input.duration_days,
                    now_ms,
                    now_ms
                ],
                parse_task_row,
            )?;
            Ok(task)
        })?;

        debug!(task_id = task.id, order = task.order, "task created");
        Ok(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: i64) -> TaskResult<Task> {
        ensure_task_id(task_id)?;
        self.with_conn(|conn| get_task_internal(conn, task_id))?
            .ok_or(TaskError::NotFound(task_id))
    }

    /// Active tasks: `order` ascending, newest first among equal orders.
    pub fn list_active_tasks(&self) -> TaskResult<Vec<Task>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                "SELECT * FROM tasks WHERE completed = 0
                 ORDER BY \"order\" ASC, created_at DESC, id DESC",
            )
        })
    }

    /// Completed tasks, most recently updated first.
    pub fn list_completed_tasks(&self) -> TaskResult<Vec<Task>> {
        self.with_conn(|conn| {
            query_tasks(
                conn,
                "SELECT * FROM tasks WHERE completed = 1
                 ORDER BY updated_at DESC, id DESC",
            )
        })
    }

    /// Apply a sparse update, using the local clock for any lock deadline.
    pub fn update_task(
        &self,
        task_id: i64,
        patch: &TaskPatch,
        config: &TasksConfig,
    ) -> TaskResult<Task> {
        self.update_task_at(task_id, patch, Local::now(), config)
    }

    /// Apply a sparse update at the given instant.
    ///
    /// The existence read and the write are separate statements, so a
    /// concurrent delete between them surfaces as `NotFound` from the write.
    pub fn update_task_at<Tz: TimeZone>(
        &self,
        task_id: i64,
        patch: &TaskPatch,
        now: DateTime<Tz>,
        config: &TasksConfig,
    ) -> TaskResult<Task> {
        ensure_task_id(task_id)?;
        let patch = check_patch(patch)?;

        let current = self
            .with_conn(|conn| get_task_internal(conn, task_id))?
            .ok_or(TaskError::NotFound(task_id))?;

        let transition = match patch.locked.flatten() {
            Some(requested) => apply_lock_transition(
                LockSnapshot::from(&current),
                requested,
                patch.duration_days,
                &now,
                config.allow_unlock,
            )?,
            None => LockTransition::Unchanged,
        };

        let update = TaskUpdate::from_patch(&patch, transition, to_millis(&now));
        let sql = update.to_sql();

        let updated = self.with_conn(|conn| {
            let params = update.named_params(&task_id);
            let task = conn
                .query_row(&sql, params.as_slice(), parse_task_row)
                .optional()?;
            Ok(task)
        })?;
        let updated = updated.ok_or(TaskError::NotFound(task_id))?;

        match transition {
            LockTransition::Lock { deadline, .. } => {
                info!(task_id, deadline = %deadline, "task locked");
            }
            LockTransition::Unlock => info!(task_id, "task unlocked by override"),
            LockTransition::Unchanged => {}
        }
        debug!(task_id, columns = ?update.columns(), "task updated");

        Ok(updated)
    }

    /// Apply a batch of order assignments.
    ///
    /// By default each assignment is its own statement: a failure part way
    /// leaves earlier assignments committed. With `atomic_reorder` the batch
    /// runs in one transaction. Unknown ids are skipped silently either way.
    /// Returns the number of rows changed.
    pub fn reorder_tasks(
        &self,
        assignments: &[OrderAssignment],
        config: &TasksConfig,
    ) -> TaskResult<usize> {
        let now_ms = to_millis(&Utc::now());
        const SQL: &str = "UPDATE tasks SET \"order\" = ?1, updated_at = ?2 WHERE id = ?3";

        let changed = if config.atomic_reorder {
            self.with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let mut changed = 0;
                for a in assignments {
                    changed += tx.execute(SQL, params![a.order, now_ms, a.id])?;
                }
                tx.commit()?;
                Ok(changed)
            })?
        } else {
            let mut changed = 0;
            for a in assignments {
                changed += self.with_conn(|conn| Ok(conn.execute(SQL, params![a.order, now_ms, a.id])?))?;
            }
            changed
        };

        debug!(
            requested = assignments.len(),
            changed,
            atomic = config.atomic_reorder,
            "tasks reordered"
        );
        Ok(changed)
    }

    /// Delete a task, returning the row as it was.
    pub fn delete_task(&self, task_id: i64) -> TaskResult<Task> {
        ensure_task_id(task_id)?;
        let removed = self.with_conn(|conn| {
            let task = conn
                .query_row(
                    "DELETE FROM tasks WHERE id = ?1 RETURNING *",
                    params![task_id],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })?;
        let removed = removed.ok_or(TaskError::NotFound(task_id))?;
        debug!(task_id, "task deleted");
        Ok(removed)
    }
}
