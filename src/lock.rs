//! Lock transition rule.
//!
//! A task starts unlocked. Locking it captures the current instant and a
//! deadline `duration_days` calendar days later. Locking is one-way unless the
//! administrative unlock override is enabled in configuration.

use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use thiserror::Error;

use crate::error::TaskError;
use crate::types::Task;

/// The stored lock-relevant fields of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSnapshot {
    pub locked: bool,
    pub duration_days: Option<i64>,
}

impl From<&Task> for LockSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            locked: task.locked,
            duration_days: task.duration_days,
        }
    }
}

/// Companion-field changes implied by a lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    /// Nothing beyond the `locked` column itself.
    Unchanged,
    /// Unlocked -> Locked.
    Lock {
        locked_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    },
    /// Locked -> Unlocked, only reachable with the override enabled.
    Unlock,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("A duration in days is required before a task can be locked")]
    MissingDuration,

    #[error("Locked tasks cannot be unlocked")]
    Irreversible,

    #[error("Deadline falls outside the supported date range")]
    DeadlineOutOfRange,
}

impl From<LockError> for TaskError {
    fn from(err: LockError) -> Self {
        let field = match err {
            LockError::MissingDuration | LockError::DeadlineOutOfRange => "duration_days",
            LockError::Irreversible => "locked",
        };
        TaskError::invalid_value(field, err.to_string())
    }
}

/// `locked_at` plus `days` calendar days, keeping the wall-clock time in `Tz`.
///
/// Returns `None` for negative counts or dates past chrono's range.
pub fn deadline_after<Tz: TimeZone>(locked_at: &DateTime<Tz>, days: i64) -> Option<DateTime<Tz>> {
    let count = u64::try_from(days).ok()?;
    locked_at
        .clone()
        .checked_add_days(Days::new(count))
        // Wall time skipped or repeated by a DST change: fall back to elapsed days.
        .or_else(|| {
            let elapsed = Duration::try_days(days)?;
            locked_at.clone().checked_add_signed(elapsed)
        })
}

/// Decide what a request for `locked = requested` does to a task.
///
/// `supplied_duration` is the payload's `duration_days`: `None` when the key
/// was absent, `Some(None)` for an explicit null. A supplied value wins over
/// the stored one.
pub fn apply_lock_transition<Tz: TimeZone>(
    current: LockSnapshot,
    requested: bool,
    supplied_duration: Option<Option<i64>>,
    now: &DateTime<Tz>,
    allow_unlock: bool,
) -> Result<LockTransition, LockError> {
    match (current.locked, requested) {
        (false, true) => {
            let days = supplied_duration
                .unwrap_or(current.duration_days)
                .ok_or(LockError::MissingDuration)?;
            let deadline = deadline_after(now, days).ok_or(LockError::DeadlineOutOfRange)?;
            Ok(LockTransition::Lock {
                locked_at: now.with_timezone(&Utc),
                deadline: deadline.with_timezone(&Utc),
            })
        }
        (true, false) if allow_unlock => Ok(LockTransition::Unlock),
        (true, false) => Err(LockError::Irreversible),
        // Already in the requested state; the deadline is never recomputed.
        _ => Ok(LockTransition::Unchanged),
    }
}
