//! Schema introspection for the `schema` command.

use super::Database;
use crate::error::TaskResult;
use serde::{Deserialize, Serialize};

/// Information about a table column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

/// Applied migration version plus the task table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub migration_version: Option<i64>,
    pub sqlite_version: String,
    pub columns: Vec<ColumnInfo>,
}

impl Database {
    pub fn schema_report(&self) -> TaskResult<SchemaReport> {
        self.with_conn(|conn| {
            let sqlite_version: String =
                conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;

            let migration_version: Option<i64> = conn.query_row(
                "SELECT MAX(version) FROM refinery_schema_history",
                [],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare("PRAGMA table_info('tasks')")?;
            let columns = stmt
                .query_map([], |row| {
                    Ok(ColumnInfo {
                        name: row.get(1)?,
                        data_type: row.get::<_, String>(2)?.to_uppercase(),
                        nullable: row.get::<_, i32>(3)? == 0,
                        default_value: row.get(4)?,
                        primary_key: row.get::<_, i32>(5)? > 0,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(SchemaReport {
                migration_version,
                sqlite_version,
                columns,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_table_has_all_columns_with_defaults() {
        let db = Database::open_in_memory().unwrap();
        let report = db.schema_report().unwrap();

        assert_eq!(report.migration_version, Some(1));
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "id",
                "text",
                "completed",
                "order",
                "duration_days",
                "locked",
                "locked_at",
                "deadline",
                "created_at",
                "updated_at"
            ]
        );

        let default_of = |name: &str| {
            report
                .columns
                .iter()
                .find(|c| c.name == name)
                .and_then(|c| c.default_value.clone())
        };
        assert_eq!(default_of("completed").as_deref(), Some("0"));
        assert_eq!(default_of("locked").as_deref(), Some("0"));
        assert_eq!(default_of("order").as_deref(), Some("0"));
        assert_eq!(default_of("deadline"), None);
    }
}
