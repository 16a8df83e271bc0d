use super::{invalid_text, SqliteStore};
use crate::domain::log_entry::{LogEntryRecord, NewLogEntry};
use crate::domain::types::LogEntryStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::log_entry_repo::LogEntryRepository;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const LOG_ENTRY_COLUMNS: &str = "id, pg_id, entry_date, status, case_title, location_of_activity, \
     patient_history_summary, management_action, topic_subtopic, supervisor_id, \
     supervisor_action_at, created_by, created_at";

fn map_log_entry_row(row: &Row<'_>) -> rusqlite::Result<LogEntryRecord> {
    let status_raw: String = row.get(3)?;
    let status =
        LogEntryStatus::from_str(&status_raw).ok_or_else(|| invalid_text(3, &status_raw))?;

    Ok(LogEntryRecord {
        id: row.get(0)?,
        pg_id: row.get(1)?,
        entry_date: row.get(2)?,
        status,
        case_title: row.get(4)?,
        location_of_activity: row.get(5)?,
        patient_history_summary: row.get(6)?,
        management_action: row.get(7)?,
        topic_subtopic: row.get(8)?,
        supervisor_id: row.get(9)?,
        supervisor_action_at: row.get(10)?,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn load_log_entry(conn: &Connection, id: i64) -> rusqlite::Result<Option<LogEntryRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM logbook_entry WHERE id = ?1", LOG_ENTRY_COLUMNS),
        params![id],
        map_log_entry_row,
    )
    .optional()
}

fn not_found(id: i64) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "logbook_entry".to_string(),
        id: id.to_string(),
    }
}

impl LogEntryRepository for SqliteStore {
    fn lock_log_entries(&self, ids: &[i64]) -> RepositoryResult<Vec<LogEntryRecord>> {
        // BEGIN IMMEDIATE 已持有写锁, 读取即处于锁保护下
        if !self.in_unit() {
            return Err(RepositoryError::DatabaseTransactionError(
                "lock_log_entries 必须在工作单元内调用".to_string(),
            ));
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM logbook_entry WHERE id IN ({}) ORDER BY id",
            LOG_ENTRY_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(ids.iter()), map_log_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn update_log_entry_status(
        &self,
        id: i64,
        status: LogEntryStatus,
        action_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE logbook_entry SET status = ?2, supervisor_action_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), action_at],
        )?;
        if rows == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn update_log_entry_supervisor(&self, id: i64, supervisor_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE logbook_entry SET supervisor_id = ?2 WHERE id = ?1",
            params![id, supervisor_id],
        )?;
        if rows == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn create_log_entry(&self, entry: &NewLogEntry) -> RepositoryResult<LogEntryRecord> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO logbook_entry (
                pg_id, entry_date, status, case_title, location_of_activity,
                patient_history_summary, management_action, topic_subtopic,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.pg_id,
                entry.entry_date,
                entry.status.as_str(),
                entry.case_title,
                entry.location_of_activity,
                entry.patient_history_summary,
                entry.management_action,
                entry.topic_subtopic,
                entry.created_by,
                Utc::now().naive_utc(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        load_log_entry(&conn, id)?.ok_or_else(|| not_found(id))
    }

    fn find_log_entry(&self, id: i64) -> RepositoryResult<Option<LogEntryRecord>> {
        let conn = self.get_conn()?;
        Ok(load_log_entry(&conn, id)?)
    }

    fn count_log_entries(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM logbook_entry", [], |row| row.get(0))?;
        Ok(count)
    }
}
