use super::{invalid_text, SqliteStore};
use crate::domain::ledger::OperationLedger;
use crate::domain::types::{OperationKind, OperationStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::ledger_repo::OperationLedgerRepository;
use rusqlite::{params, OptionalExtension, Row};

const LEDGER_COLUMNS: &str = "id, actor_id, actor, kind, status, total_items, success_count, \
     failure_count, detail_json, created_at, completed_at";

fn map_ledger_row(row: &Row<'_>) -> rusqlite::Result<OperationLedger> {
    let kind_raw: String = row.get(3)?;
    let kind = OperationKind::from_str(&kind_raw).ok_or_else(|| invalid_text(3, &kind_raw))?;
    let status_raw: String = row.get(4)?;
    let status =
        OperationStatus::from_str(&status_raw).ok_or_else(|| invalid_text(4, &status_raw))?;
    let detail_raw: String = row.get(8)?;
    let detail = serde_json::from_str(&detail_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(OperationLedger {
        id: row.get(0)?,
        actor_id: row.get(1)?,
        actor: row.get(2)?,
        kind,
        status,
        total_items: row.get(5)?,
        success_count: row.get(6)?,
        failure_count: row.get(7)?,
        detail,
        created_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

impl OperationLedgerRepository for SqliteStore {
    fn insert_ledger(&self, ledger: &OperationLedger) -> RepositoryResult<()> {
        let detail_json = serde_json::to_string(&ledger.detail)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO bulk_operation (
                id, actor_id, actor, kind, status, total_items, success_count,
                failure_count, detail_json, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                ledger.id,
                ledger.actor_id,
                ledger.actor,
                ledger.kind.as_str(),
                ledger.status.as_str(),
                ledger.total_items,
                ledger.success_count,
                ledger.failure_count,
                detail_json,
                ledger.created_at,
                ledger.completed_at,
            ],
        )?;
        Ok(())
    }

    fn save_ledger(&self, ledger: &OperationLedger) -> RepositoryResult<()> {
        let detail_json = serde_json::to_string(&ledger.detail)?;
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE bulk_operation SET
                status = ?2, total_items = ?3, success_count = ?4, failure_count = ?5,
                detail_json = ?6, completed_at = ?7
            WHERE id = ?1
            "#,
            params![
                ledger.id,
                ledger.status.as_str(),
                ledger.total_items,
                ledger.success_count,
                ledger.failure_count,
                detail_json,
                ledger.completed_at,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "bulk_operation".to_string(),
                id: ledger.id.clone(),
            });
        }
        Ok(())
    }

    fn find_ledger(&self, id: &str) -> RepositoryResult<Option<OperationLedger>> {
        let conn = self.get_conn()?;
        let ledger = conn
            .query_row(
                &format!("SELECT {} FROM bulk_operation WHERE id = ?1", LEDGER_COLUMNS),
                params![id],
                map_ledger_row,
            )
            .optional()?;
        Ok(ledger)
    }

    fn list_ledgers_by_actor(
        &self,
        actor_id: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<OperationLedger>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bulk_operation WHERE actor_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            LEDGER_COLUMNS
        ))?;
        let ledgers = stmt
            .query_map(params![actor_id, limit as i64], map_ledger_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ledgers)
    }
}
