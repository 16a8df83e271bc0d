// ==========================================
// 导入骨架 + 日志条目导入
// ==========================================
// 骨架流程:
// 1. 创建台账 → 2. 一次性解析全部行 (失败则台账 failed, 不处理任何行)
// 3. 按模式执行:
//    - 试运行: 一个工作单元内逐行处理, 结束时以 DryRunRollback 回滚
//    - 部分提交: 每行一个工作单元, 行失败只回滚本行
//    - 严格提交: 全部行一个工作单元, 处理完所有行后若有失败则以 BatchAborted 整批回滚
// 4. 定稿台账
// ==========================================

use super::{BulkService, ImportOptions};
use crate::domain::ledger::OperationLedger;
use crate::domain::log_entry::NewLogEntry;
use crate::domain::types::{LogEntryStatus, OperationKind, Role};
use crate::engine::accumulator::{BulkAccumulator, RowError, RowErrorKind, RowOutput};
use crate::engine::error::{BulkError, BulkResult};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{HeaderMode, Row, UploadedFile};
use crate::importer::row_adapter::{read_rows, LogbookRow, TraineeRow, LOGBOOK_REQUIRED_COLUMNS};
use crate::repository::BulkRepository;
use chrono::NaiveDate;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, instrument, warn};

/// 日志条目日期格式 (严格)
const LOGBOOK_DATE_FORMAT: &str = "%Y-%m-%d";

/// 一行来源数据: 行号 + 原始回显
pub(super) trait SourceRow {
    fn row_number(&self) -> usize;
    fn echo(&self) -> JsonValue;
}

impl SourceRow for Row {
    fn row_number(&self) -> usize {
        self.row_number
    }

    fn echo(&self) -> JsonValue {
        self.to_json()
    }
}

impl SourceRow for TraineeRow {
    fn row_number(&self) -> usize {
        self.row_number
    }

    fn echo(&self) -> JsonValue {
        self.data.clone()
    }
}

impl<R: BulkRepository> BulkService<R> {
    /// 导入共用骨架
    pub(super) fn run_import<T, P, F>(
        &self,
        options: ImportOptions,
        side_lists: &[&'static str],
        parse: P,
        mut process: F,
    ) -> BulkResult<OperationLedger>
    where
        T: SourceRow,
        P: FnOnce() -> ImportResult<Vec<T>>,
        F: FnMut(&T) -> Result<RowOutput, RowError>,
    {
        let ledger = self.open_ledger(OperationKind::Import)?;

        let rows = match parse() {
            Ok(rows) => rows,
            Err(e) => {
                warn!(ledger_id = %ledger.id, error = %e, "文件解析失败, 未处理任何行");
                return self.fail_ledger(ledger, 0, 0, json!({ "error": e.to_string() }));
            }
        };
        info!(
            ledger_id = %ledger.id,
            rows = rows.len(),
            dry_run = options.dry_run,
            allow_partial = options.allow_partial,
            "文件解析完成"
        );

        let total = rows.len();
        let mut acc = BulkAccumulator::new().with_side_lists(side_lists);

        if options.dry_run {
            let outcome: BulkResult<()> = self.repo.atomic(|| {
                for row in &rows {
                    let result = process(row);
                    acc.record_row(row.row_number(), &row.echo(), result);
                }
                Err(BulkError::DryRunRollback)
            });
            match outcome {
                Ok(()) | Err(BulkError::DryRunRollback) => {}
                Err(e) => return self.abandon_import(ledger, total, &acc, e),
            }
            debug!(ledger_id = %ledger.id, "试运行结束, 写入已回滚");
        } else if options.allow_partial {
            for row in &rows {
                // 行失败只回滚本行的写入
                let result = self.repo.atomic(|| process(row));
                acc.record_row(row.row_number(), &row.echo(), result);
            }
        } else {
            let outcome: BulkResult<()> = self.repo.atomic(|| {
                let mut failed = false;
                for row in &rows {
                    let result = process(row);
                    failed |= result.is_err();
                    acc.record_row(row.row_number(), &row.echo(), result);
                }
                if failed {
                    return Err(BulkError::BatchAborted {
                        failures: acc.failure_count(),
                    });
                }
                Ok(())
            });
            match outcome {
                Ok(()) => {}
                Err(BulkError::BatchAborted { failures }) => {
                    warn!(ledger_id = %ledger.id, failures, "严格模式下出现失败行, 整批回滚");
                    return self.fail_ledger(ledger, total, failures, acc.into_failure_detail());
                }
                Err(e) => return self.abandon_import(ledger, total, &acc, e),
            }
        }

        self.complete_ledger(ledger, total, acc)
    }

    /// 工作单元本身失败 (开启/提交出错): 台账定稿为 failed 后再上抛
    fn abandon_import(
        &self,
        ledger: OperationLedger,
        total: usize,
        acc: &BulkAccumulator,
        error: BulkError,
    ) -> BulkResult<OperationLedger> {
        warn!(ledger_id = %ledger.id, error = %error, "导入工作单元失败");
        self.fail_ledger(ledger, total, acc.failure_count(), json!({ "error": error.to_string() }))?;
        Err(error)
    }

    // ==========================================
    // 日志条目导入
    // ==========================================

    #[instrument(skip(self, file), fields(actor = %self.actor.username, file = %file.name))]
    pub fn import_logbook_entries(
        &self,
        file: &UploadedFile,
        options: ImportOptions,
    ) -> BulkResult<OperationLedger> {
        self.run_import(
            options,
            &[],
            || read_rows(file, HeaderMode::Preserved, LOGBOOK_REQUIRED_COLUMNS),
            |row: &Row| self.process_logbook_row(&LogbookRow::from_row(row), &options),
        )
    }

    fn process_logbook_row(
        &self,
        row: &LogbookRow,
        options: &ImportOptions,
    ) -> Result<RowOutput, RowError> {
        let pg = match self.repo.find_person_by_username(&row.pg_username)? {
            Some(person) if person.role == Role::Pg => person,
            _ => {
                return Err(RowError::new(
                    RowErrorKind::InvalidPg,
                    format!("PG user '{}' not found", row.pg_username),
                ))
            }
        };

        let entry_date = NaiveDate::parse_from_str(&row.date, LOGBOOK_DATE_FORMAT).map_err(|_| {
            RowError::invalid_date(format!(
                "Invalid date '{}' (expected YYYY-MM-DD)",
                row.date
            ))
        })?;

        let status = if row.status.is_empty() {
            LogEntryStatus::Draft
        } else {
            LogEntryStatus::from_str(&row.status.to_lowercase()).ok_or_else(|| {
                let allowed: Vec<&str> = LogEntryStatus::all().iter().map(|s| s.as_str()).collect();
                RowError::invalid_enum(format!(
                    "Invalid status '{}' (expected one of: {})",
                    row.status,
                    allowed.join(", ")
                ))
            })?
        };

        let entry = NewLogEntry {
            pg_id: pg.id,
            entry_date,
            status,
            case_title: or_default(&row.case_title, "Untitled"),
            location_of_activity: or_default(&row.location, "Not specified"),
            patient_history_summary: or_default(&row.patient_history, "Pending summary"),
            management_action: or_default(&row.management_action, "Pending action"),
            topic_subtopic: or_default(&row.topic_subtopic, "General"),
            created_by: Some(self.actor.id),
        };
        entry.validate(self.today)?;

        if !options.dry_run {
            self.repo.create_log_entry(&entry)?;
        }

        Ok(RowOutput::new(json!({
            "row": row.row_number,
            "pg": pg.username,
            "case_title": entry.case_title,
            "status": status.as_str(),
        })))
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
