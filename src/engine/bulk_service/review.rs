// ==========================================
// 批量审核 / 批量指派导师
// ==========================================
// 每块一个工作单元: 锁定记录 → 记录缺失 id → 逐条变更
// 块内出错时该块回滚, 记一条覆盖整块的失败; 其他块不受影响
// 两种操作总以 completed 定稿
// ==========================================

use super::BulkService;
use crate::domain::ledger::OperationLedger;
use crate::domain::log_entry::LogEntryRecord;
use crate::domain::person::PersonRecord;
use crate::domain::types::{LogEntryStatus, OperationKind, Role};
use crate::engine::accumulator::BulkAccumulator;
use crate::engine::error::BulkResult;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::BulkRepository;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

impl<R: BulkRepository> BulkService<R> {
    /// 批量设置日志条目审核状态
    #[instrument(skip(self, entry_ids), fields(actor = %self.actor.username, ids = entry_ids.len(), status = %status))]
    pub fn review_entries(
        &self,
        entry_ids: &[i64],
        status: LogEntryStatus,
    ) -> BulkResult<OperationLedger> {
        let acted_at = Utc::now().naive_utc();
        self.run_chunked(OperationKind::Review, entry_ids, |entry| {
            self.repo.update_log_entry_status(entry.id, status, acted_at)?;
            Ok(json!({ "id": entry.id, "status": status.as_str() }))
        })
    }

    /// 批量指派导师
    #[instrument(skip(self, entry_ids, supervisor), fields(actor = %self.actor.username, ids = entry_ids.len(), supervisor = %supervisor.username))]
    pub fn assign_supervisor(
        &self,
        entry_ids: &[i64],
        supervisor: &PersonRecord,
    ) -> BulkResult<OperationLedger> {
        self.run_chunked(OperationKind::Assignment, entry_ids, |entry| {
            if supervisor.role != Role::Supervisor {
                return Err(RepositoryError::ValidationError(format!(
                    "用户 {} 的角色为 {}, 不能被指派为导师",
                    supervisor.username, supervisor.role
                )));
            }
            self.repo.update_log_entry_supervisor(entry.id, supervisor.id)?;
            Ok(json!({ "id": entry.id, "supervisor": supervisor.id }))
        })
    }

    fn run_chunked<F>(
        &self,
        kind: OperationKind,
        entry_ids: &[i64],
        mut apply: F,
    ) -> BulkResult<OperationLedger>
    where
        F: FnMut(&LogEntryRecord) -> RepositoryResult<JsonValue>,
    {
        let ledger = self.open_ledger(kind)?;
        let mut acc = BulkAccumulator::new();

        for (chunk_no, chunk) in entry_ids.chunks(self.chunk_size()).enumerate() {
            debug!(chunk_no, size = chunk.len(), "处理数据块");
            let mark = acc.success_mark();

            let result: RepositoryResult<()> = self.repo.atomic(|| {
                let entries = self.repo.lock_log_entries(chunk)?;
                let found: HashSet<i64> = entries.iter().map(|e| e.id).collect();

                let mut reported = HashSet::new();
                for id in chunk {
                    if !found.contains(id) && reported.insert(*id) {
                        acc.not_found(*id);
                    }
                }
                for entry in &entries {
                    acc.success(apply(entry)?);
                }
                Ok(())
            });

            if let Err(e) = result {
                warn!(chunk_no, error = %e, "数据块处理失败, 已回滚");
                acc.truncate_successes(mark);
                acc.chunk_failure(chunk, &e.to_string());
            }
        }

        self.complete_ledger(ledger, entry_ids.len(), acc)
    }
}
