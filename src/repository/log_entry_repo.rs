// ==========================================
// 研究生培训档案系统 - 日志条目 Repository Trait
// ==========================================
// 职责: 日志条目的加锁读取、状态/导师更新、创建
// 红线: lock_log_entries 只能在工作单元内调用
// ==========================================

use crate::domain::log_entry::{LogEntryRecord, NewLogEntry};
use crate::domain::types::LogEntryStatus;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;

pub trait LogEntryRepository {
    /// 对指定 id 加写锁并读取, 锁持续到所在工作单元结束
    ///
    /// 不存在的 id 被静默忽略, 由调用方比对
    fn lock_log_entries(&self, ids: &[i64]) -> RepositoryResult<Vec<LogEntryRecord>>;

    /// 更新审核状态并记录审核时间
    fn update_log_entry_status(
        &self,
        id: i64,
        status: LogEntryStatus,
        action_at: NaiveDateTime,
    ) -> RepositoryResult<()>;

    fn update_log_entry_supervisor(&self, id: i64, supervisor_id: i64) -> RepositoryResult<()>;

    fn create_log_entry(&self, entry: &NewLogEntry) -> RepositoryResult<LogEntryRecord>;

    fn find_log_entry(&self, id: i64) -> RepositoryResult<Option<LogEntryRecord>>;

    fn count_log_entries(&self) -> RepositoryResult<i64>;
}
